//! Normalized file candidates, regardless of input channel.

use bytes::Bytes;
use smol_str::SmolStr;

/// Which input channel produced a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceChannel {
    Picker,
    Drop,
    Paste,
}

/// A file pending upload.
///
/// Created by exactly one input adapter, consumed exactly once by the
/// upload coordinator, then discarded.
#[derive(Clone, Debug)]
pub struct FileCandidate {
    /// Raw file bytes.
    pub blob: Bytes,
    /// Original filename (a synthetic one for clipboard images).
    pub name: SmolStr,
    /// Declared MIME type.
    pub mime_type: SmolStr,
    /// Size in bytes, as declared by the source.
    pub size_bytes: u64,
    pub source_channel: SourceChannel,
}

impl FileCandidate {
    /// Wrap raw bytes as a candidate; size is taken from the blob itself.
    pub fn new(
        blob: Bytes,
        name: impl Into<SmolStr>,
        mime_type: impl Into<SmolStr>,
        source_channel: SourceChannel,
    ) -> Self {
        let size_bytes = blob.len() as u64;
        Self {
            blob,
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            source_channel,
        }
    }
}
