//! Error types for the composer core.
//!
//! One top-level [`ScribeError`] wraps the per-subsystem errors so callers
//! that don't care about the distinction can hold a single type. The
//! subsystem errors stay public because the upload pipeline and the markup
//! parser report them individually.

use miette::{Diagnostic, NamedSource, SourceSpan};

/// Main error type for composer operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ScribeError {
    /// A file candidate was rejected before any network call.
    #[error(transparent)]
    #[diagnostic_source]
    Validation(#[from] ValidationError),

    /// The asset store reported a failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Persisted markup could not be parsed back into a document.
    #[error(transparent)]
    #[diagnostic_source]
    Parse(#[from] ParseError),

    /// Serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic_source]
    Serde(#[from] SerDeError),

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pre-network rejection of a file candidate.
///
/// Never retried: the candidate itself is unacceptable, so the task goes
/// straight to its failed state and the user is told why.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ValidationError {
    /// The declared MIME type is not an image type.
    #[error("not an image file ({mime_type}), please select an image")]
    #[diagnostic(code(scribe::upload::invalid_type))]
    InvalidFileType { mime_type: String },

    /// The file exceeds the configured size limit.
    #[error("image is {size_bytes} bytes, the limit is {max_bytes} bytes")]
    #[diagnostic(code(scribe::upload::too_large))]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },
}

/// Failure reported by the asset store gateway.
///
/// The gateway protocol is opaque to this core, so these carry the gateway's
/// own message. Surfaced to the user, never retried automatically.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum StoreError {
    /// The store refused the upload (auth, quota, key conflict, ...).
    #[error("asset store rejected the upload: {0}")]
    Rejected(String),

    /// The store could not be reached or the transfer broke mid-flight.
    #[error("asset store unavailable: {0}")]
    Unavailable(String),

    /// No object exists under the requested key.
    #[error("no stored object under key '{0}'")]
    MissingKey(String),
}

/// Markup parse error with source location.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("markup parse error: {kind}")]
#[diagnostic(code(scribe::parse))]
pub struct ParseError {
    kind: ParseErrorKind,
    #[source_code]
    src: NamedSource<String>,
    #[label("error")]
    at: SourceSpan,
}

impl ParseError {
    /// Build a parse error pointing at `offset..offset + len` in `src`.
    pub fn new(kind: ParseErrorKind, src: &str, offset: usize, len: usize) -> Self {
        Self {
            kind,
            src: NamedSource::new("markup", src.to_owned()),
            at: SourceSpan::new(offset.into(), len),
        }
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Byte offset of the error in the source markup.
    pub fn offset(&self) -> usize {
        self.at.offset()
    }
}

/// What went wrong while parsing persisted markup.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("tag <{0}> is not part of the document schema")]
    UnknownTag(String),

    #[error("<{0}> is never closed")]
    UnclosedTag(String),

    #[error("closing </{0}> does not match the open element")]
    MismatchedClose(String),

    #[error("heading level {0} is not allowed (only 2 and 3)")]
    BadHeadingLevel(u32),

    #[error("<{tag}> is missing its {attr} attribute")]
    MissingAttr { tag: String, attr: &'static str },

    #[error("content outside of any block element")]
    StrayContent,

    #[error("malformed tag syntax")]
    MalformedTag,
}

/// Serialization/deserialization errors.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SerDeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(SerDeError::Json(err))
    }
}
