//! Input adapters: three heterogeneous sources, one candidate stream.
//!
//! The host platform maps its native events onto the plain event types
//! here; the adapters normalize them into [`FileCandidate`]s for the upload
//! coordinator. Nothing in this module talks to the network or the
//! document.

use bytes::Bytes;
use smol_str::SmolStr;

use scribe_editor_core::EventResponse;
use scribe_uploads::{FileCandidate, SourceChannel};

/// A file as delivered by the host platform.
#[derive(Clone, Debug)]
pub struct FilePayload {
    pub bytes: Bytes,
    pub name: SmolStr,
    pub mime_type: SmolStr,
}

/// One item of a drop's data transfer.
#[derive(Clone, Debug)]
pub enum DataTransferItem {
    File(FilePayload),
    /// Dragged text, links, etc. Not this pipeline's business.
    Text(String),
}

/// A drag-related event on the editor surface.
#[derive(Clone, Debug)]
pub enum DragEvent {
    Enter,
    Leave,
    Over,
    Drop(Vec<DataTransferItem>),
}

/// One clipboard item of a paste event.
#[derive(Clone, Debug)]
pub struct ClipboardItem {
    pub mime_type: SmolStr,
    pub payload: Bytes,
}

/// A paste event with its clipboard items.
#[derive(Clone, Debug)]
pub struct PasteEvent {
    pub items: Vec<ClipboardItem>,
}

/// A file-picker change event. `None` means the selection was cleared.
#[derive(Clone, Debug)]
pub struct PickerEvent {
    pub file: Option<FilePayload>,
}

/// The single-file picker.
///
/// Mirrors a host file input: a change event only fires when the control's
/// value changes, so the shell clears the selection after each dispatch -
/// that is what lets the user pick the same file twice in a row.
#[derive(Debug, Default)]
pub struct PickerAdapter {
    selection: Option<SmolStr>,
}

impl PickerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a selection event, yielding at most one candidate.
    pub fn on_select(&mut self, event: PickerEvent) -> Option<FileCandidate> {
        let file = event.file?;
        if self.selection.as_ref() == Some(&file.name) {
            // The control's value did not change; the host fires nothing.
            return None;
        }
        self.selection = Some(file.name.clone());
        Some(FileCandidate::new(
            file.bytes,
            file.name,
            file.mime_type,
            SourceChannel::Picker,
        ))
    }

    /// Clear the control after dispatch.
    pub fn clear(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<&SmolStr> {
        self.selection.as_ref()
    }
}

/// Convert every dropped file item into a candidate. A drop of N files
/// yields N candidates, each processed independently.
pub fn candidates_from_drop(items: Vec<DataTransferItem>) -> Vec<FileCandidate> {
    items
        .into_iter()
        .filter_map(|item| match item {
            DataTransferItem::File(file) => Some(FileCandidate::new(
                file.bytes,
                file.name,
                file.mime_type,
                SourceChannel::Drop,
            )),
            DataTransferItem::Text(_) => None,
        })
        .collect()
}

/// Convert clipboard items whose declared type indicates image content.
///
/// Non-image items are left alone for default paste handling: the response
/// is `Consumed` only when at least one image was taken.
pub fn candidates_from_paste(event: PasteEvent) -> (Vec<FileCandidate>, EventResponse) {
    let mut candidates = Vec::new();
    for item in event.items {
        if !item.mime_type.contains("image") {
            continue;
        }
        let name = pasted_file_name(&item.mime_type);
        candidates.push(FileCandidate::new(
            item.payload,
            name,
            item.mime_type,
            SourceChannel::Paste,
        ));
    }
    let response = if candidates.is_empty() {
        EventResponse::Ignored
    } else {
        EventResponse::Consumed
    };
    (candidates, response)
}

/// Clipboard images carry no filename; synthesize one from the subtype.
fn pasted_file_name(mime_type: &str) -> SmolStr {
    let ext = mime_type
        .rsplit('/')
        .next()
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("png");
    SmolStr::from(format!("pasted.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_payload(name: &str) -> FilePayload {
        FilePayload {
            bytes: Bytes::from_static(b"\x89PNG"),
            name: name.into(),
            mime_type: "image/png".into(),
        }
    }

    #[test]
    fn test_picker_single_file() {
        let mut picker = PickerAdapter::new();
        let candidate = picker
            .on_select(PickerEvent {
                file: Some(png_payload("a.png")),
            })
            .expect("candidate");
        assert_eq!(candidate.source_channel, SourceChannel::Picker);
        assert_eq!(candidate.name, "a.png");
    }

    #[test]
    fn test_picker_same_file_needs_clear() {
        let mut picker = PickerAdapter::new();
        assert!(picker
            .on_select(PickerEvent {
                file: Some(png_payload("a.png"))
            })
            .is_some());

        // Without clearing, re-picking the same file does not re-fire.
        assert!(picker
            .on_select(PickerEvent {
                file: Some(png_payload("a.png"))
            })
            .is_none());

        // After the shell clears the control, it does.
        picker.clear();
        assert!(picker
            .on_select(PickerEvent {
                file: Some(png_payload("a.png"))
            })
            .is_some());
    }

    #[test]
    fn test_drop_converts_only_files() {
        let candidates = candidates_from_drop(vec![
            DataTransferItem::File(png_payload("a.png")),
            DataTransferItem::Text("https://example.com".to_owned()),
            DataTransferItem::File(png_payload("b.png")),
        ]);
        assert_eq!(candidates.len(), 2);
        assert!(candidates
            .iter()
            .all(|c| c.source_channel == SourceChannel::Drop));
    }

    #[test]
    fn test_paste_takes_images_leaves_text() {
        let (candidates, response) = candidates_from_paste(PasteEvent {
            items: vec![
                ClipboardItem {
                    mime_type: "text/plain".into(),
                    payload: Bytes::from_static(b"hello"),
                },
                ClipboardItem {
                    mime_type: "image/png".into(),
                    payload: Bytes::from_static(b"\x89PNG"),
                },
            ],
        });
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_channel, SourceChannel::Paste);
        assert_eq!(candidates[0].name, "pasted.png");
        assert!(response.is_consumed());
    }

    #[test]
    fn test_paste_without_images_is_ignored() {
        let (candidates, response) = candidates_from_paste(PasteEvent {
            items: vec![ClipboardItem {
                mime_type: "text/html".into(),
                payload: Bytes::from_static(b"<b>x</b>"),
            }],
        });
        assert!(candidates.is_empty());
        assert!(!response.is_consumed());
    }
}
