//! scribe-shell: the editor shell composing the editing/upload core.
//!
//! This crate provides:
//! - `DragState` - the per-instance drag counter machine
//! - Input adapters normalizing picker, drop, and paste events into the
//!   candidate stream
//! - `EditorShell` - owns the wiring and the `on_change` persistence
//!   hand-off

pub mod adapters;
pub mod drag;
pub mod shell;

pub use adapters::{
    ClipboardItem, DataTransferItem, DragEvent, FilePayload, PasteEvent, PickerAdapter,
    PickerEvent, candidates_from_drop, candidates_from_paste,
};
pub use drag::DragState;
pub use shell::{ChangeListener, EditorShell};
