//! scribe-uploads: the asynchronous image-upload pipeline.
//!
//! This crate provides:
//! - `FileCandidate` - the normalized unit of work from any input channel
//! - Synchronous validation (type and size) before any network call
//! - `UploadTask` - the observable per-file state machine
//! - `UploadCoordinator` - spawns transfers and inserts image nodes into
//!   the document at completion time
//! - `AssetStore` - the gateway trait, with an in-memory implementation

pub mod candidate;
pub mod coordinator;
pub mod key;
pub mod store;
pub mod task;
pub mod validate;

pub use candidate::{FileCandidate, SourceChannel};
pub use coordinator::{CoordinatorEvents, Notice, NoticeLevel, UploadCoordinator};
pub use key::{KeyTicker, sanitize_file_name};
pub use store::{AssetStore, MemoryStore, ProgressFn, StoredObject, UploadOptions};
pub use task::{TaskId, UploadState, UploadTask};
pub use validate::validate;
