//! scribe-common: shared plumbing for the composer workspace.
//!
//! Error taxonomy, configuration, and telemetry setup used by the editor
//! core, the upload pipeline, and the shell.

pub mod config;
pub mod error;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::config::{ComposerConfig, FileStore, Loader, Saver, StoreOptions, UploadLimits};
pub use crate::error::{
    ParseError, ParseErrorKind, ScribeError, SerDeError, StoreError, ValidationError,
};
