//! scribe-editor-core: Pure Rust rich-text document logic without framework
//! dependencies.
//!
//! This crate provides:
//! - The closed document schema (blocks, inline runs, marks)
//! - `Document` - the block tree with selection, versioning, and undo
//! - `Command` application - all mutations go through `Document::apply`
//! - Toolbar state projection and dispatch
//! - Markup (HTML) serialization and its inverse parser

mod commands;
mod document;
mod execute;
mod markup;
mod parse;
pub mod schema;
pub mod toolbar;
pub mod types;
mod undo;

pub use commands::{Command, CommandKind};
pub use document::{Document, DocumentSnapshot};
pub use schema::{
    Block, BlockType, HeadingLevel, ImageAttrs, InlineRun, Mark, MarkKind, MarkSet, Segment,
};
pub use smol_str::SmolStr;
pub use toolbar::{ControlState, ToolbarState, command_for, derive_state};
pub use types::{EventResponse, Position, Selection};
