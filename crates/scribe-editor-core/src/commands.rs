//! Editor commands and the closed command-kind enumeration.
//!
//! A [`Command`] is a semantic mutation request, decoupled from how it was
//! triggered (toolbar click, keyboard shortcut, upload completion). The
//! toolbar works in terms of [`CommandKind`], the attribute-free projection
//! used for per-control state.

use crate::schema::{Block, BlockType, Mark};

/// All possible document mutations.
///
/// Commands are total: one that does not fit the current tree and selection
/// (for example toggling a mark when only an image is selected) applies as a
/// no-op, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Toggle an inline mark across the selection. Over a caret this flips
    /// the pending marks used by the next text insertion instead.
    ToggleMark(Mark),

    /// Set the block type of every block the selection touches.
    SetBlockType(BlockType),

    /// Insert a node at the cursor, collapsing the selection to immediately
    /// after it.
    InsertNode(Block),

    /// Insert text at the cursor, replacing any selected content.
    InsertText(String),

    /// Undo the last change.
    Undo,

    /// Redo the last undone change.
    Redo,
}

/// The closed set of toolbar controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Bold,
    Italic,
    Heading2,
    Heading3,
    BulletList,
    OrderedList,
    Blockquote,
    Image,
}

impl CommandKind {
    /// Every control, in toolbar order.
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Bold,
        CommandKind::Italic,
        CommandKind::Heading2,
        CommandKind::Heading3,
        CommandKind::BulletList,
        CommandKind::OrderedList,
        CommandKind::Blockquote,
        CommandKind::Image,
    ];

    /// Whether this control drives an inline mark (rather than a block type).
    pub fn is_mark(&self) -> bool {
        matches!(self, CommandKind::Bold | CommandKind::Italic)
    }
}
