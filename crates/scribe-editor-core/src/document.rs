//! The document model: block tree, selection, and command application.
//!
//! The tree is mutated only through [`Document::apply`] - there is no public
//! way to reach into the blocks and edit them in place. Each successful
//! mutation bumps the document version, which is how asynchronous callers
//! (the upload pipeline) and the persistence hand-off observe change.

use crate::commands::Command;
use crate::execute;
use crate::markup;
use crate::parse;
use crate::schema::{Block, MarkSet};
use crate::types::{Position, Selection};
use crate::undo::History;
use scribe_common::ParseError;

/// State returned to the caller after a command application.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// Version after the command. Unchanged when the command was a no-op.
    pub version: u64,
    pub selection: Selection,
    /// The serialized markup of the post-command tree.
    pub markup: String,
    /// Whether the command mutated the tree.
    pub changed: bool,
}

/// An editable rich-text document.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) blocks: Vec<Block>,
    pub(crate) selection: Selection,
    /// Marks to apply to the next text insertion, set by toggling a mark
    /// over a caret. Cleared whenever the selection moves.
    pub(crate) pending_marks: Option<MarkSet>,
    pub(crate) version: u64,
    pub(crate) history: History,
}

impl Document {
    /// A document holding a single empty paragraph, cursor at the start.
    pub fn new() -> Self {
        Self::from_blocks(Vec::new())
    }

    /// Build a document from parsed blocks. An empty list becomes the empty
    /// single-paragraph document so the cursor always has somewhere to live.
    pub fn from_blocks(mut blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            blocks.push(Block::empty_paragraph());
        }
        Self {
            blocks,
            selection: Selection::default(),
            pending_marks: None,
            version: 0,
            history: History::default(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, idx: usize) -> Option<&Block> {
        self.blocks.get(idx)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// The cursor is the selection head.
    pub fn cursor(&self) -> Position {
        self.selection.head
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn pending_marks(&self) -> Option<&MarkSet> {
        self.pending_marks.as_ref()
    }

    /// Move the selection. Both ends are clamped to valid positions in the
    /// current tree. Moving the selection drops any pending marks.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Selection::new(
            self.clamp_position(selection.anchor),
            self.clamp_position(selection.head),
        );
        self.pending_marks = None;
    }

    /// Apply a command and return the resulting snapshot.
    ///
    /// Total over every (tree, selection) pair: commands that do not fit the
    /// schema apply as no-ops and leave the version untouched.
    pub fn apply(&mut self, cmd: Command) -> DocumentSnapshot {
        let changed = execute::apply_command(self, &cmd);
        if changed {
            self.version += 1;
        }
        DocumentSnapshot {
            version: self.version,
            selection: self.selection,
            markup: self.serialize(),
            changed,
        }
    }

    /// Serialize the tree to the persisted markup representation.
    pub fn serialize(&self) -> String {
        markup::serialize_blocks(&self.blocks)
    }

    /// Parse persisted markup back into a document.
    ///
    /// Inverse of [`serialize`](Self::serialize) for every document in the
    /// closed schema.
    pub fn deserialize(src: &str) -> Result<Self, ParseError> {
        let blocks = parse::parse_blocks(src)?;
        Ok(Self::from_blocks(blocks))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The last valid position in the document.
    pub fn end_position(&self) -> Position {
        let block = self.blocks.len() - 1;
        let segment = self.blocks[block].segment_count().saturating_sub(1);
        let offset = self.blocks[block]
            .segment(segment)
            .map(|seg| seg.len_chars())
            .unwrap_or(0);
        Position {
            block,
            segment,
            offset,
        }
    }

    /// Clamp a position to the nearest valid location in the current tree.
    pub fn clamp_position(&self, pos: Position) -> Position {
        let block = pos.block.min(self.blocks.len() - 1);
        let count = self.blocks[block].segment_count();
        if count == 0 {
            return Position::start_of(block);
        }
        let segment = pos.segment.min(count - 1);
        let offset = pos
            .offset
            .min(self.blocks[block].segment(segment).map(|seg| seg.len_chars()).unwrap_or(0));
        Position {
            block,
            segment,
            offset,
        }
    }

    /// Re-clamp the selection after a structural mutation.
    pub(crate) fn clamp_selection(&mut self) {
        self.selection = Selection::new(
            self.clamp_position(self.selection.anchor),
            self.clamp_position(self.selection.head),
        );
    }

    /// Snapshot the tree for history, before a mutation.
    pub(crate) fn record_history(&mut self) {
        let blocks = self.blocks.clone();
        let selection = self.selection;
        self.history.record(blocks, selection);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: two documents are equal when their block trees are.
/// Selection, history, and version are transient editing state.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks
    }
}

impl Eq for Document {}
