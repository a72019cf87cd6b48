//! Toolbar state projection and dispatch.
//!
//! [`derive_state`] is a pure read over (document, selection): no side
//! effects, recomputed whenever either changes. "Active" means the mark or
//! block type is uniformly applied across the full selection; partial
//! application reads as inactive.

use crate::commands::{Command, CommandKind};
use crate::document::Document;
use crate::execute;
use crate::schema::{BlockType, HeadingLevel, Mark, MarkKind};
use crate::types::EventResponse;

/// Per-control state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlState {
    pub active: bool,
    pub enabled: bool,
}

/// Derived state for every toolbar control.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolbarState {
    states: [ControlState; CommandKind::ALL.len()],
}

impl ToolbarState {
    pub fn get(&self, kind: CommandKind) -> ControlState {
        self.states[index(kind)]
    }

    fn set(&mut self, kind: CommandKind, state: ControlState) {
        self.states[index(kind)] = state;
    }
}

fn index(kind: CommandKind) -> usize {
    CommandKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(0)
}

/// Compute the toolbar state for the document's current selection.
pub fn derive_state(doc: &Document) -> ToolbarState {
    let mut state = ToolbarState::default();
    let sel = doc.selection();

    // Inline marks.
    let (marks_enabled, bold_active, italic_active) = if sel.is_collapsed() {
        let pos = doc.cursor();
        let textual = doc
            .block(pos.block)
            .map(|b| b.is_textual())
            .unwrap_or(false);
        let at_cursor = doc
            .pending_marks()
            .cloned()
            .unwrap_or_else(|| execute::marks_at(doc, pos));
        (
            textual,
            at_cursor.has(MarkKind::Bold),
            at_cursor.has(MarkKind::Italic),
        )
    } else {
        (
            execute::selection_has_text(doc),
            execute::selection_uniformly_marked(doc, MarkKind::Bold),
            execute::selection_uniformly_marked(doc, MarkKind::Italic),
        )
    };
    state.set(
        CommandKind::Bold,
        ControlState {
            active: marks_enabled && bold_active,
            enabled: marks_enabled,
        },
    );
    state.set(
        CommandKind::Italic,
        ControlState {
            active: marks_enabled && italic_active,
            enabled: marks_enabled,
        },
    );

    // Block types.
    let range = sel.block_range();
    let any_textual = range
        .clone()
        .filter_map(|i| doc.block(i))
        .any(|b| b.is_textual());
    let uniform_type = |target: BlockType| {
        range
            .clone()
            .filter_map(|i| doc.block(i))
            .all(|b| b.block_type() == target)
    };
    let block_controls = [
        (CommandKind::Heading2, BlockType::Heading(HeadingLevel::H2)),
        (CommandKind::Heading3, BlockType::Heading(HeadingLevel::H3)),
        (CommandKind::BulletList, BlockType::BulletList),
        (CommandKind::OrderedList, BlockType::OrderedList),
        (CommandKind::Blockquote, BlockType::Blockquote),
    ];
    for (kind, target) in block_controls {
        state.set(
            kind,
            ControlState {
                active: any_textual && uniform_type(target),
                enabled: any_textual,
            },
        );
    }

    // Image upload is always offered and never "applied".
    state.set(
        CommandKind::Image,
        ControlState {
            active: false,
            enabled: true,
        },
    );

    state
}

/// Map a toolbar click to the command it dispatches.
///
/// Block controls toggle: clicking an active control reverts the block to a
/// paragraph. The image control returns `None` - it opens the file picker
/// instead of mutating the document.
pub fn command_for(kind: CommandKind, state: &ToolbarState) -> Option<Command> {
    let active = state.get(kind).active;
    let block = |target: BlockType| {
        Some(Command::SetBlockType(if active {
            BlockType::Paragraph
        } else {
            target
        }))
    };
    match kind {
        CommandKind::Bold => Some(Command::ToggleMark(Mark::Bold)),
        CommandKind::Italic => Some(Command::ToggleMark(Mark::Italic)),
        CommandKind::Heading2 => block(BlockType::Heading(HeadingLevel::H2)),
        CommandKind::Heading3 => block(BlockType::Heading(HeadingLevel::H3)),
        CommandKind::BulletList => block(BlockType::BulletList),
        CommandKind::OrderedList => block(BlockType::OrderedList),
        CommandKind::Blockquote => block(BlockType::Blockquote),
        CommandKind::Image => None,
    }
}

/// Pointer-down on any toolbar control is consumed so the click cannot steal
/// focus from the document before the command runs.
pub fn on_pointer_down() -> EventResponse {
    EventResponse::Consumed
}
