//! Undo/redo history for document mutations.
//!
//! History entries are full tree snapshots: commands restructure the block
//! tree (splits, splices, type changes), so inverse-operation bookkeeping
//! would have to cover every structural case. Snapshots keep the invariant
//! trivial - restore is assignment - at the cost of cloning the tree, which
//! stays small for post-sized documents.

use crate::schema::Block;
use crate::types::Selection;

/// Maximum retained undo steps.
const MAX_STEPS: usize = 100;

/// One restorable point in history.
#[derive(Debug, Clone)]
pub(crate) struct HistoryEntry {
    pub blocks: Vec<Block>,
    pub selection: Selection,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
}

impl History {
    /// Record the pre-mutation state. Clears the redo stack: a new edit
    /// after undo forks history.
    pub fn record(&mut self, blocks: Vec<Block>, selection: Selection) {
        self.redo_stack.clear();
        self.undo_stack.push(HistoryEntry { blocks, selection });
        while self.undo_stack.len() > MAX_STEPS {
            self.undo_stack.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pop the last recorded state, stashing `current` for redo.
    pub fn undo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(entry)
    }

    /// Pop the last undone state, stashing `current` for undo.
    pub fn redo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
