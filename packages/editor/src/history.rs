//! # History
//!
//! Bounded undo/redo stacks of operation batches.
//!
//! ## Design
//!
//! - Operations saved back-to-back are grouped into batches; a batch is
//!   undone/redone as one unit.
//! - Whether an operation merges into the previous batch is decided by
//!   the caller's `merge` flag, falling back to a heuristic: selection
//!   moves collapse together, and contiguous typing (or contiguous
//!   backspacing) in one text node stays one batch.
//! - Bare selection moves on top of other selection moves are skipped
//!   entirely; they carry no information worth a history slot.
//! - Saving anything clears the redo stack.

use tracing::trace;

use crate::operations::Operation;

/// Maximum number of undo batches retained.
const MAX_UNDOS: usize = 100;

/// A group of operations undone/redone as one unit.
pub type Batch = Vec<Operation>;

/// Undo/redo history for a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    undos: Vec<Batch>,
    redos: Vec<Batch>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `operation`, deciding batch membership via the explicit
    /// flags when given, or the merge/skip heuristics otherwise.
    pub fn save(&mut self, operation: Operation, merge: Option<bool>, skip: Option<bool>) {
        let (skip, merge) = {
            let previous = self.undos.last().and_then(|batch| batch.last());
            (
                skip.unwrap_or_else(|| should_skip(&operation, previous)),
                merge.unwrap_or_else(|| should_merge(&operation, previous)),
            )
        };

        if skip {
            trace!(kind = operation.kind(), "history skip");
            return;
        }

        if merge && !self.undos.is_empty() {
            trace!(kind = operation.kind(), "history merge");
            if let Some(batch) = self.undos.last_mut() {
                batch.push(operation);
            }
        } else {
            self.undos.push(vec![operation]);
            if self.undos.len() > MAX_UNDOS {
                self.undos.remove(0);
            }
        }

        // A new action invalidates the redo future.
        self.redos.clear();
    }

    /// Pop the most recent undo batch.
    pub fn pop_undo(&mut self) -> Option<Batch> {
        self.undos.pop()
    }

    /// Pop the most recent redo batch.
    pub fn pop_redo(&mut self) -> Option<Batch> {
        self.redos.pop()
    }

    /// Park an undone batch on the redo stack.
    pub fn push_redo(&mut self, batch: Batch) {
        self.redos.push(batch);
    }

    /// Reinstate a redone batch on the undo stack without clearing the
    /// remaining redos.
    pub fn push_undo(&mut self, batch: Batch) {
        self.undos.push(batch);
        if self.undos.len() > MAX_UNDOS {
            self.undos.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undos.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redos.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undos.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redos.len()
    }

    pub fn clear(&mut self) {
        self.undos.clear();
        self.redos.clear();
    }
}

/// Merge heuristic: selection follows selection, and contiguous
/// insertions/removals in the same text node belong to one batch.
fn should_merge(operation: &Operation, previous: Option<&Operation>) -> bool {
    let Some(previous) = previous else {
        return false;
    };

    match (operation, previous) {
        (Operation::SetSelection { .. }, Operation::SetSelection { .. }) => true,

        (
            Operation::InsertText { path, offset, .. },
            Operation::InsertText {
                path: prev_path,
                offset: prev_offset,
                text: prev_text,
                ..
            },
        ) => path == prev_path && *offset == prev_offset + prev_text.chars().count(),

        (
            Operation::RemoveText { path, offset, text, .. },
            Operation::RemoveText {
                path: prev_path,
                offset: prev_offset,
                ..
            },
        ) => path == prev_path && offset + text.chars().count() == *prev_offset,

        _ => false,
    }
}

/// Skip heuristic: a selection move on top of nothing, or of another
/// selection move, never starts a batch of its own.
fn should_skip(operation: &Operation, previous: Option<&Operation>) -> bool {
    matches!(operation, Operation::SetSelection { .. })
        && matches!(previous, None | Some(Operation::SetSelection { .. }))
}
