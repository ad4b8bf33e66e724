//! # Vellum Editor
//!
//! The editing engine over the Vellum document model: an invertible
//! operation log, a schema-driven normalization fixpoint, undo/redo
//! history, and the change/session façade that ties them together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: node tree + addressing               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Value lifecycle + operations        │
//! │  - Apply/invert atomic operations           │
//! │  - Normalize against the schema fixpoint    │
//! │  - Record history, replay for undo/redo     │
//! │  - Sequence composite edits in a Change     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ host adapter: rendering + input (external)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core principles
//!
//! 1. **The value is immutable**: every edit produces a new snapshot;
//!    readers of old snapshots are never invalidated.
//! 2. **Operations are the only write path**: every edit, selection
//!    move included, is an [`Operation`] with an exact inverse.
//! 3. **Normalization is a fixpoint**: after a batch of operations the
//!    schema repairs the tree until every invariant holds, and the
//!    repairs are operations too, so they undo with the edit.
//! 4. **History is linear**: one writer, bounded batches, no merge
//!    semantics between peers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vellum_editor::{Editor, Value};
//!
//! let value = Value::from_json(json)?;
//! let mut editor = Editor::new(value)?;
//!
//! editor.change(|c| c.insert_text("hello"))?;
//! editor.undo()?;
//! ```

pub mod change;
pub mod editor;
pub mod errors;
pub mod history;
pub mod operations;
pub mod schema;
pub mod value;

pub use change::Change;
pub use editor::Editor;
pub use errors::EditorError;
pub use history::{Batch, History};
pub use operations::{apply_operation, invert_operation, Operation};
pub use schema::{
    ChildSpec, DataValidator, NodeKind, NodeMatch, NodeRule, RuleNormalizer, RuleSet, Schema,
    Violation,
};
pub use value::{Value, ValueProperties};

// Re-export the model types callers touch constantly.
pub use vellum_model::{
    Block, DataMap, Decoration, Document, Inline, Key, Leaf, Mark, MarkProperties, ModelError,
    Node, NodeProperties, Path, Point, Range, Selection, SelectionProperties, Text,
};
