//! # Editor Session
//!
//! The host-facing façade: one editor owns the current [`Value`] and
//! sequences every edit through a [`Change`]. A rendering or input
//! adapter talks to this surface only — it hands in edit closures and
//! consumes read-only views of the resulting value.

use vellum_model::{Decoration, Document, Key, Node, Selection};

use crate::change::Change;
use crate::errors::EditorError;
use crate::schema::Schema;
use crate::value::Value;

pub struct Editor {
    value: Value,
}

impl Editor {
    /// Start a session over `value`, normalizing it first so every
    /// structural invariant holds before the first edit. Construction
    /// repairs are not recorded into history.
    pub fn new(value: Value) -> Result<Self, EditorError> {
        let mut change = Change::new(value);
        change.without_saving(|c| c.normalize())?;
        let mut value = change.into_value();
        value.selection = value.selection.normalized(&value.document);
        Ok(Self { value })
    }

    /// Start a session over a bare document.
    pub fn from_document(document: Document, schema: Schema) -> Result<Self, EditorError> {
        Self::new(Value::new(document).with_schema(schema))
    }

    /// The current snapshot. Clones of this stay valid forever; later
    /// edits produce new values instead of touching old ones.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn document(&self) -> &Document {
        &self.value.document
    }

    pub fn selection(&self) -> &Selection {
        &self.value.selection
    }

    /// Run an edit closure against a fresh change and commit the
    /// resulting value. The previous value is untouched; on error the
    /// session keeps it.
    pub fn change<F>(&mut self, f: F) -> Result<&Value, EditorError>
    where
        F: FnOnce(&mut Change) -> Result<(), EditorError>,
    {
        let mut change = Change::new(self.value.clone());
        f(&mut change)?;
        self.value = change.into_value();
        Ok(&self.value)
    }

    pub fn undo(&mut self) -> Result<&Value, EditorError> {
        self.change(|c| c.undo())
    }

    pub fn redo(&mut self) -> Result<&Value, EditorError> {
        self.change(|c| c.redo())
    }

    /// Whether the node with `key` is void.
    pub fn is_void(&self, key: &Key) -> bool {
        self.value
            .document
            .get_node_by_key(key)
            .map(Node::is_void)
            .unwrap_or(false)
    }

    /// Soft lookup by key.
    pub fn find_node(&self, key: &Key) -> Option<&Node> {
        self.value.document.get_node_by_key(key)
    }

    /// Run a decoration hook over the document and store the resulting
    /// spans on the value.
    pub fn decorate(
        &mut self,
        hook: &dyn Fn(&Node) -> Vec<Decoration>,
    ) -> Result<&Value, EditorError> {
        let decorations = self.value.document.decorations(hook);
        self.change(|c| c.set_decorations(decorations))
    }
}
