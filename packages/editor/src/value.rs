//! # Value
//!
//! The immutable snapshot a session hands out: the document tree plus
//! the selection, decorations, user data, the schema that governs
//! normalization, and the undo/redo history.
//!
//! A value is never edited in place by callers. A [`Change`] clones the
//! value at construction and mutates its own copy, so every snapshot a
//! reader holds stays valid no matter what happens afterwards.
//!
//! [`Change`]: crate::change::Change

use serde::{Deserialize, Serialize};
use vellum_model::{DataMap, Decoration, Document, Mark, Node, Range, Selection, Text};

use crate::change::Change;
use crate::errors::EditorError;
use crate::history::History;
use crate::schema::Schema;

/// The root aggregate of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "object", rename = "value", rename_all = "camelCase")]
pub struct Value {
    pub document: Document,

    #[serde(default)]
    pub selection: Selection,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorations: Vec<Decoration>,

    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,

    #[serde(skip)]
    pub schema: Schema,

    #[serde(skip)]
    pub history: History,
}

// Schema and history are session apparatus; two values are the same
// snapshot when their observable state matches.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
            && self.selection == other.selection
            && self.decorations == other.decorations
            && self.data == other.data
    }
}

impl Value {
    /// Wrap a document without normalizing it. Most callers want
    /// [`Value::create`] instead.
    pub fn new(document: Document) -> Self {
        Self {
            document,
            selection: Selection::default(),
            decorations: Vec::new(),
            data: DataMap::new(),
            schema: Schema::default(),
            history: History::new(),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Build a value from a document, running the normalization
    /// fixpoint so the result satisfies every structural invariant,
    /// without recording anything into history.
    pub fn create(document: Document, schema: Schema) -> Result<Self, EditorError> {
        let value = Value::new(document).with_schema(schema);
        let mut change = Change::new(value);
        change.without_saving(|c| c.normalize())?;
        let mut value = change.into_value();
        value.selection = value.selection.normalized(&value.document);
        Ok(value)
    }

    /// Deserialize and normalize a value.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let value: Value = serde_json::from_str(json)?;
        let mut change = Change::new(value);
        change.without_saving(|c| c.normalize())?;
        let mut value = change.into_value();
        value.selection = value.selection.normalized(&value.document);
        Ok(value)
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, EditorError> {
        Ok(serde_json::to_value(self)?)
    }

    // ---------------------------------------------------------------
    // Read accessors: the surface a rendering adapter consumes.
    // ---------------------------------------------------------------

    /// The leaf blocks of the document.
    pub fn get_blocks(&self) -> Vec<&Node> {
        self.document.get_blocks().into_iter().map(|(_, n)| n).collect()
    }

    /// Every text node in document order.
    pub fn get_texts(&self) -> Vec<&Text> {
        self.document.get_texts().into_iter().map(|(_, t)| t).collect()
    }

    /// The union of marks under `range`.
    pub fn get_marks_at_range(&self, range: &Range) -> Vec<Mark> {
        let range = range.normalized(&self.document);
        let (start, end) = (range.start(), range.end());
        match (&start.path, &end.path) {
            (Some(start_path), Some(end_path)) => self.document.get_marks_between(
                start_path,
                start.offset,
                end_path,
                end.offset,
            ),
            _ => Vec::new(),
        }
    }

    /// The union of marks under the current selection.
    pub fn get_marks_at_selection(&self) -> Vec<Mark> {
        self.get_marks_at_range(&self.selection.as_range())
    }
}

/// Partial value-level properties: the payload of `set_value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorations: Option<Vec<Decoration>>,
}

impl ValueProperties {
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.decorations.is_none()
    }

    /// Overwrite the given value-level fields.
    pub fn apply_to(&self, value: &mut Value) {
        if let Some(data) = &self.data {
            value.data = data.clone();
        }
        if let Some(decorations) = &self.decorations {
            value.decorations = decorations
                .iter()
                .map(|d| d.normalized(&value.document))
                .filter(|d| d.is_set())
                .collect();
        }
    }

    /// Capture, from `value`, the previous values of exactly the fields
    /// this properties object would overwrite.
    pub fn captured_from(&self, value: &Value) -> ValueProperties {
        ValueProperties {
            data: self.data.as_ref().map(|_| value.data.clone()),
            decorations: self.decorations.as_ref().map(|_| value.decorations.clone()),
        }
    }
}
