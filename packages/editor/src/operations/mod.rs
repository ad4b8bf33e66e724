//! # Operations
//!
//! The closed set of atomic, invertible edits. Every change to a value,
//! including selection moves, is expressed as one of these operations,
//! which is what makes history replay and inversion possible.
//!
//! ## Design
//!
//! - Each variant carries exactly the fields needed to apply *and*
//!   invert it. The four `set_*` variants additionally carry the
//!   previous property values, captured when the operation is created,
//!   so they stay invertible after the document has moved on.
//! - Serialization whitelists the applied fields only: the captured
//!   "before" state is local bookkeeping and never leaves the process.
//! - Unknown operation types are unrepresentable in memory; a stray tag
//!   in serialized input fails deserialization loudly.

mod apply;
mod invert;

pub use apply::apply_operation;
pub use invert::invert_operation;

use serde::{Deserialize, Serialize};
use vellum_model::{
    Mark, MarkProperties, Node, NodeProperties, Path, SelectionProperties,
};

use crate::value::ValueProperties;

/// An atomic, invertible edit to the tree, selection, or value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Insert `node` at `path`; the final path segment is the index
    /// among the parent's children.
    InsertNode { path: Path, node: Node },

    /// Remove the node at `path`. Carries the removed node so the
    /// inverse can reinsert it.
    RemoveNode { path: Path, node: Node },

    /// Move the node at `path` to `new_path`.
    MoveNode {
        path: Path,
        #[serde(rename = "newPath")]
        new_path: Path,
    },

    /// Merge the node at `path` into its left sibling. `position` is
    /// the left sibling's size before the merge and `properties` are
    /// the merged node's own, both captured so the inverse split can
    /// restore it exactly.
    MergeNode {
        path: Path,
        position: usize,
        #[serde(default, skip_serializing_if = "NodeProperties::is_empty")]
        properties: NodeProperties,
    },

    /// Split the node at `path` at `position`: a character offset for
    /// text nodes, a child index for containers. `properties` override
    /// the newly created right node.
    SplitNode {
        path: Path,
        position: usize,
        #[serde(default, skip_serializing_if = "NodeProperties::is_empty")]
        properties: NodeProperties,
    },

    /// Overwrite container-node properties at `path`. `previous` holds
    /// the overwritten values for inversion and is not serialized.
    SetNode {
        path: Path,
        properties: NodeProperties,
        #[serde(skip)]
        previous: NodeProperties,
    },

    /// Insert `text` at a character offset in the text node at `path`.
    /// `marks` of `None` inherit the marks at the offset.
    InsertText {
        path: Path,
        offset: usize,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marks: Option<Vec<Mark>>,
    },

    /// Remove `text` starting at a character offset in the text node at
    /// `path`. The text and its marks are captured so the inverse
    /// insertion restores the exact leaves.
    RemoveText {
        path: Path,
        offset: usize,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marks: Option<Vec<Mark>>,
    },

    /// Add `mark` over `[offset, offset + length)` of the text at `path`.
    AddMark {
        path: Path,
        offset: usize,
        length: usize,
        mark: Mark,
    },

    /// Remove `mark` over `[offset, offset + length)` of the text at `path`.
    RemoveMark {
        path: Path,
        offset: usize,
        length: usize,
        mark: Mark,
    },

    /// Update `mark` in place over the interval with partial properties.
    SetMark {
        path: Path,
        offset: usize,
        length: usize,
        mark: Mark,
        properties: MarkProperties,
    },

    /// Update the selection. `previous` holds the overwritten fields
    /// for inversion and is not serialized.
    SetSelection {
        properties: SelectionProperties,
        #[serde(skip)]
        previous: SelectionProperties,
    },

    /// Update value-level state (data, decorations). `previous` holds
    /// the overwritten fields for inversion and is not serialized.
    SetValue {
        properties: ValueProperties,
        #[serde(skip)]
        previous: ValueProperties,
    },
}

impl Operation {
    /// The serialized tag of this operation, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::InsertNode { .. } => "insert_node",
            Operation::RemoveNode { .. } => "remove_node",
            Operation::MoveNode { .. } => "move_node",
            Operation::MergeNode { .. } => "merge_node",
            Operation::SplitNode { .. } => "split_node",
            Operation::SetNode { .. } => "set_node",
            Operation::InsertText { .. } => "insert_text",
            Operation::RemoveText { .. } => "remove_text",
            Operation::AddMark { .. } => "add_mark",
            Operation::RemoveMark { .. } => "remove_mark",
            Operation::SetMark { .. } => "set_mark",
            Operation::SetSelection { .. } => "set_selection",
            Operation::SetValue { .. } => "set_value",
        }
    }

    /// Whether this operation changes document structure (as opposed to
    /// selection or value-level state).
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Operation::SetSelection { .. } | Operation::SetValue { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::Text;

    #[test]
    fn test_operation_serialization_whitelists_fields() {
        let op = Operation::SetNode {
            path: Path::new(vec![0]),
            properties: NodeProperties {
                node_type: Some("quote".to_string()),
                data: None,
                is_void: None,
            },
            previous: NodeProperties {
                node_type: Some("paragraph".to_string()),
                data: None,
                is_void: None,
            },
        };

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "set_node");
        assert_eq!(json["properties"]["type"], "quote");
        assert!(json.get("previous").is_none());
    }

    #[test]
    fn test_operation_round_trip() {
        let op = Operation::InsertText {
            path: Path::new(vec![0, 0]),
            offset: 2,
            text: "hi".to_string(),
            marks: None,
        };

        let json = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_unknown_operation_type_is_rejected() {
        let result = serde_json::from_str::<Operation>(r#"{"type":"frobnicate","path":[0]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_split_node_serializes_path_position_properties() {
        let op = Operation::SplitNode {
            path: Path::new(vec![0, 1]),
            position: 3,
            properties: NodeProperties::default(),
        };

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "split_node");
        assert_eq!(json["path"], serde_json::json!([0, 1]));
        assert_eq!(json["position"], 3);
        // Empty properties are elided entirely.
        assert!(json.get("properties").is_none());
    }

    #[test]
    fn test_remove_node_carries_the_node() {
        let op = Operation::RemoveNode {
            path: Path::new(vec![1]),
            node: Node::Text(Text::new("bye")),
        };

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["node"]["object"], "text");
    }
}
