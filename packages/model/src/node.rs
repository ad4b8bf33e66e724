use crate::key::Key;
use crate::text::Text;
use crate::DataMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// A block-level container node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(skip_serializing, default = "Key::fresh")]
    pub key: Key,

    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_void: bool,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// An inline container node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inline {
    #[serde(skip_serializing, default = "Key::fresh")]
    pub key: Key,

    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_void: bool,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Block {
    pub fn new(node_type: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            key: Key::fresh(),
            node_type: node_type.into(),
            data: DataMap::new(),
            is_void: false,
            nodes,
        }
    }

    pub fn void(node_type: impl Into<String>) -> Self {
        Self {
            is_void: true,
            ..Self::new(node_type, vec![Node::Text(Text::empty())])
        }
    }
}

impl Inline {
    pub fn new(node_type: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            key: Key::fresh(),
            node_type: node_type.into(),
            data: DataMap::new(),
            is_void: false,
            nodes,
        }
    }

    pub fn void(node_type: impl Into<String>) -> Self {
        Self {
            is_void: true,
            ..Self::new(node_type, vec![Node::Text(Text::empty())])
        }
    }
}

// Structural equality: keys are ignored.
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.node_type == other.node_type
            && self.data == other.data
            && self.is_void == other.is_void
            && self.nodes == other.nodes
    }
}

impl PartialEq for Inline {
    fn eq(&self, other: &Self) -> bool {
        self.node_type == other.node_type
            && self.data == other.data
            && self.is_void == other.is_void
            && self.nodes == other.nodes
    }
}

/// Any node that can appear below the document root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
pub enum Node {
    Block(Block),
    Inline(Inline),
    Text(Text),
}

impl Node {
    pub fn key(&self) -> &Key {
        match self {
            Node::Block(b) => &b.key,
            Node::Inline(i) => &i.key,
            Node::Text(t) => &t.key,
        }
    }

    /// The node's `type`, absent for text nodes.
    pub fn node_type(&self) -> Option<&str> {
        match self {
            Node::Block(b) => Some(&b.node_type),
            Node::Inline(i) => Some(&i.node_type),
            Node::Text(_) => None,
        }
    }

    pub fn data(&self) -> Option<&DataMap> {
        match self {
            Node::Block(b) => Some(&b.data),
            Node::Inline(i) => Some(&i.data),
            Node::Text(_) => None,
        }
    }

    pub fn is_void(&self) -> bool {
        match self {
            Node::Block(b) => b.is_void,
            Node::Inline(i) => i.is_void,
            Node::Text(_) => false,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Node::Block(_))
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Node::Inline(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Children of a container node; `None` for text nodes.
    pub fn nodes(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Block(b) => Some(&b.nodes),
            Node::Inline(i) => Some(&i.nodes),
            Node::Text(_) => None,
        }
    }

    pub fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Block(b) => Some(&mut b.nodes),
            Node::Inline(i) => Some(&mut i.nodes),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    /// The concatenated text of the whole subtree.
    pub fn text(&self) -> String {
        match self {
            Node::Text(t) => t.text(),
            _ => self
                .nodes()
                .map(|nodes| nodes.iter().map(|n| n.text()).collect())
                .unwrap_or_default(),
        }
    }

    /// Subtree text length in characters.
    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(t) => t.len(),
            _ => self
                .nodes()
                .map(|nodes| nodes.iter().map(|n| n.text_len()).sum())
                .unwrap_or(0),
        }
    }

    /// Collect every key in the subtree into `keys`.
    pub fn collect_keys(&self, keys: &mut HashSet<Key>) {
        keys.insert(self.key().clone());
        if let Some(nodes) = self.nodes() {
            for node in nodes {
                node.collect_keys(keys);
            }
        }
    }

    /// Regenerate every key in the subtree that collides with `taken`.
    /// Used when a subtree is inserted into a tree that already contains
    /// some of its keys, to keep keys unique within one document.
    pub fn regenerate_colliding_keys(&mut self, taken: &HashSet<Key>) {
        let colliding = taken.contains(self.key());
        match self {
            Node::Block(b) => {
                if colliding {
                    b.key = Key::fresh();
                }
                for node in &mut b.nodes {
                    node.regenerate_colliding_keys(taken);
                }
            }
            Node::Inline(i) => {
                if colliding {
                    i.key = Key::fresh();
                }
                for node in &mut i.nodes {
                    node.regenerate_colliding_keys(taken);
                }
            }
            Node::Text(t) => {
                if colliding {
                    t.key = Key::fresh();
                }
            }
        }
    }
}

/// Partial container-node properties, the payload of `set_node` and the
/// overrides a `split_node` can apply to the newly created half.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperties {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_void: Option<bool>,
}

impl NodeProperties {
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none() && self.data.is_none() && self.is_void.is_none()
    }

    /// Overwrite the given fields on a container node. Text nodes have
    /// no settable properties and are left untouched.
    pub fn apply_to(&self, node: &mut Node) {
        match node {
            Node::Block(b) => {
                if let Some(t) = &self.node_type {
                    b.node_type = t.clone();
                }
                if let Some(d) = &self.data {
                    b.data = d.clone();
                }
                if let Some(v) = self.is_void {
                    b.is_void = v;
                }
            }
            Node::Inline(i) => {
                if let Some(t) = &self.node_type {
                    i.node_type = t.clone();
                }
                if let Some(d) = &self.data {
                    i.data = d.clone();
                }
                if let Some(v) = self.is_void {
                    i.is_void = v;
                }
            }
            Node::Text(_) => {}
        }
    }

    /// Capture, from `node`, the previous values of exactly the fields
    /// this properties object would overwrite.
    pub fn captured_from(&self, node: &Node) -> NodeProperties {
        NodeProperties {
            node_type: self
                .node_type
                .as_ref()
                .and_then(|_| node.node_type().map(str::to_string)),
            data: self.data.as_ref().and_then(|_| node.data().cloned()),
            is_void: self.is_void.map(|_| node.is_void()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Leaf;

    #[test]
    fn test_equality_ignores_keys() {
        let a = Block::new("paragraph", vec![Node::Text(Text::new("hi"))]);
        let b = Block::new("paragraph", vec![Node::Text(Text::new("hi"))]);

        assert_ne!(a.key, b.key);
        assert_eq!(a, b);
    }

    #[test]
    fn test_subtree_text_concatenation() {
        let block = Node::Block(Block::new(
            "paragraph",
            vec![
                Node::Text(Text::new("one ")),
                Node::Inline(Inline::new("link", vec![Node::Text(Text::new("two"))])),
                Node::Text(Text::new(" three")),
            ],
        ));

        assert_eq!(block.text(), "one two three");
        assert_eq!(block.text_len(), 13);
    }

    #[test]
    fn test_regenerate_only_colliding_keys() {
        let mut node = Node::Block(Block::new(
            "paragraph",
            vec![Node::Text(Text::new("a")), Node::Text(Text::new("b"))],
        ));
        let kept = node.nodes().unwrap()[1].key().clone();

        let mut taken = HashSet::new();
        taken.insert(node.key().clone());
        taken.insert(node.nodes().unwrap()[0].key().clone());

        let old_root = node.key().clone();
        let old_first = node.nodes().unwrap()[0].key().clone();
        node.regenerate_colliding_keys(&taken);

        assert_ne!(*node.key(), old_root);
        assert_ne!(*node.nodes().unwrap()[0].key(), old_first);
        assert_eq!(*node.nodes().unwrap()[1].key(), kept);
    }

    #[test]
    fn test_properties_capture_inverts_apply() {
        let mut node = Node::Block(Block::new("paragraph", vec![]));
        let before = node.clone();

        let props = NodeProperties {
            node_type: Some("quote".to_string()),
            data: None,
            is_void: Some(true),
        };
        let captured = props.captured_from(&node);

        props.apply_to(&mut node);
        assert_eq!(node.node_type(), Some("quote"));
        assert!(node.is_void());

        captured.apply_to(&mut node);
        assert_eq!(node, before);
    }

    #[test]
    fn test_node_json_shape() {
        let node = Node::Block(Block::new(
            "paragraph",
            vec![Node::Text(Text::from_leaves(vec![Leaf::plain("hi")]))],
        ));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["object"], "block");
        assert_eq!(json["type"], "paragraph");
        assert_eq!(json["nodes"][0]["object"], "text");
        assert_eq!(json["nodes"][0]["leaves"][0]["text"], "hi");
        assert!(json.get("key").is_none());
    }
}
