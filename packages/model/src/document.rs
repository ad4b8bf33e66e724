use crate::error::ModelError;
use crate::key::Key;
use crate::mark::Mark;
use crate::node::{Block, Inline, Node, NodeProperties};
use crate::path::Path;
use crate::range::Decoration;
use crate::text::Text;
use crate::DataMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The root of the node tree.
///
/// The document exposes two families of lookup: soft `get_*` methods
/// that return `Option` when the target is absent, and `assert_*`
/// methods that return a [`ModelError`] instead. Mutation primitives
/// address nodes by path; anything holding a path across a mutation
/// must re-derive it from the node's key first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "object", rename = "document", rename_all = "camelCase")]
pub struct Document {
    #[serde(skip_serializing, default = "Key::fresh")]
    pub key: Key,

    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.nodes == other.nodes
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            key: Key::fresh(),
            data: DataMap::new(),
            nodes: Vec::new(),
        }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self {
            key: Key::fresh(),
            data: DataMap::new(),
            nodes,
        }
    }

    // ---------------------------------------------------------------
    // Downward lookups
    // ---------------------------------------------------------------

    /// The node at `path`, or `None`. The empty path addresses the
    /// document itself, which is not a `Node`, so it resolves to `None`.
    pub fn get_descendant(&self, path: &Path) -> Option<&Node> {
        let mut indices = path.indices().iter();
        let first = *indices.next()?;
        let mut node = self.nodes.get(first)?;
        for &index in indices {
            node = node.nodes()?.get(index)?;
        }
        Some(node)
    }

    pub fn assert_descendant(&self, path: &Path) -> Result<&Node, ModelError> {
        self.get_descendant(path)
            .ok_or_else(|| ModelError::NodeNotFoundAtPath(path.clone()))
    }

    pub fn get_descendant_mut(&mut self, path: &Path) -> Option<&mut Node> {
        let mut indices = path.indices().iter();
        let first = *indices.next()?;
        let mut node = self.nodes.get_mut(first)?;
        for &index in indices {
            node = node.nodes_mut()?.get_mut(index)?;
        }
        Some(node)
    }

    pub fn assert_descendant_mut(&mut self, path: &Path) -> Result<&mut Node, ModelError> {
        if self.get_descendant(path).is_none() {
            return Err(ModelError::NodeNotFoundAtPath(path.clone()));
        }
        Ok(self.get_descendant_mut(path).unwrap())
    }

    /// Children of the node at `path`; the empty path yields the
    /// document's own children. `None` when the node is a text node or
    /// absent.
    pub fn get_children(&self, path: &Path) -> Option<&Vec<Node>> {
        if path.is_empty() {
            Some(&self.nodes)
        } else {
            self.get_descendant(path)?.nodes()
        }
    }

    pub fn get_children_mut(&mut self, path: &Path) -> Option<&mut Vec<Node>> {
        if path.is_empty() {
            Some(&mut self.nodes)
        } else {
            self.get_descendant_mut(path)?.nodes_mut()
        }
    }

    fn assert_children_mut(&mut self, path: &Path) -> Result<&mut Vec<Node>, ModelError> {
        if self.get_children(path).is_none() {
            return Err(ModelError::NodeNotFoundAtPath(path.clone()));
        }
        Ok(self.get_children_mut(path).unwrap())
    }

    // ---------------------------------------------------------------
    // Key resolution
    // ---------------------------------------------------------------

    /// Resolve a key to the node's current path.
    pub fn get_path_by_key(&self, key: &Key) -> Option<Path> {
        fn search(nodes: &[Node], base: &Path, key: &Key) -> Option<Path> {
            for (i, node) in nodes.iter().enumerate() {
                let path = base.child(i);
                if node.key() == key {
                    return Some(path);
                }
                if let Some(children) = node.nodes() {
                    if let Some(found) = search(children, &path, key) {
                        return Some(found);
                    }
                }
            }
            None
        }
        search(&self.nodes, &Path::root(), key)
    }

    pub fn assert_path_by_key(&self, key: &Key) -> Result<Path, ModelError> {
        self.get_path_by_key(key)
            .ok_or_else(|| ModelError::NodeNotFound(key.clone()))
    }

    pub fn get_node_by_key(&self, key: &Key) -> Option<&Node> {
        let path = self.get_path_by_key(key)?;
        self.get_descendant(&path)
    }

    pub fn assert_node_by_key(&self, key: &Key) -> Result<&Node, ModelError> {
        self.get_node_by_key(key)
            .ok_or_else(|| ModelError::NodeNotFound(key.clone()))
    }

    pub fn get_node_by_key_mut(&mut self, key: &Key) -> Option<&mut Node> {
        let path = self.get_path_by_key(key)?;
        self.get_descendant_mut(&path)
    }

    pub fn has_node(&self, key: &Key) -> bool {
        self.get_path_by_key(key).is_some()
    }

    /// Every key in the tree, including the document's own.
    pub fn keys(&self) -> HashSet<Key> {
        let mut keys = HashSet::new();
        keys.insert(self.key.clone());
        for node in &self.nodes {
            node.collect_keys(&mut keys);
        }
        keys
    }

    // ---------------------------------------------------------------
    // Upward lookups
    // ---------------------------------------------------------------

    /// The parent of the node at `path`; `None` when the parent is the
    /// document itself.
    pub fn get_parent(&self, path: &Path) -> Option<&Node> {
        let parent = path.parent();
        if parent.is_empty() {
            None
        } else {
            self.get_descendant(&parent)
        }
    }

    /// Ancestors of `path` from the top down, excluding the document
    /// root and the node itself.
    pub fn get_ancestors(&self, path: &Path) -> Vec<(Path, &Node)> {
        let mut ancestors = Vec::new();
        for depth in 1..path.len() {
            let ancestor = Path::new(path.indices()[..depth].to_vec());
            if let Some(node) = self.get_descendant(&ancestor) {
                ancestors.push((ancestor, node));
            }
        }
        ancestors
    }

    /// The nearest ancestor matching `pred`, excluding the node itself.
    pub fn get_closest(
        &self,
        path: &Path,
        pred: impl Fn(&Node) -> bool,
    ) -> Option<(Path, &Node)> {
        let mut ancestors = self.get_ancestors(path);
        ancestors.reverse();
        ancestors.into_iter().find(|(_, node)| pred(node))
    }

    pub fn get_closest_block(&self, path: &Path) -> Option<(Path, &Node)> {
        self.get_closest(path, Node::is_block)
    }

    pub fn get_closest_inline(&self, path: &Path) -> Option<(Path, &Node)> {
        self.get_closest(path, Node::is_inline)
    }

    pub fn get_closest_void(&self, path: &Path) -> Option<(Path, &Node)> {
        self.get_closest(path, Node::is_void)
    }

    /// The highest ancestor matching `pred`, excluding the node itself.
    pub fn get_furthest(
        &self,
        path: &Path,
        pred: impl Fn(&Node) -> bool,
    ) -> Option<(Path, &Node)> {
        self.get_ancestors(path)
            .into_iter()
            .find(|(_, node)| pred(node))
    }

    /// The deepest common ancestor of two paths; `None` when it is the
    /// document itself. When one path is an ancestor of the other (or
    /// they are equal), the ancestor's own parent is returned, matching
    /// the rule that ancestor searches exclude the node itself.
    pub fn get_common_ancestor(&self, a: &Path, b: &Path) -> Option<(Path, &Node)> {
        let mut shared = a.common_ancestor(b);
        if shared == *a || shared == *b {
            shared = shared.parent();
        }
        if shared.is_empty() {
            return None;
        }
        self.get_descendant(&shared).map(|n| (shared, n))
    }

    // ---------------------------------------------------------------
    // Traversal and read accessors
    // ---------------------------------------------------------------

    /// Visit every node in pre-order document order.
    pub fn walk<'a>(&'a self, mut f: impl FnMut(&Path, &'a Node)) {
        fn rec<'a>(nodes: &'a [Node], base: &Path, f: &mut impl FnMut(&Path, &'a Node)) {
            for (i, node) in nodes.iter().enumerate() {
                let path = base.child(i);
                f(&path, node);
                if let Some(children) = node.nodes() {
                    rec(children, &path, f);
                }
            }
        }
        rec(&self.nodes, &Path::root(), &mut f);
    }

    /// Every text node in document order, with its path.
    pub fn get_texts(&self) -> Vec<(Path, &Text)> {
        let mut texts = Vec::new();
        self.walk_texts(&mut texts);
        texts
    }

    fn walk_texts<'a>(&'a self, out: &mut Vec<(Path, &'a Text)>) {
        fn rec<'a>(nodes: &'a [Node], base: &Path, out: &mut Vec<(Path, &'a Text)>) {
            for (i, node) in nodes.iter().enumerate() {
                let path = base.child(i);
                match node {
                    Node::Text(t) => out.push((path, t)),
                    _ => {
                        if let Some(children) = node.nodes() {
                            rec(children, &path, out);
                        }
                    }
                }
            }
        }
        rec(&self.nodes, &Path::root(), out);
    }

    pub fn get_first_text(&self) -> Option<(Path, &Text)> {
        self.get_texts().into_iter().next()
    }

    pub fn get_last_text(&self) -> Option<(Path, &Text)> {
        self.get_texts().into_iter().last()
    }

    /// The first text strictly after `path` in document order.
    pub fn get_next_text(&self, path: &Path) -> Option<(Path, &Text)> {
        self.get_texts()
            .into_iter()
            .find(|(p, _)| p > path && !path.is_ancestor_of(p))
    }

    /// The last text strictly before `path` in document order.
    pub fn get_previous_text(&self, path: &Path) -> Option<(Path, &Text)> {
        self.get_texts()
            .into_iter()
            .filter(|(p, _)| p < path)
            .next_back()
    }

    /// Texts between two paths inclusive, in document order.
    pub fn get_texts_between(&self, start: &Path, end: &Path) -> Vec<(Path, &Text)> {
        self.get_texts()
            .into_iter()
            .filter(|(p, _)| p >= start && p <= end)
            .collect()
    }

    /// The leaf blocks of the document: blocks with no block children.
    pub fn get_blocks(&self) -> Vec<(Path, &Node)> {
        let mut blocks = Vec::new();
        self.walk(|path, node| {
            if node.is_block()
                && !node
                    .nodes()
                    .map(|ns| ns.iter().any(Node::is_block))
                    .unwrap_or(false)
            {
                blocks.push((path.clone(), node));
            }
        });
        blocks
    }

    /// Leaf blocks containing any text between the two paths inclusive.
    pub fn get_blocks_between(&self, start: &Path, end: &Path) -> Vec<(Path, &Node)> {
        self.get_blocks()
            .into_iter()
            .filter(|(p, _)| {
                let before = p < start && !p.is_ancestor_of(start);
                let after = p > end;
                !before && !after
            })
            .collect()
    }

    /// The union of marks on the text interval between two points,
    /// expressed as (path, offset) pairs. A collapsed interval yields
    /// the marks a caret there would inherit.
    pub fn get_marks_between(
        &self,
        start_path: &Path,
        start_offset: usize,
        end_path: &Path,
        end_offset: usize,
    ) -> Vec<Mark> {
        let mut marks: Vec<Mark> = Vec::new();
        if start_path == end_path && start_offset == end_offset {
            if let Some(Node::Text(t)) = self.get_descendant(start_path) {
                return t.marks_at(start_offset);
            }
            return marks;
        }

        for (path, text) in self.get_texts_between(start_path, end_path) {
            let from = if &path == start_path { start_offset } else { 0 };
            let to = if &path == end_path {
                end_offset
            } else {
                text.len()
            };
            if from >= to {
                continue;
            }
            let mut consumed = 0;
            for leaf in &text.leaves {
                let leaf_start = consumed;
                let leaf_end = consumed + leaf.len();
                consumed = leaf_end;
                if leaf_end <= from || leaf_start >= to {
                    continue;
                }
                for mark in &leaf.marks {
                    if !marks.contains(mark) {
                        marks.push(mark.clone());
                    }
                }
            }
        }
        marks
    }

    /// Marks present on every character of the interval, used to decide
    /// whether a toggle should add or remove. A collapsed interval
    /// yields the marks a caret there would inherit.
    pub fn get_active_marks_between(
        &self,
        start_path: &Path,
        start_offset: usize,
        end_path: &Path,
        end_offset: usize,
    ) -> Vec<Mark> {
        if start_path == end_path && start_offset == end_offset {
            if let Some(Node::Text(t)) = self.get_descendant(start_path) {
                return t.marks_at(start_offset);
            }
            return Vec::new();
        }

        let mut common: Option<Vec<Mark>> = None;
        for (path, text) in self.get_texts_between(start_path, end_path) {
            let from = if &path == start_path { start_offset } else { 0 };
            let to = if &path == end_path {
                end_offset
            } else {
                text.len()
            };
            if from >= to {
                continue;
            }
            let marks = text.marks_between(from, to - from);
            common = Some(match common {
                None => marks,
                Some(acc) => acc.into_iter().filter(|m| marks.contains(m)).collect(),
            });
        }
        common.unwrap_or_default()
    }

    /// The concatenated text of the whole document.
    pub fn text(&self) -> String {
        self.nodes.iter().map(|n| n.text()).collect()
    }

    pub fn text_len(&self) -> usize {
        self.nodes.iter().map(|n| n.text_len()).sum()
    }

    /// The character offset of the start of the node at `path` within
    /// the document's concatenated text.
    pub fn get_offset_of_path(&self, path: &Path) -> usize {
        self.get_texts()
            .into_iter()
            .filter(|(p, _)| p < path && !p.is_ancestor_of(path))
            .map(|(_, t)| t.len())
            .sum()
    }

    /// Run a decoration hook over every node, collecting the spans it
    /// produces. This is the consumption side of the host's
    /// `decorate(node)` interface.
    pub fn decorations(&self, decorate: &dyn Fn(&Node) -> Vec<Decoration>) -> Vec<Decoration> {
        let mut out = Vec::new();
        self.walk(|_, node| {
            out.extend(decorate(node));
        });
        out
    }

    // ---------------------------------------------------------------
    // Mutation primitives
    // ---------------------------------------------------------------

    /// Insert `node` at `path`: the final path segment is the insertion
    /// index among the parent's children. Any key in the inserted
    /// subtree that is already present in this tree is regenerated.
    pub fn insert_node(&mut self, path: &Path, mut node: Node) -> Result<(), ModelError> {
        let index = path
            .last()
            .ok_or_else(|| ModelError::InvalidStructure("cannot insert at the root".into()))?;

        let taken = self.keys();
        node.regenerate_colliding_keys(&taken);

        let children = self.assert_children_mut(&path.parent())?;
        if index > children.len() {
            return Err(ModelError::IndexOutOfBounds {
                index,
                len: children.len(),
                path: path.parent(),
            });
        }
        children.insert(index, node);
        Ok(())
    }

    /// Remove and return the node at `path`.
    pub fn remove_node(&mut self, path: &Path) -> Result<Node, ModelError> {
        let index = path
            .last()
            .ok_or_else(|| ModelError::InvalidStructure("cannot remove the root".into()))?;
        self.assert_descendant(path)?;
        let children = self.assert_children_mut(&path.parent())?;
        Ok(children.remove(index))
    }

    /// Merge the node at `path` into its left sibling. Text nodes
    /// concatenate their leaf lists; container nodes of the same kind
    /// concatenate their children.
    pub fn merge_node(&mut self, path: &Path) -> Result<(), ModelError> {
        let index = path
            .last()
            .ok_or_else(|| ModelError::InvalidStructure("cannot merge the root".into()))?;
        if index == 0 {
            return Err(ModelError::NoPreviousSibling(path.clone()));
        }
        self.assert_descendant(path)?;

        let children = self.assert_children_mut(&path.parent())?;
        let right = children.remove(index);

        let kinds_match = matches!(
            (&children[index - 1], &right),
            (Node::Text(_), Node::Text(_))
                | (Node::Block(_), Node::Block(_))
                | (Node::Inline(_), Node::Inline(_))
        );
        if !kinds_match {
            // Put the tree back the way it was before failing.
            children.insert(index, right);
            return Err(ModelError::MergeKindMismatch(path.clone()));
        }

        match (&mut children[index - 1], right) {
            (Node::Text(left), Node::Text(right)) => left.merge(right),
            (Node::Block(left), Node::Block(right)) => left.nodes.extend(right.nodes),
            (Node::Inline(left), Node::Inline(right)) => left.nodes.extend(right.nodes),
            _ => unreachable!(),
        }
        Ok(())
    }

    /// Split the node at `path` in two at `position`: a character offset
    /// for text nodes, a child index for containers. The right half gets
    /// a fresh key; `properties` (if any) are applied to it.
    pub fn split_node(
        &mut self,
        path: &Path,
        position: usize,
        properties: Option<&NodeProperties>,
    ) -> Result<(), ModelError> {
        let index = path
            .last()
            .ok_or_else(|| ModelError::InvalidStructure("cannot split the root".into()))?;
        let node = self.assert_descendant_mut(path)?;

        let right = match node {
            Node::Text(t) => Node::Text(t.split_at(position)),
            Node::Block(b) => {
                let position = position.min(b.nodes.len());
                let mut right = Block {
                    key: Key::fresh(),
                    node_type: b.node_type.clone(),
                    data: b.data.clone(),
                    is_void: b.is_void,
                    nodes: b.nodes.split_off(position),
                };
                if let Some(props) = properties {
                    let mut as_node = Node::Block(right);
                    props.apply_to(&mut as_node);
                    match as_node {
                        Node::Block(b) => right = b,
                        _ => unreachable!(),
                    }
                }
                Node::Block(right)
            }
            Node::Inline(i) => {
                let position = position.min(i.nodes.len());
                let mut right = Inline {
                    key: Key::fresh(),
                    node_type: i.node_type.clone(),
                    data: i.data.clone(),
                    is_void: i.is_void,
                    nodes: i.nodes.split_off(position),
                };
                if let Some(props) = properties {
                    let mut as_node = Node::Inline(right);
                    props.apply_to(&mut as_node);
                    match as_node {
                        Node::Inline(i) => right = i,
                        _ => unreachable!(),
                    }
                }
                Node::Inline(right)
            }
        };

        let children = self.assert_children_mut(&path.parent())?;
        children.insert(index + 1, right);
        Ok(())
    }

    /// Move the node at `path` to `new_path`. Both paths are interpreted
    /// against the tree as it is when the call is made; the destination
    /// is adjusted for the index shift the removal causes.
    pub fn move_node(&mut self, path: &Path, new_path: &Path) -> Result<(), ModelError> {
        if path == new_path {
            return Ok(());
        }
        if path.is_ancestor_of(new_path) {
            return Err(ModelError::CycleDetected);
        }
        self.assert_descendant(path)?;

        let node = self.remove_node(path)?;

        // Removing the node shifted every later sibling at its depth
        // down by one, including the destination if it sits past it.
        let depth = path.len() - 1;
        let mut destination = new_path.clone();
        if destination.len() > depth
            && path.shares_prefix(&destination, depth)
            && path.get(depth) < destination.get(depth)
        {
            let shifted = destination.get(depth).unwrap() - 1;
            destination = destination.with_index_at(depth, shifted);
        }

        self.insert_node(&destination, node)
    }

    /// Overwrite container-node properties at `path`.
    pub fn set_node_properties(
        &mut self,
        path: &Path,
        properties: &NodeProperties,
    ) -> Result<(), ModelError> {
        let node = self.assert_descendant_mut(path)?;
        properties.apply_to(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Block;

    fn paragraph(text: &str) -> Node {
        Node::Block(Block::new("paragraph", vec![Node::Text(Text::new(text))]))
    }

    fn doc(texts: &[&str]) -> Document {
        Document::from_nodes(texts.iter().map(|t| paragraph(t)).collect())
    }

    #[test]
    fn test_descendant_lookup() {
        let d = doc(&["one", "two"]);

        let text = d.get_descendant(&Path::new(vec![1, 0])).unwrap();
        assert_eq!(text.text(), "two");

        assert!(d.get_descendant(&Path::new(vec![2])).is_none());
        assert!(d.assert_descendant(&Path::new(vec![2])).is_err());
    }

    #[test]
    fn test_key_resolution_survives_sibling_shift() {
        let mut d = doc(&["one", "two"]);
        let key = d.get_descendant(&Path::new(vec![1])).unwrap().key().clone();

        d.remove_node(&Path::new(vec![0])).unwrap();

        assert_eq!(d.assert_path_by_key(&key).unwrap(), Path::new(vec![0]));
    }

    #[test]
    fn test_insert_regenerates_colliding_keys() {
        let mut d = doc(&["one"]);
        let existing = d.get_descendant(&Path::new(vec![0])).unwrap().clone();

        d.insert_node(&Path::new(vec![1]), existing.clone()).unwrap();

        let a = d.get_descendant(&Path::new(vec![0])).unwrap().key().clone();
        let b = d.get_descendant(&Path::new(vec![1])).unwrap().key().clone();
        assert_ne!(a, b);
    }

    #[test]
    fn test_merge_and_split_containers() {
        let mut d = doc(&["ab", "cd"]);
        let original = d.clone();

        d.merge_node(&Path::new(vec![1])).unwrap();
        assert_eq!(d.nodes.len(), 1);
        assert_eq!(d.text(), "abcd");

        d.split_node(&Path::new(vec![0]), 1, None).unwrap();
        assert_eq!(d, original);
    }

    #[test]
    fn test_split_text_assigns_fresh_key() {
        let mut d = doc(&["abcd"]);
        let left_key = d.get_descendant(&Path::new(vec![0, 0])).unwrap().key().clone();

        d.split_node(&Path::new(vec![0, 0]), 2, None).unwrap();

        let left = d.get_descendant(&Path::new(vec![0, 0])).unwrap();
        let right = d.get_descendant(&Path::new(vec![0, 1])).unwrap();
        assert_eq!(left.text(), "ab");
        assert_eq!(right.text(), "cd");
        assert_eq!(*left.key(), left_key);
        assert_ne!(right.key(), left.key());
    }

    #[test]
    fn test_move_node_adjusts_for_removal_shift() {
        // Moving [0] into [1] (which becomes [0] after removal).
        let mut d = doc(&["one", "two"]);
        d.move_node(&Path::new(vec![0]), &Path::new(vec![1, 0]))
            .unwrap();

        assert_eq!(d.nodes.len(), 1);
        let inner = d.get_descendant(&Path::new(vec![0, 0])).unwrap();
        assert_eq!(inner.text(), "one");
    }

    #[test]
    fn test_move_into_own_descendant_fails() {
        let mut d = doc(&["one"]);
        let err = d.move_node(&Path::new(vec![0]), &Path::new(vec![0, 1]));
        assert_eq!(err, Err(ModelError::CycleDetected));
    }

    #[test]
    fn test_closest_walks_exclude_self() {
        let d = Document::from_nodes(vec![Node::Block(Block::new(
            "quote",
            vec![paragraph("hi")],
        ))]);

        let text_path = Path::new(vec![0, 0, 0]);
        let (block_path, block) = d.get_closest_block(&text_path).unwrap();
        assert_eq!(block_path, Path::new(vec![0, 0]));
        assert_eq!(block.node_type(), Some("paragraph"));

        // The paragraph's closest block is the quote, not itself.
        let (outer_path, outer) = d.get_closest_block(&Path::new(vec![0, 0])).unwrap();
        assert_eq!(outer_path, Path::new(vec![0]));
        assert_eq!(outer.node_type(), Some("quote"));
    }

    #[test]
    fn test_text_traversal() {
        let d = doc(&["one", "two", "three"]);

        let texts = d.get_texts();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0].1.text(), "one");

        let (next_path, next) = d.get_next_text(&Path::new(vec![0, 0])).unwrap();
        assert_eq!(next_path, Path::new(vec![1, 0]));
        assert_eq!(next.text(), "two");

        let (prev_path, prev) = d.get_previous_text(&Path::new(vec![1, 0])).unwrap();
        assert_eq!(prev_path, Path::new(vec![0, 0]));
        assert_eq!(prev.text(), "one");

        assert_eq!(d.text(), "onetwothree");
        assert_eq!(d.get_offset_of_path(&Path::new(vec![2])), 6);
    }

    #[test]
    fn test_common_ancestor_excludes_self() {
        let d = Document::from_nodes(vec![Node::Block(Block::new(
            "quote",
            vec![paragraph("one"), paragraph("two")],
        ))]);

        let (path, node) = d
            .get_common_ancestor(&Path::new(vec![0, 0, 0]), &Path::new(vec![0, 1, 0]))
            .unwrap();
        assert_eq!(path, Path::new(vec![0]));
        assert_eq!(node.node_type(), Some("quote"));

        // One path inside the other resolves to the ancestor's own parent.
        assert!(d
            .get_common_ancestor(&Path::new(vec![0]), &Path::new(vec![0, 1]))
            .is_none());
    }

    #[test]
    fn test_furthest_and_blocks_between() {
        let d = Document::from_nodes(vec![
            Node::Block(Block::new(
                "quote",
                vec![paragraph("one"), paragraph("two")],
            )),
            paragraph("three"),
        ]);

        let (path, node) = d
            .get_furthest(&Path::new(vec![0, 1, 0]), Node::is_block)
            .unwrap();
        assert_eq!(path, Path::new(vec![0]));
        assert_eq!(node.node_type(), Some("quote"));

        let blocks = d.get_blocks_between(&Path::new(vec![0, 1, 0]), &Path::new(vec![1, 0]));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, Path::new(vec![0, 1]));
        assert_eq!(blocks[1].0, Path::new(vec![1]));
    }

    #[test]
    fn test_marks_between_union_and_intersection() {
        let mut left = Text::new("ab");
        left.add_mark(0, 2, &Mark::new("bold"));
        let mut right = Text::new("cd");
        right.add_mark(0, 2, &Mark::new("bold"));
        right.add_mark(0, 1, &Mark::new("italic"));
        let d = Document::from_nodes(vec![
            Node::Block(Block::new("paragraph", vec![Node::Text(left)])),
            Node::Block(Block::new("paragraph", vec![Node::Text(right)])),
        ]);

        let union = d.get_marks_between(&Path::new(vec![0, 0]), 0, &Path::new(vec![1, 0]), 2);
        assert_eq!(union.len(), 2);

        let active =
            d.get_active_marks_between(&Path::new(vec![0, 0]), 0, &Path::new(vec![1, 0]), 2);
        assert_eq!(active, vec![Mark::new("bold")]);
    }
}
