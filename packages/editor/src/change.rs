//! # Change
//!
//! The mutable façade around an immutable [`Value`].
//!
//! A change clones the value it starts from and accumulates operations
//! against its own copy, so the caller's snapshot is never touched.
//! Every edit, from a caret move to a cross-block delete, funnels
//! through [`Change::apply_operation`], which:
//!
//! 1. applies the operation to produce the next value,
//! 2. records it into history under the merge/skip policy (unless
//!    saving is suspended),
//! 3. appends it to the pending operation log.
//!
//! Composite edits are sequences of primitive operations followed by
//! the normalization fixpoint over the keys the edit dirtied. The
//! fixpoint itself repairs violations by emitting more primitive
//! operations, which keeps repairs invertible and therefore undoable.

use std::collections::HashSet;

use tracing::{debug, trace, warn};
use vellum_model::{
    Block, DataMap, Decoration, Key, Mark, Node, NodeProperties, Path, Point, Range,
    SelectionProperties, Text,
};

use crate::errors::EditorError;
use crate::operations::{self, invert_operation, Operation};
use crate::schema::{Schema, Violation};
use crate::value::{Value, ValueProperties};

pub struct Change {
    value: Value,
    operations: Vec<Operation>,
    dirty: Vec<Key>,
    normalize_enabled: bool,
    save_enabled: bool,
    merge_flag: Option<bool>,
    skip_flag: Option<bool>,
}

impl Change {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            operations: Vec::new(),
            dirty: Vec::new(),
            normalize_enabled: true,
            save_enabled: true,
            merge_flag: None,
            skip_flag: None,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// The operations applied by this change so far.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Force or forbid history merging for subsequent operations.
    pub fn set_merge_flag(&mut self, merge: Option<bool>) {
        self.merge_flag = merge;
    }

    /// Force or forbid history recording for subsequent operations.
    pub fn set_skip_flag(&mut self, skip: Option<bool>) {
        self.skip_flag = skip;
    }

    // ---------------------------------------------------------------
    // Scopes
    // ---------------------------------------------------------------

    /// Run `f` without recording anything into history.
    pub fn without_saving<F>(&mut self, f: F) -> Result<(), EditorError>
    where
        F: FnOnce(&mut Self) -> Result<(), EditorError>,
    {
        let saved = self.save_enabled;
        self.save_enabled = false;
        let result = f(self);
        self.save_enabled = saved;
        result
    }

    /// Defer the normalization fixpoint until `f` finishes, then run it
    /// once over everything `f` dirtied. Use this to batch primitive
    /// operations without paying normalization after every micro-step.
    pub fn without_normalizing<F>(&mut self, f: F) -> Result<(), EditorError>
    where
        F: FnOnce(&mut Self) -> Result<(), EditorError>,
    {
        let enabled = self.normalize_enabled;
        self.normalize_enabled = false;
        let result = f(self);
        self.normalize_enabled = enabled;
        result?;
        self.maybe_normalize()
    }

    // ---------------------------------------------------------------
    // The operation pipeline
    // ---------------------------------------------------------------

    /// Apply one operation: mutate the value, save to history, append
    /// to the pending log.
    pub fn apply_operation(&mut self, operation: Operation) -> Result<(), EditorError> {
        let mut dirty = dirty_keys_before(&self.value, &operation);

        operations::apply_operation(&mut self.value, &operation)?;

        dirty.extend(dirty_keys_after(&self.value, &operation));

        if self.save_enabled {
            // Later operations of one change merge into its first batch.
            let merge = self
                .merge_flag
                .or_else(|| (!self.operations.is_empty()).then_some(true));
            self.value.history.save(operation.clone(), merge, self.skip_flag);
        }

        self.dirty.extend(dirty);
        self.operations.push(operation);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Primitive edits (capture state, build one operation)
    // ---------------------------------------------------------------

    pub fn insert_node_at(&mut self, path: Path, node: Node) -> Result<(), EditorError> {
        self.apply_operation(Operation::InsertNode { path, node })
    }

    pub fn remove_node_at(&mut self, path: Path) -> Result<(), EditorError> {
        let node = self.value.document.assert_descendant(&path)?.clone();
        self.apply_operation(Operation::RemoveNode { path, node })
    }

    pub fn remove_node_by_key(&mut self, key: &Key) -> Result<(), EditorError> {
        let path = self.value.document.assert_path_by_key(key)?;
        self.remove_node_at(path)
    }

    pub fn move_node_by_key(&mut self, key: &Key, new_path: Path) -> Result<(), EditorError> {
        let path = self.value.document.assert_path_by_key(key)?;
        self.apply_operation(Operation::MoveNode { path, new_path })
    }

    pub fn merge_node_at(&mut self, path: Path) -> Result<(), EditorError> {
        let node = self.value.document.assert_descendant(&path)?;
        let properties = NodeProperties {
            node_type: node.node_type().map(str::to_string),
            data: node.data().cloned(),
            is_void: None,
        };
        let left = self.value.document.assert_descendant(&path.decremented())?;
        let position = match left {
            Node::Text(t) => t.len(),
            other => other.nodes().map(|n| n.len()).unwrap_or(0),
        };
        self.apply_operation(Operation::MergeNode {
            path,
            position,
            properties,
        })
    }

    pub fn merge_node_by_key(&mut self, key: &Key) -> Result<(), EditorError> {
        let path = self.value.document.assert_path_by_key(key)?;
        self.merge_node_at(path)
    }

    pub fn split_node_at(&mut self, path: Path, position: usize) -> Result<(), EditorError> {
        self.apply_operation(Operation::SplitNode {
            path,
            position,
            properties: NodeProperties::default(),
        })
    }

    pub fn split_node_by_key(&mut self, key: &Key, position: usize) -> Result<(), EditorError> {
        let path = self.value.document.assert_path_by_key(key)?;
        self.split_node_at(path, position)
    }

    pub fn set_node_by_key(
        &mut self,
        key: &Key,
        properties: NodeProperties,
    ) -> Result<(), EditorError> {
        // The document root holds data of its own; everything else is a
        // regular descendant.
        if *key == self.value.document.key {
            let previous = NodeProperties {
                node_type: None,
                data: properties.data.as_ref().map(|_| self.value.document.data.clone()),
                is_void: None,
            };
            return self.apply_operation(Operation::SetNode {
                path: Path::root(),
                properties,
                previous,
            });
        }
        let path = self.value.document.assert_path_by_key(key)?;
        let node = self.value.document.assert_descendant(&path)?;
        let previous = properties.captured_from(node);
        self.apply_operation(Operation::SetNode {
            path,
            properties,
            previous,
        })
    }

    pub fn insert_text_by_key(
        &mut self,
        key: &Key,
        offset: usize,
        text: &str,
        marks: Option<Vec<Mark>>,
    ) -> Result<(), EditorError> {
        let path = self.value.document.assert_path_by_key(key)?;
        self.apply_operation(Operation::InsertText {
            path,
            offset,
            text: text.to_string(),
            marks,
        })
    }

    /// Remove `[offset, offset + length)` from a text node. One
    /// operation is emitted per leaf run covered (last first, so
    /// earlier offsets stay valid), each carrying its leaf's marks, so
    /// the inverse insertions restore the exact styled content.
    pub fn remove_text_by_key(
        &mut self,
        key: &Key,
        offset: usize,
        length: usize,
    ) -> Result<(), EditorError> {
        let path = self.value.document.assert_path_by_key(key)?;
        let node = self.value.document.assert_descendant(&path)?;
        let text = node
            .as_text()
            .ok_or_else(|| EditorError::NotText(path.clone()))?;

        let chunks = leaf_chunks(text, offset, length);
        for (chunk_offset, chunk_text, chunk_marks) in chunks.into_iter().rev() {
            self.apply_operation(Operation::RemoveText {
                path: path.clone(),
                offset: chunk_offset,
                text: chunk_text,
                marks: Some(chunk_marks),
            })?;
        }
        Ok(())
    }

    pub fn add_mark_by_key(
        &mut self,
        key: &Key,
        offset: usize,
        length: usize,
        mark: Mark,
    ) -> Result<(), EditorError> {
        if length == 0 {
            return Ok(());
        }
        let path = self.value.document.assert_path_by_key(key)?;
        self.apply_operation(Operation::AddMark {
            path,
            offset,
            length,
            mark,
        })
    }

    pub fn remove_mark_by_key(
        &mut self,
        key: &Key,
        offset: usize,
        length: usize,
        mark: Mark,
    ) -> Result<(), EditorError> {
        if length == 0 {
            return Ok(());
        }
        let path = self.value.document.assert_path_by_key(key)?;
        self.apply_operation(Operation::RemoveMark {
            path,
            offset,
            length,
            mark,
        })
    }

    pub fn set_mark_by_key(
        &mut self,
        key: &Key,
        offset: usize,
        length: usize,
        mark: Mark,
        properties: vellum_model::MarkProperties,
    ) -> Result<(), EditorError> {
        let path = self.value.document.assert_path_by_key(key)?;
        self.apply_operation(Operation::SetMark {
            path,
            offset,
            length,
            mark,
            properties,
        })
    }

    // ---------------------------------------------------------------
    // Selection commands
    // ---------------------------------------------------------------

    pub fn select(&mut self, properties: SelectionProperties) -> Result<(), EditorError> {
        let previous = properties.captured_from(&self.value.selection);
        self.apply_operation(Operation::SetSelection {
            properties,
            previous,
        })
    }

    pub fn select_range(&mut self, range: Range) -> Result<(), EditorError> {
        self.select(SelectionProperties::from(range))
    }

    pub fn collapse_to_start(&mut self) -> Result<(), EditorError> {
        let selection = self.value.selection.normalized(&self.value.document);
        self.select_range(Range::collapsed(selection.start().clone()))
    }

    pub fn collapse_to_end(&mut self) -> Result<(), EditorError> {
        let selection = self.value.selection.normalized(&self.value.document);
        self.select_range(Range::collapsed(selection.end().clone()))
    }

    pub fn move_anchor_to(&mut self, point: Point) -> Result<(), EditorError> {
        self.select(SelectionProperties {
            anchor: Some(point),
            ..Default::default()
        })
    }

    pub fn move_focus_to(&mut self, point: Point) -> Result<(), EditorError> {
        self.select(SelectionProperties {
            focus: Some(point),
            ..Default::default()
        })
    }

    pub fn focus(&mut self) -> Result<(), EditorError> {
        self.select(SelectionProperties {
            is_focused: Some(true),
            ..Default::default()
        })
    }

    pub fn blur(&mut self) -> Result<(), EditorError> {
        self.select(SelectionProperties {
            is_focused: Some(false),
            ..Default::default()
        })
    }

    // ---------------------------------------------------------------
    // Value-level commands
    // ---------------------------------------------------------------

    pub fn set_data(&mut self, data: DataMap) -> Result<(), EditorError> {
        let properties = ValueProperties {
            data: Some(data),
            decorations: None,
        };
        let previous = properties.captured_from(&self.value);
        self.apply_operation(Operation::SetValue {
            properties,
            previous,
        })
    }

    pub fn set_decorations(&mut self, decorations: Vec<Decoration>) -> Result<(), EditorError> {
        let properties = ValueProperties {
            data: None,
            decorations: Some(decorations),
        };
        let previous = properties.captured_from(&self.value);
        self.apply_operation(Operation::SetValue {
            properties,
            previous,
        })
    }

    // ---------------------------------------------------------------
    // Composite edits
    // ---------------------------------------------------------------

    /// Insert text at the selection, replacing it when expanded. Marks
    /// are inherited from the insertion point.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        if !self.value.selection.is_collapsed() {
            self.delete()?;
        }
        let selection = self.value.selection.normalized(&self.value.document);
        let point = selection.start().clone();
        let key = point.key.clone().ok_or(EditorError::SelectionUnset)?;
        self.insert_text_by_key(&key, point.offset, text, None)?;
        self.maybe_normalize()
    }

    /// Insert text at an arbitrary point.
    pub fn insert_text_at_point(
        &mut self,
        point: &Point,
        text: &str,
        marks: Option<Vec<Mark>>,
    ) -> Result<(), EditorError> {
        let point = point.normalized(&self.value.document);
        let key = point.key.clone().ok_or(EditorError::SelectionUnset)?;
        self.insert_text_by_key(&key, point.offset, text, marks)?;
        self.maybe_normalize()
    }

    /// Delete the current selection.
    pub fn delete(&mut self) -> Result<(), EditorError> {
        let range = self.value.selection.as_range();
        self.delete_at_range(&range)
    }

    /// Delete everything inside `range`, merging the boundary blocks
    /// when the range spans more than one.
    pub fn delete_at_range(&mut self, range: &Range) -> Result<(), EditorError> {
        let range = range.normalized(&self.value.document);
        if !range.is_set() {
            return Err(EditorError::SelectionUnset);
        }
        if range.is_collapsed() {
            return Ok(());
        }

        let start = range.start().clone();
        let end = range.end().clone();
        let start_key = start.key.clone().ok_or(EditorError::SelectionUnset)?;
        let end_key = end.key.clone().ok_or(EditorError::SelectionUnset)?;

        if start_key == end_key {
            self.remove_text_by_key(&start_key, start.offset, end.offset - start.offset)?;
            self.select_collapsed_at(&start_key, start.offset)?;
            return self.maybe_normalize();
        }

        // Gather everything up front; the keys survive the edits below
        // even though the paths will not.
        let document = &self.value.document;
        let start_path = document.assert_path_by_key(&start_key)?;
        let end_path = document.assert_path_by_key(&end_key)?;
        let start_text_len = document
            .assert_descendant(&start_path)?
            .as_text()
            .map(|t| t.len())
            .unwrap_or(0);

        let (start_block_path, start_block) = document
            .get_closest_block(&start_path)
            .ok_or_else(|| EditorError::NotText(start_path.clone()))?;
        let (end_block_path, end_block) = document
            .get_closest_block(&end_path)
            .ok_or_else(|| EditorError::NotText(end_path.clone()))?;
        let start_block_key = start_block.key().clone();
        let end_block_key = end_block.key().clone();

        let mut doomed: Vec<Key> = Vec::new();
        let start_child_index = start_path.get(start_block_path.len()).unwrap_or(0);
        let end_child_index = end_path.get(end_block_path.len()).unwrap_or(0);

        if start_block_path == end_block_path {
            let children = document.get_children(&start_block_path).unwrap_or(&document.nodes);
            for i in (start_child_index + 1)..end_child_index {
                doomed.push(children[i].key().clone());
            }
        } else {
            // Whole subtrees strictly between the two branches.
            let common = start_block_path.common_ancestor(&end_block_path);
            let depth = common.len();
            let branch_start = start_block_path.get(depth).unwrap_or(0);
            let branch_end = end_block_path.get(depth).unwrap_or(0);
            if let Some(children) = document.get_children(&common) {
                for i in (branch_start + 1)..branch_end {
                    doomed.push(children[i].key().clone());
                }
            }
            // Right siblings along the start branch below the fork.
            for d in (depth + 1)..start_block_path.len() {
                let prefix = Path::new(start_block_path.indices()[..d].to_vec());
                let index = start_block_path.get(d).unwrap_or(0);
                if let Some(children) = document.get_children(&prefix) {
                    for i in (index + 1)..children.len() {
                        doomed.push(children[i].key().clone());
                    }
                }
            }
            // Left siblings along the end branch below the fork.
            for d in (depth + 1)..end_block_path.len() {
                let prefix = Path::new(end_block_path.indices()[..d].to_vec());
                let index = end_block_path.get(d).unwrap_or(0);
                if let Some(children) = document.get_children(&prefix) {
                    for i in 0..index {
                        doomed.push(children[i].key().clone());
                    }
                }
            }
            // Inside the boundary blocks themselves.
            if let Some(children) = document.get_children(&start_block_path) {
                for i in (start_child_index + 1)..children.len() {
                    doomed.push(children[i].key().clone());
                }
            }
            if let Some(children) = document.get_children(&end_block_path) {
                for i in 0..end_child_index {
                    doomed.push(children[i].key().clone());
                }
            }
        }

        // Trim the boundary texts.
        self.remove_text_by_key(&start_key, start.offset, start_text_len - start.offset)?;
        self.remove_text_by_key(&end_key, 0, end.offset)?;

        for key in &doomed {
            // A doomed ancestor may have taken its descendants with it.
            if self.value.document.has_node(key) {
                self.remove_node_by_key(key)?;
            }
        }

        // Stitch the boundary blocks together.
        if start_block_key != end_block_key && self.value.document.has_node(&end_block_key) {
            let start_block_path = self.value.document.assert_path_by_key(&start_block_key)?;
            self.move_node_by_key(&end_block_key, start_block_path.incremented())?;
            let merge_path = self.value.document.assert_path_by_key(&end_block_key)?;
            self.merge_node_at(merge_path)?;
        }

        self.select_collapsed_at(&start_key, start.offset)?;
        self.maybe_normalize()
    }

    /// Split the blocks at a point: the text splits at the offset, then
    /// every ancestor up to the closest block splits at the boundary.
    pub fn split_block_at_point(&mut self, point: &Point) -> Result<(), EditorError> {
        let point = point.normalized(&self.value.document);
        let text_key = point.key.clone().ok_or(EditorError::SelectionUnset)?;

        let document = &self.value.document;
        let text_path = document.assert_path_by_key(&text_key)?;
        let (_, block) = document
            .get_closest_block(&text_path)
            .ok_or_else(|| EditorError::NotText(text_path.clone()))?;
        let block_key = block.key().clone();

        self.split_node_by_key(&text_key, point.offset)?;

        let mut child_key = text_key;
        loop {
            let child_path = self.value.document.assert_path_by_key(&child_key)?;
            let parent_path = child_path.parent();
            if parent_path.is_empty() {
                break;
            }
            let parent_key = self
                .value
                .document
                .assert_descendant(&parent_path)?
                .key()
                .clone();
            self.split_node_at(parent_path, child_path.last().unwrap_or(0) + 1)?;
            if parent_key == block_key {
                break;
            }
            child_key = parent_key;
        }

        self.maybe_normalize()
    }

    /// Split the block at the collapsed selection (the Enter key).
    pub fn split_block(&mut self) -> Result<(), EditorError> {
        if !self.value.selection.is_collapsed() {
            return Err(EditorError::RangeNotCollapsed);
        }
        let point = self.value.selection.start().clone();
        self.split_block_at_point(&point)
    }

    /// Insert a fragment of nodes at a collapsed point. Block fragments
    /// split the surrounding block and land between the halves; inline
    /// and text fragments split the text and land inside it.
    pub fn insert_fragment_at_point(
        &mut self,
        point: &Point,
        nodes: Vec<Node>,
    ) -> Result<(), EditorError> {
        if nodes.is_empty() {
            return Ok(());
        }
        let point = point.normalized(&self.value.document);
        let text_key = point.key.clone().ok_or(EditorError::SelectionUnset)?;

        if nodes.iter().all(Node::is_block) {
            let text_path = self.value.document.assert_path_by_key(&text_key)?;
            let (_, block) = self
                .value
                .document
                .get_closest_block(&text_path)
                .ok_or_else(|| EditorError::NotText(text_path.clone()))?;
            let block_key = block.key().clone();

            self.without_normalizing(|change| {
                change.split_block_at_point(&point)?;
                let block_path = change.value.document.assert_path_by_key(&block_key)?;
                for (i, node) in nodes.into_iter().enumerate() {
                    change.insert_node_at(block_path.with_last(block_path.last().unwrap_or(0) + 1 + i), node)?;
                }
                Ok(())
            })
        } else {
            self.without_normalizing(|change| {
                change.split_node_by_key(&text_key, point.offset)?;
                let text_path = change.value.document.assert_path_by_key(&text_key)?;
                for (i, node) in nodes.into_iter().enumerate() {
                    change.insert_node_at(
                        text_path.with_last(text_path.last().unwrap_or(0) + 1 + i),
                        node,
                    )?;
                }
                Ok(())
            })
        }
    }

    /// Insert a single block at a collapsed point.
    pub fn insert_block_at_point(
        &mut self,
        point: &Point,
        block: Block,
    ) -> Result<(), EditorError> {
        self.insert_fragment_at_point(point, vec![Node::Block(block)])
    }

    pub fn add_mark_at_range(&mut self, range: &Range, mark: Mark) -> Result<(), EditorError> {
        self.mark_range(range, |change, key, offset, length| {
            change.add_mark_by_key(key, offset, length, mark.clone())
        })
    }

    pub fn remove_mark_at_range(&mut self, range: &Range, mark: Mark) -> Result<(), EditorError> {
        self.mark_range(range, |change, key, offset, length| {
            change.remove_mark_by_key(key, offset, length, mark.clone())
        })
    }

    /// Add `mark` when the whole range lacks it, remove it otherwise.
    pub fn toggle_mark_at_range(&mut self, range: &Range, mark: Mark) -> Result<(), EditorError> {
        let normalized = range.normalized(&self.value.document);
        let (start, end) = (normalized.start(), normalized.end());
        let active = match (&start.path, &end.path) {
            (Some(start_path), Some(end_path)) => self.value.document.get_active_marks_between(
                start_path,
                start.offset,
                end_path,
                end.offset,
            ),
            _ => Vec::new(),
        };

        if active.contains(&mark) {
            self.remove_mark_at_range(range, mark)
        } else {
            self.add_mark_at_range(range, mark)
        }
    }

    fn mark_range<F>(&mut self, range: &Range, mut op: F) -> Result<(), EditorError>
    where
        F: FnMut(&mut Self, &Key, usize, usize) -> Result<(), EditorError>,
    {
        let range = range.normalized(&self.value.document);
        if range.is_collapsed() || !range.is_set() {
            return Ok(());
        }
        let start = range.start().clone();
        let end = range.end().clone();

        let spans: Vec<(Key, usize, usize)> = match (&start.path, &end.path) {
            (Some(start_path), Some(end_path)) => self
                .value
                .document
                .get_texts_between(start_path, end_path)
                .into_iter()
                .map(|(path, text)| {
                    let from = if &path == start_path { start.offset } else { 0 };
                    let to = if &path == end_path { end.offset } else { text.len() };
                    (text.key.clone(), from, to)
                })
                .filter(|(_, from, to)| from < to)
                .collect(),
            _ => Vec::new(),
        };

        for (key, from, to) in spans {
            op(self, &key, from, to - from)?;
        }
        self.maybe_normalize()
    }

    /// Wrap the blocks covered by `range` in a new block of `node_type`.
    pub fn wrap_block_at_range(
        &mut self,
        range: &Range,
        node_type: &str,
    ) -> Result<(), EditorError> {
        let range = range.normalized(&self.value.document);
        let start = range.start().clone();
        let end = range.end().clone();
        let start_path = start
            .path
            .clone()
            .ok_or(EditorError::SelectionUnset)?;
        let end_path = end.path.clone().ok_or(EditorError::SelectionUnset)?;

        let document = &self.value.document;
        let (start_block_path, _) = document
            .get_closest_block(&start_path)
            .ok_or_else(|| EditorError::NotText(start_path.clone()))?;
        let (end_block_path, _) = document
            .get_closest_block(&end_path)
            .ok_or_else(|| EditorError::NotText(end_path.clone()))?;

        // The siblings to wrap live under the fork of the two branches.
        let common = if start_block_path == end_block_path {
            start_block_path.parent()
        } else {
            start_block_path.common_ancestor(&end_block_path)
        };
        let depth = common.len();
        let from = start_block_path.get(depth).unwrap_or(0);
        let to = end_block_path.get(depth).unwrap_or(0);

        let covered: Vec<Key> = match document.get_children(&common) {
            Some(children) => (from..=to.min(children.len().saturating_sub(1)))
                .map(|i| children[i].key().clone())
                .collect(),
            None => return Ok(()),
        };

        self.without_normalizing(|change| {
            let wrapper = Block::new(node_type, vec![]);
            let wrapper_key = wrapper.key.clone();
            change.insert_node_at(common.child(from), Node::Block(wrapper))?;

            let wrapper_path = change.value.document.assert_path_by_key(&wrapper_key)?;
            for (i, key) in covered.iter().enumerate() {
                change.move_node_by_key(key, wrapper_path.child(i))?;
            }
            Ok(())
        })
    }

    /// Unwrap the contents of the closest ancestor block of `node_type`
    /// around the start of `range`, removing the wrapper.
    pub fn unwrap_block_at_range(
        &mut self,
        range: &Range,
        node_type: &str,
    ) -> Result<(), EditorError> {
        let range = range.normalized(&self.value.document);
        let start_path = match &range.start().path {
            Some(path) => path.clone(),
            None => return Ok(()),
        };

        let document = &self.value.document;
        let wrapper = document.get_closest(&start_path, |n| {
            n.is_block() && n.node_type() == Some(node_type)
        });
        let Some((wrapper_path, wrapper_node)) = wrapper else {
            return Ok(());
        };
        let wrapper_key = wrapper_node.key().clone();
        let child_keys: Vec<Key> = wrapper_node
            .nodes()
            .map(|children| children.iter().map(|c| c.key().clone()).collect())
            .unwrap_or_default();
        let wrapper_index = wrapper_path.last().unwrap_or(0);
        let parent_path = wrapper_path.parent();

        self.without_normalizing(|change| {
            for (i, key) in child_keys.iter().enumerate() {
                change.move_node_by_key(key, parent_path.child(wrapper_index + 1 + i))?;
            }
            change.remove_node_by_key(&wrapper_key)?;
            Ok(())
        })
    }

    // ---------------------------------------------------------------
    // Undo / redo
    // ---------------------------------------------------------------

    /// Replay the most recent history batch backwards.
    pub fn undo(&mut self) -> Result<(), EditorError> {
        let Some(batch) = self.value.history.pop_undo() else {
            return Ok(());
        };
        debug!(operations = batch.len(), "undoing batch");

        self.without_saving(|change| {
            for operation in batch.iter().rev() {
                let inverse = strip_focus(invert_operation(operation));
                change.apply_operation(inverse)?;
            }
            Ok(())
        })?;

        self.value.history.push_redo(batch);
        Ok(())
    }

    /// Replay the most recently undone batch forwards.
    pub fn redo(&mut self) -> Result<(), EditorError> {
        let Some(batch) = self.value.history.pop_redo() else {
            return Ok(());
        };
        debug!(operations = batch.len(), "redoing batch");

        self.without_saving(|change| {
            for operation in batch.iter() {
                change.apply_operation(strip_focus(operation.clone()))?;
            }
            Ok(())
        })?;

        self.value.history.push_undo(batch);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Normalization fixpoint
    // ---------------------------------------------------------------

    /// Run the fixpoint over the whole document.
    pub fn normalize(&mut self) -> Result<(), EditorError> {
        let root = self.value.document.key.clone();
        self.normalize_key_deep(&root)
    }

    fn maybe_normalize(&mut self) -> Result<(), EditorError> {
        if self.normalize_enabled {
            self.normalize_dirty()
        } else {
            Ok(())
        }
    }

    /// Normalize every key dirtied since the last pass, bottom-up, then
    /// re-validate each node's ancestors: child repairs can invalidate a
    /// parent's own constraints.
    pub fn normalize_dirty(&mut self) -> Result<(), EditorError> {
        let dirty = std::mem::take(&mut self.dirty);
        let mut seen = HashSet::new();
        for key in dirty {
            if !seen.insert(key.clone()) {
                continue;
            }
            self.normalize_key_with_ancestors(&key)?;
        }
        Ok(())
    }

    fn normalize_key_with_ancestors(&mut self, key: &Key) -> Result<(), EditorError> {
        let Some(path) = self.path_of(key) else {
            return Ok(());
        };
        let mut ancestor_keys: Vec<Key> = self
            .value
            .document
            .get_ancestors(&path)
            .into_iter()
            .map(|(_, node)| node.key().clone())
            .collect();
        ancestor_keys.reverse(); // nearest first
        ancestor_keys.push(self.value.document.key.clone());

        self.normalize_key_deep(key)?;
        for ancestor in ancestor_keys {
            self.normalize_key_shallow(&ancestor)?;
        }
        Ok(())
    }

    /// Depth-first: normalize every descendant before the node itself.
    fn normalize_key_deep(&mut self, key: &Key) -> Result<(), EditorError> {
        for child in self.children_of(key) {
            self.normalize_key_deep(&child)?;
        }
        self.normalize_key_shallow(key)
    }

    /// Validate-and-repair one node until it is valid, re-resolving it
    /// by key after every repair. The loop is capped at the rule count
    /// plus one; exceeding the cap means a rule's repair does not fix
    /// what its validation rejects.
    fn normalize_key_shallow(&mut self, key: &Key) -> Result<(), EditorError> {
        let schema = self.value.schema.clone();
        let cap = schema.rule_count() + 1;
        let mut iterations = 0;

        loop {
            let Some(path) = self.path_of(key) else {
                return Ok(());
            };
            let Some(violation) = schema.validate(&self.value.document, &path) else {
                return Ok(());
            };

            iterations += 1;
            if iterations > cap {
                warn!(?violation, "schema repair did not converge");
                return Err(EditorError::SchemaBroken(format!("{:?}", violation)));
            }

            trace!(?violation, "repairing violation");
            self.repair(&schema, &violation)?;
        }
    }

    /// Apply the default repair for a violation, unless the governing
    /// rule declares a custom normalizer that handles it.
    fn repair(&mut self, schema: &Schema, violation: &Violation) -> Result<(), EditorError> {
        let node_key = violation.node_key().clone();
        if let Some(path) = self.path_of(&node_key) {
            if let Some(rule) = schema.rule_for(&self.value.document, &path) {
                if let Some(normalizer) = rule.normalize.clone() {
                    if normalizer(self, violation) {
                        return Ok(());
                    }
                }
            }
        }

        let root_key = self.value.document.key.clone();
        match violation {
            Violation::ChildKindInvalid { node, child, .. }
            | Violation::ChildTypeInvalid { node, child, .. }
            | Violation::ChildUnknown { node, child, .. } => {
                let only_text_child = self
                    .value
                    .document
                    .get_node_by_key(child)
                    .map(Node::is_text)
                    .unwrap_or(false)
                    && self
                        .path_of(node)
                        .and_then(|p| self.value.document.get_children(&p).map(|c| c.len()))
                        .unwrap_or(0)
                        == 1;
                if only_text_child && *node != root_key {
                    self.remove_node_by_key(node)
                } else {
                    self.remove_node_by_key(child)
                }
            }

            Violation::ChildRequired { node, .. }
            | Violation::NodeTextInvalid { node }
            | Violation::ParentKindInvalid { node, .. }
            | Violation::ParentTypeInvalid { node, .. } => {
                if *node == root_key {
                    let keys: Vec<Key> =
                        self.value.document.nodes.iter().map(|n| n.key().clone()).collect();
                    for key in keys {
                        self.remove_node_by_key(&key)?;
                    }
                    Ok(())
                } else {
                    self.remove_node_by_key(node)
                }
            }

            Violation::NodeChildless { node } => {
                if let Some(path) = self.path_of(node) {
                    self.insert_node_at(path.child(0), Node::Text(Text::empty()))?;
                }
                Ok(())
            }

            Violation::InlineChildEmpty { child, .. } => self.remove_node_by_key(child),

            Violation::VoidUnflanked { node, index, before } => {
                if let Some(path) = self.path_of(node) {
                    let at = if *before { *index } else { index + 1 };
                    self.insert_node_at(path.child(at), Node::Text(Text::empty()))?;
                }
                Ok(())
            }

            Violation::AdjacentTexts { node, index } => {
                if let Some(path) = self.path_of(node) {
                    self.merge_node_at(path.child(*index))?;
                }
                Ok(())
            }

            Violation::TextRedundant { child, .. } => self.remove_node_by_key(child),

            Violation::NodeDataInvalid { node, key } => {
                let entry_present = if *node == root_key {
                    self.value.document.data.get(key).is_some()
                } else {
                    self.value
                        .document
                        .get_node_by_key(node)
                        .and_then(|n| n.data())
                        .and_then(|d| d.get(key))
                        .is_some()
                };
                if entry_present {
                    let mut data = if *node == root_key {
                        self.value.document.data.clone()
                    } else {
                        self.value
                            .document
                            .get_node_by_key(node)
                            .and_then(|n| n.data())
                            .cloned()
                            .unwrap_or_default()
                    };
                    data.remove(key);
                    self.set_node_by_key(
                        node,
                        NodeProperties {
                            data: Some(data),
                            ..Default::default()
                        },
                    )
                } else if *node != root_key {
                    self.remove_node_by_key(node)
                } else {
                    // Nothing sensible to repair: the convergence cap
                    // will flag the rule as broken.
                    Ok(())
                }
            }

            Violation::NodeIsVoidInvalid { node, expected } => self.set_node_by_key(
                node,
                NodeProperties {
                    is_void: Some(*expected),
                    ..Default::default()
                },
            ),

            Violation::NodeMarkInvalid { node, mark } => {
                let texts: Vec<(Key, usize)> = match self.path_of(node) {
                    Some(path) if path.is_empty() => self
                        .value
                        .document
                        .get_texts()
                        .into_iter()
                        .map(|(_, t)| (t.key.clone(), t.len()))
                        .collect(),
                    Some(path) => {
                        let mut texts = Vec::new();
                        if let Some(node) = self.value.document.get_descendant(&path) {
                            collect_texts(node, &mut texts);
                        }
                        texts
                    }
                    None => Vec::new(),
                };
                for (key, len) in texts {
                    self.remove_mark_by_key(&key, 0, len, mark.clone())?;
                }
                Ok(())
            }

            Violation::FirstChildKindInvalid { child, .. }
            | Violation::FirstChildTypeInvalid { child, .. }
            | Violation::LastChildKindInvalid { child, .. }
            | Violation::LastChildTypeInvalid { child, .. } => self.remove_node_by_key(child),
        }
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    fn select_collapsed_at(&mut self, key: &Key, offset: usize) -> Result<(), EditorError> {
        self.select_range(Range::collapsed(Point::at_key(key.clone(), offset)))
    }

    /// Resolve a key to a path; the document's own key resolves to the
    /// root path.
    fn path_of(&self, key: &Key) -> Option<Path> {
        if *key == self.value.document.key {
            Some(Path::root())
        } else {
            self.value.document.get_path_by_key(key)
        }
    }

    fn children_of(&self, key: &Key) -> Vec<Key> {
        let children = if *key == self.value.document.key {
            Some(&self.value.document.nodes)
        } else {
            self.value
                .document
                .get_node_by_key(key)
                .and_then(Node::nodes)
        };
        children
            .map(|nodes| nodes.iter().map(|n| n.key().clone()).collect())
            .unwrap_or_default()
    }
}

fn strip_focus(operation: Operation) -> Operation {
    match operation {
        Operation::SetSelection {
            properties,
            previous,
        } => Operation::SetSelection {
            properties: properties.without_focus(),
            previous,
        },
        other => other,
    }
}

fn collect_texts(node: &Node, out: &mut Vec<(Key, usize)>) {
    match node {
        Node::Text(t) => out.push((t.key.clone(), t.len())),
        _ => {
            if let Some(children) = node.nodes() {
                for child in children {
                    collect_texts(child, out);
                }
            }
        }
    }
}

/// Split `[offset, offset + length)` of a text node into per-leaf
/// chunks of `(offset, text, marks)`.
fn leaf_chunks(text: &Text, offset: usize, length: usize) -> Vec<(usize, String, Vec<Mark>)> {
    let start = text.clamp(offset);
    let end = text.clamp(offset + length);
    let mut chunks = Vec::new();
    let mut consumed = 0;

    for leaf in &text.leaves {
        let leaf_start = consumed;
        let leaf_end = consumed + leaf.len();
        consumed = leaf_end;
        if leaf_end <= start || leaf_start >= end {
            continue;
        }
        let from = start.max(leaf_start);
        let to = end.min(leaf_end);
        let chunk: String = leaf
            .text
            .chars()
            .skip(from - leaf_start)
            .take(to - from)
            .collect();
        chunks.push((from, chunk, leaf.marks.clone()));
    }
    chunks
}

/// Keys whose nodes need re-validation, resolved before the operation
/// runs (the old parents of moves and removals).
fn dirty_keys_before(value: &Value, operation: &Operation) -> Vec<Key> {
    fn holder_key(value: &Value, path: &Path) -> Option<Key> {
        let parent = path.parent();
        if parent.is_empty() {
            Some(value.document.key.clone())
        } else {
            value.document.get_descendant(&parent).map(|n| n.key().clone())
        }
    }
    fn node_key(value: &Value, path: &Path) -> Option<Key> {
        value.document.get_descendant(path).map(|n| n.key().clone())
    }

    match operation {
        Operation::InsertNode { path, .. } => holder_key(value, path).into_iter().collect(),
        Operation::RemoveNode { path, .. }
        | Operation::MergeNode { path, .. }
        | Operation::SplitNode { path, .. }
        | Operation::SetNode { path, .. }
        | Operation::InsertText { path, .. }
        | Operation::RemoveText { path, .. }
        | Operation::AddMark { path, .. }
        | Operation::RemoveMark { path, .. }
        | Operation::SetMark { path, .. } => holder_key(value, path)
            .into_iter()
            .chain(node_key(value, path))
            .collect(),
        Operation::MoveNode { path, new_path } => holder_key(value, path)
            .into_iter()
            .chain(holder_key(value, new_path))
            .chain(node_key(value, path))
            .collect(),
        Operation::SetSelection { .. } | Operation::SetValue { .. } => Vec::new(),
    }
}

/// Keys that exist only after the operation ran (inserted nodes, the
/// fresh half of a split).
fn dirty_keys_after(value: &Value, operation: &Operation) -> Vec<Key> {
    fn node_key(value: &Value, path: &Path) -> Option<Key> {
        value.document.get_descendant(path).map(|n| n.key().clone())
    }

    match operation {
        Operation::InsertNode { path, .. } => node_key(value, path).into_iter().collect(),
        Operation::SplitNode { path, .. } => node_key(value, path)
            .into_iter()
            .chain(node_key(value, &path.incremented()))
            .collect(),
        Operation::MergeNode { path, .. } => {
            node_key(value, &path.decremented()).into_iter().collect()
        }
        _ => Vec::new(),
    }
}
