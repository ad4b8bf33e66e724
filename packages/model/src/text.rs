use crate::key::Key;
use crate::mark::{self, Mark, MarkProperties};
use serde::{Deserialize, Serialize};

/// A run of text sharing one mark set; the unit of mark storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "object", rename = "leaf")]
pub struct Leaf {
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Leaf {
    pub fn new(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters, which is the unit every offset in the
    /// engine is measured in.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }
}

// Mark sets are order-insensitive, so leaf equality is too.
impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && mark::sets_equal(&self.marks, &other.marks)
    }
}

/// A leaf container node: an ordered list of leaf runs.
///
/// Offsets into a text node are character offsets across the whole node,
/// spanning leaf boundaries. Every mutation re-normalizes the leaf list:
/// adjacent leaves with identical mark sets coalesce and empty leaves are
/// pruned (one empty leaf is kept when the node has no content at all, so
/// the node itself stays addressable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Text {
    #[serde(skip_serializing, default = "Key::fresh")]
    pub key: Key,

    #[serde(default)]
    pub leaves: Vec<Leaf>,
}

// Keys are identity plumbing, not content.
impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.leaves == other.leaves
    }
}

fn byte_offset(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_marks(text, Vec::new())
    }

    pub fn with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            key: Key::fresh(),
            leaves: vec![Leaf::new(text, marks)],
        }
    }

    pub fn empty() -> Self {
        Self::new("")
    }

    pub fn from_leaves(leaves: Vec<Leaf>) -> Self {
        let mut text = Self {
            key: Key::fresh(),
            leaves,
        };
        text.normalize_leaves();
        text
    }

    /// The concatenated text of every leaf.
    pub fn text(&self) -> String {
        self.leaves.iter().map(|l| l.text.as_str()).collect()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.leaves.iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.iter().all(|l| l.is_empty())
    }

    /// Clamp a character offset into this node's range.
    pub fn clamp(&self, offset: usize) -> usize {
        offset.min(self.len())
    }

    /// Locate the leaf containing `offset`, returning the leaf index and
    /// the offset local to that leaf. An offset at a boundary resolves to
    /// the start of the following leaf.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let mut remaining = offset;
        for (i, leaf) in self.leaves.iter().enumerate() {
            let len = leaf.len();
            if remaining < len {
                return (i, remaining);
            }
            remaining -= len;
        }
        let last = self.leaves.len().saturating_sub(1);
        (last, self.leaves.get(last).map(|l| l.len()).unwrap_or(0))
    }

    /// Ensure a leaf boundary exists at `offset`; returns the index of
    /// the first leaf at or after the boundary.
    fn split_leaf_boundary(&mut self, offset: usize) -> usize {
        let mut consumed = 0;
        for i in 0..self.leaves.len() {
            let len = self.leaves[i].len();
            if offset == consumed {
                return i;
            }
            if offset < consumed + len {
                let local = offset - consumed;
                let at = byte_offset(&self.leaves[i].text, local);
                let right_text = self.leaves[i].text.split_off(at);
                let right = Leaf::new(right_text, self.leaves[i].marks.clone());
                self.leaves.insert(i + 1, right);
                return i + 1;
            }
            consumed += len;
        }
        self.leaves.len()
    }

    /// The marks a caret at `offset` would inherit: the marks of the
    /// character before it, falling back to the first character.
    pub fn marks_at(&self, offset: usize) -> Vec<Mark> {
        if self.is_empty() {
            return self
                .leaves
                .first()
                .map(|l| l.marks.clone())
                .unwrap_or_default();
        }
        let probe = if offset == 0 { 0 } else { offset - 1 };
        let (index, _) = self.locate(self.clamp(probe));
        self.leaves[index].marks.clone()
    }

    /// Marks present on every character of the interval
    /// `[offset, offset + length)`.
    pub fn marks_between(&self, offset: usize, length: usize) -> Vec<Mark> {
        let start = self.clamp(offset);
        let end = self.clamp(offset + length);
        if start >= end {
            return self.marks_at(start);
        }

        let mut consumed = 0;
        let mut common: Option<Vec<Mark>> = None;
        for leaf in &self.leaves {
            let len = leaf.len();
            let leaf_start = consumed;
            let leaf_end = consumed + len;
            consumed = leaf_end;
            if leaf_end <= start || leaf_start >= end || len == 0 {
                continue;
            }
            common = Some(match common {
                None => leaf.marks.clone(),
                Some(acc) => acc
                    .into_iter()
                    .filter(|m| leaf.marks.contains(m))
                    .collect(),
            });
        }
        common.unwrap_or_default()
    }

    /// Insert `text` at a character offset. When `marks` is `None` the
    /// insertion inherits the marks at the offset.
    pub fn insert_text(&mut self, offset: usize, text: &str, marks: Option<&[Mark]>) {
        let offset = self.clamp(offset);
        let inherited;
        let marks: &[Mark] = match marks {
            Some(m) => m,
            None => {
                inherited = self.marks_at(offset);
                &inherited
            }
        };

        if self.leaves.is_empty() {
            self.leaves.push(Leaf::new(text, marks.to_vec()));
            self.normalize_leaves();
            return;
        }

        let (index, local) = self.locate(offset);
        if mark::sets_equal(&self.leaves[index].marks, marks) || offset == self.len() {
            // Same mark set (or appending at the very end): splice into
            // the containing leaf and let normalization coalesce.
            let (index, local) = if offset == self.len() {
                let last = self.leaves.len() - 1;
                (last, self.leaves[last].len())
            } else {
                (index, local)
            };
            if mark::sets_equal(&self.leaves[index].marks, marks) {
                let at = byte_offset(&self.leaves[index].text, local);
                self.leaves[index].text.insert_str(at, text);
                self.normalize_leaves();
                return;
            }
        }

        let boundary = self.split_leaf_boundary(offset);
        self.leaves
            .insert(boundary, Leaf::new(text, marks.to_vec()));
        self.normalize_leaves();
    }

    /// Remove `length` characters starting at `offset`, returning the
    /// removed text.
    pub fn remove_text(&mut self, offset: usize, length: usize) -> String {
        let start = self.clamp(offset);
        let end = self.clamp(offset + length);
        if start >= end {
            return String::new();
        }

        let from = self.split_leaf_boundary(start);
        let to = self.split_leaf_boundary(end);
        let removed: String = self.leaves[from..to]
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        self.leaves.drain(from..to);
        self.normalize_leaves();
        removed
    }

    /// Add `mark` over the half-open interval `[offset, offset + length)`.
    pub fn add_mark(&mut self, offset: usize, length: usize, mark: &Mark) {
        self.update_interval(offset, length, |marks| {
            mark::add_to_set(marks, mark.clone());
        });
    }

    /// Remove `mark` over the half-open interval `[offset, offset + length)`.
    pub fn remove_mark(&mut self, offset: usize, length: usize, mark: &Mark) {
        self.update_interval(offset, length, |marks| {
            mark::remove_from_set(marks, mark);
        });
    }

    /// Replace `mark` with `properties.applied_to(mark)` over the interval.
    pub fn set_mark(
        &mut self,
        offset: usize,
        length: usize,
        mark: &Mark,
        properties: &MarkProperties,
    ) {
        let updated = properties.applied_to(mark);
        self.update_interval(offset, length, |marks| {
            if let Some(slot) = marks.iter_mut().find(|m| *m == mark) {
                *slot = updated.clone();
            }
        });
    }

    fn update_interval(
        &mut self,
        offset: usize,
        length: usize,
        mut update: impl FnMut(&mut Vec<Mark>),
    ) {
        let start = self.clamp(offset);
        let end = self.clamp(offset + length);
        if start >= end {
            return;
        }

        let from = self.split_leaf_boundary(start);
        let to = self.split_leaf_boundary(end);
        for leaf in &mut self.leaves[from..to] {
            update(&mut leaf.marks);
        }
        self.normalize_leaves();
    }

    /// Split this node at `offset`. The left half stays in place; the
    /// returned right half carries a fresh key.
    pub fn split_at(&mut self, offset: usize) -> Text {
        let offset = self.clamp(offset);
        let boundary = self.split_leaf_boundary(offset);
        let right_leaves = self.leaves.split_off(boundary);
        self.normalize_leaves();
        Text::from_leaves(right_leaves)
    }

    /// Merge `other` into this node by concatenating its leaf list.
    pub fn merge(&mut self, other: Text) {
        self.leaves.extend(other.leaves);
        self.normalize_leaves();
    }

    /// Coalesce adjacent leaves with identical mark sets and prune empty
    /// leaves, keeping one empty leaf when nothing remains.
    pub fn normalize_leaves(&mut self) {
        self.leaves.retain(|l| !l.is_empty());

        let mut i = 1;
        while i < self.leaves.len() {
            if mark::sets_equal(&self.leaves[i - 1].marks, &self.leaves[i].marks) {
                let merged = self.leaves.remove(i);
                self.leaves[i - 1].text.push_str(&merged.text);
            } else {
                i += 1;
            }
        }

        if self.leaves.is_empty() {
            self.leaves.push(Leaf::plain(""));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> Mark {
        Mark::new("bold")
    }

    #[test]
    fn test_insert_text_in_middle() {
        let mut text = Text::new("ab");
        text.insert_text(1, "X", None);
        assert_eq!(text.text(), "aXb");
        assert_eq!(text.leaves.len(), 1);
    }

    #[test]
    fn test_insert_inherits_marks_at_offset() {
        let mut text = Text::from_leaves(vec![
            Leaf::new("ab", vec![bold()]),
            Leaf::plain("cd"),
        ]);
        text.insert_text(1, "X", None);

        assert_eq!(text.text(), "aXbcd");
        assert_eq!(text.leaves[0].text, "aXb");
        assert_eq!(text.leaves[0].marks, vec![bold()]);
    }

    #[test]
    fn test_insert_with_foreign_marks_splits_leaf() {
        let mut text = Text::new("abcd");
        text.insert_text(2, "X", Some(&[bold()]));

        assert_eq!(text.text(), "abXcd");
        assert_eq!(text.leaves.len(), 3);
        assert_eq!(text.leaves[1].marks, vec![bold()]);
    }

    #[test]
    fn test_remove_text_across_leaves() {
        let mut text = Text::from_leaves(vec![
            Leaf::new("abc", vec![bold()]),
            Leaf::plain("def"),
        ]);
        let removed = text.remove_text(2, 2);

        assert_eq!(removed, "cd");
        assert_eq!(text.text(), "abef");
        assert_eq!(text.leaves.len(), 2);
    }

    #[test]
    fn test_add_mark_interval_splits_and_coalesces() {
        let mut text = Text::new("abcdef");
        text.add_mark(2, 2, &bold());

        assert_eq!(text.leaves.len(), 3);
        assert_eq!(text.leaves[1].text, "cd");
        assert_eq!(text.leaves[1].marks, vec![bold()]);

        text.remove_mark(2, 2, &bold());
        assert_eq!(text.leaves.len(), 1);
        assert_eq!(text.text(), "abcdef");
    }

    #[test]
    fn test_split_then_merge_round_trips() {
        let mut text = Text::from_leaves(vec![
            Leaf::new("abc", vec![bold()]),
            Leaf::plain("def"),
        ]);
        let original = text.clone();
        let original_key = text.key.clone();

        let right = text.split_at(4);
        assert_eq!(text.text(), "abcd");
        assert_eq!(right.text(), "ef");
        assert_ne!(right.key, original_key);

        text.merge(right);
        assert_eq!(text, original);
        assert_eq!(text.key, original_key);
    }

    #[test]
    fn test_marks_between_intersects() {
        let mut text = Text::new("abcd");
        text.add_mark(0, 3, &bold());

        assert_eq!(text.marks_between(0, 3), vec![bold()]);
        assert!(text.marks_between(0, 4).is_empty());
    }

    #[test]
    fn test_empty_text_keeps_one_leaf() {
        let mut text = Text::new("ab");
        text.remove_text(0, 2);

        assert_eq!(text.leaves.len(), 1);
        assert!(text.is_empty());
    }

    #[test]
    fn test_offsets_are_character_offsets() {
        let mut text = Text::new("héllo");
        text.insert_text(2, "X", None);
        assert_eq!(text.text(), "héXllo");
    }
}
