use crate::document::Document;
use crate::key::Key;
use crate::node::Node;
use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A character offset inside a text node.
///
/// A point may address its node by key, by path, or both. Keys survive
/// edits and paths do not, so a point is re-resolved against the current
/// document before use: [`Point::normalized`] fills in whichever address
/// is missing, descends into non-text targets, and clamps the offset.
///
/// Keys are process-local, so only `path` and `offset` serialize, and
/// equality prefers paths: two points with the same resolved path and
/// offset are the same address even across a serialization boundary
/// that regenerated keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Point {
    #[serde(skip_serializing, default)]
    pub key: Option<Key>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    #[serde(default)]
    pub offset: usize,
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
            && match (&self.path, &other.path) {
                (Some(a), Some(b)) => a == b,
                (None, None) => self.key == other.key,
                _ => false,
            }
    }
}

impl Point {
    pub fn new(key: Option<Key>, path: Option<Path>, offset: usize) -> Self {
        Self { key, path, offset }
    }

    pub fn at_key(key: Key, offset: usize) -> Self {
        Self {
            key: Some(key),
            path: None,
            offset,
        }
    }

    pub fn at_path(path: Path, offset: usize) -> Self {
        Self {
            key: None,
            path: Some(path),
            offset,
        }
    }

    /// A point that addresses nothing.
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.key.is_some() || self.path.is_some()
    }

    pub fn with_offset(&self, offset: usize) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    /// Resolve this point against `document`: fill in key and path from
    /// each other, descend into non-text targets (treating the offset as
    /// a child index on the way down), and clamp the offset into the
    /// resolved text. An unresolvable point comes back unset.
    pub fn normalized(&self, document: &Document) -> Point {
        if !self.is_set() {
            return Point::unset();
        }

        // Keys are authoritative; stored paths may be stale.
        let mut path = match &self.key {
            Some(key) => match document.get_path_by_key(key) {
                Some(path) => path,
                None => match &self.path {
                    Some(path) if document.get_descendant(path).is_some() => path.clone(),
                    _ => return Point::unset(),
                },
            },
            None => match &self.path {
                Some(path) if document.get_descendant(path).is_some() => path.clone(),
                _ => return Point::unset(),
            },
        };

        let mut node = match document.get_descendant(&path) {
            Some(node) => node,
            None => return Point::unset(),
        };
        let mut offset = self.offset;

        // Descend into containers: the offset names a child index, and
        // the walk continues toward the nearest text edge.
        while !node.is_text() {
            let children = match node.nodes() {
                Some(children) if !children.is_empty() => children,
                _ => return Point::unset(),
            };
            let past_end = offset >= children.len();
            let index = if past_end { children.len() - 1 } else { offset };
            path = path.child(index);
            node = &children[index];
            offset = if past_end { usize::MAX } else { 0 };
        }

        match node {
            Node::Text(text) => Point {
                key: Some(text.key.clone()),
                path: Some(path),
                offset: text.clamp(offset),
            },
            _ => Point::unset(),
        }
    }

    /// Document-order comparison of two normalized points (both must
    /// carry paths).
    pub fn compare(&self, other: &Point) -> Option<Ordering> {
        let a = self.path.as_ref()?;
        let b = other.path.as_ref()?;
        Some(match a.cmp(b) {
            Ordering::Equal => self.offset.cmp(&other.offset),
            order => order,
        })
    }

    /// Shift this point for an insertion of `len` characters at
    /// `offset` in the text node `key`. A point at exactly the insert
    /// offset advances when it is not atomic (a caret extends as you
    /// type); an atomic point (a decoration endpoint) stays put so the
    /// span does not grow from edits at its boundary.
    pub fn transform_insert_text(&mut self, key: &Key, offset: usize, len: usize, atomic: bool) {
        if self.key.as_ref() != Some(key) {
            return;
        }
        if self.offset > offset || (self.offset == offset && !atomic) {
            self.offset += len;
        }
    }

    /// Shift this point for a removal of `len` characters at `offset`
    /// in the text node `key`: points past the removed interval shift
    /// back, points inside it clamp to its start.
    pub fn transform_remove_text(&mut self, key: &Key, offset: usize, len: usize) {
        if self.key.as_ref() != Some(key) {
            return;
        }
        if self.offset >= offset + len {
            self.offset -= len;
        } else if self.offset > offset {
            self.offset = offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Block;
    use crate::text::Text;

    fn doc() -> Document {
        Document::from_nodes(vec![Node::Block(Block::new(
            "paragraph",
            vec![Node::Text(Text::new("abcd"))],
        ))])
    }

    #[test]
    fn test_normalize_resolves_key_from_path() {
        let d = doc();
        let point = Point::at_path(Path::new(vec![0, 0]), 2);
        let normalized = point.normalized(&d);

        let text_key = d.get_descendant(&Path::new(vec![0, 0])).unwrap().key();
        assert_eq!(normalized.key.as_ref(), Some(text_key));
        assert_eq!(normalized.offset, 2);
    }

    #[test]
    fn test_normalize_descends_into_containers() {
        let d = doc();
        let point = Point::at_path(Path::new(vec![0]), 0);
        let normalized = point.normalized(&d);

        assert_eq!(normalized.path, Some(Path::new(vec![0, 0])));
        assert_eq!(normalized.offset, 0);

        // Past-the-end child index lands at the end of the last text.
        let point = Point::at_path(Path::new(vec![0]), 5);
        let normalized = point.normalized(&d);
        assert_eq!(normalized.path, Some(Path::new(vec![0, 0])));
        assert_eq!(normalized.offset, 4);
    }

    #[test]
    fn test_normalize_clamps_offset() {
        let d = doc();
        let point = Point::at_path(Path::new(vec![0, 0]), 99);
        assert_eq!(point.normalized(&d).offset, 4);
    }

    #[test]
    fn test_normalize_prefers_key_over_stale_path() {
        let d = doc();
        let key = d.get_descendant(&Path::new(vec![0, 0])).unwrap().key().clone();
        let point = Point::new(Some(key), Some(Path::new(vec![7, 7])), 1);
        let normalized = point.normalized(&d);
        assert_eq!(normalized.path, Some(Path::new(vec![0, 0])));
    }

    #[test]
    fn test_insert_shift_tie_break() {
        let key = Key::from("t");
        let mut caret = Point::at_key(key.clone(), 2);
        let mut atomic = Point::at_key(key.clone(), 2);

        caret.transform_insert_text(&key, 2, 3, false);
        atomic.transform_insert_text(&key, 2, 3, true);

        assert_eq!(caret.offset, 5);
        assert_eq!(atomic.offset, 2);
    }

    #[test]
    fn test_remove_shift_clamps_interior_points() {
        let key = Key::from("t");
        let mut after = Point::at_key(key.clone(), 6);
        let mut inside = Point::at_key(key.clone(), 3);
        let mut before = Point::at_key(key.clone(), 1);

        after.transform_remove_text(&key, 2, 2);
        inside.transform_remove_text(&key, 2, 2);
        before.transform_remove_text(&key, 2, 2);

        assert_eq!(after.offset, 4);
        assert_eq!(inside.offset, 2);
        assert_eq!(before.offset, 1);
    }
}
