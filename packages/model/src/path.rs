use serde::{Deserialize, Serialize};
use std::fmt;

/// A list of child indices locating a node from the document root.
///
/// Paths are cheap addresses, not identities: any edit that changes the
/// child count of an ancestor shifts the paths of everything after it.
/// Callers that hold a path across an edit must re-derive it from the
/// node's key before reusing it.
///
/// Ordering is lexicographic, which is exactly pre-order document order
/// (an ancestor sorts before its descendants).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn new(indices: Vec<usize>) -> Self {
        Path(indices)
    }

    /// The path of the document root.
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn get(&self, depth: usize) -> Option<usize> {
        self.0.get(depth).copied()
    }

    /// The final segment: the node's index among its siblings.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// The path of this node's parent. The root's parent is the root.
    pub fn parent(&self) -> Path {
        let mut indices = self.0.clone();
        indices.pop();
        Path(indices)
    }

    /// Extend this path downward with a child index.
    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// A copy with the final segment replaced.
    pub fn with_last(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        if let Some(last) = indices.last_mut() {
            *last = index;
        }
        Path(indices)
    }

    /// A copy with the segment at `depth` replaced.
    pub fn with_index_at(&self, depth: usize, index: usize) -> Path {
        let mut indices = self.0.clone();
        if let Some(slot) = indices.get_mut(depth) {
            *slot = index;
        }
        Path(indices)
    }

    /// A copy with the final segment incremented by one.
    pub fn incremented(&self) -> Path {
        match self.last() {
            Some(last) => self.with_last(last + 1),
            None => self.clone(),
        }
    }

    /// A copy with the final segment decremented by one.
    pub fn decremented(&self) -> Path {
        match self.last() {
            Some(last) => self.with_last(last.saturating_sub(1)),
            None => self.clone(),
        }
    }

    /// Strict-prefix test: a node is not its own ancestor.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    pub fn is_sibling_of(&self, other: &Path) -> bool {
        !self.0.is_empty() && self.0.len() == other.0.len() && self.parent() == other.parent()
    }

    /// Whether both paths agree on every segment above `depth`.
    pub fn shares_prefix(&self, other: &Path, depth: usize) -> bool {
        depth <= self.0.len() && depth <= other.0.len() && self.0[..depth] == other.0[..depth]
    }

    /// The deepest common ancestor of two paths.
    pub fn common_ancestor(&self, other: &Path) -> Path {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Path(self.0[..shared].to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Path(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Path(indices.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_order_is_lexicographic() {
        let a = Path::new(vec![0]);
        let b = Path::new(vec![0, 1]);
        let c = Path::new(vec![1]);

        assert!(a < b); // ancestor sorts first
        assert!(b < c);
        assert!(a < c);
    }

    #[test]
    fn test_ancestor_is_strict() {
        let parent = Path::new(vec![0, 1]);
        let child = Path::new(vec![0, 1, 2]);

        assert!(parent.is_ancestor_of(&child));
        assert!(!parent.is_ancestor_of(&parent));
        assert!(!child.is_ancestor_of(&parent));
        assert!(Path::root().is_ancestor_of(&parent));
    }

    #[test]
    fn test_common_ancestor() {
        let a = Path::new(vec![0, 1, 2]);
        let b = Path::new(vec![0, 1, 4, 0]);
        assert_eq!(a.common_ancestor(&b), Path::new(vec![0, 1]));

        let c = Path::new(vec![2]);
        assert_eq!(a.common_ancestor(&c), Path::root());
    }

    #[test]
    fn test_sibling_steps() {
        let p = Path::new(vec![1, 3]);
        assert_eq!(p.incremented(), Path::new(vec![1, 4]));
        assert_eq!(p.decremented(), Path::new(vec![1, 2]));
        assert!(p.is_sibling_of(&Path::new(vec![1, 9])));
        assert!(!p.is_sibling_of(&Path::new(vec![2, 3])));
    }
}
