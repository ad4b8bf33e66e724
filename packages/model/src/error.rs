use crate::key::Key;
use crate::path::Path;
use thiserror::Error;

/// Addressing and structural errors raised by assert-style lookups and
/// the tree mutation primitives. Soft `get_*` lookups return `Option`
/// instead and never produce these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Node not found: {0}")]
    NodeNotFound(Key),

    #[error("Node not found at path {0}")]
    NodeNotFoundAtPath(Path),

    #[error("Index {index} out of bounds ({len}) in node at {path}")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        path: Path,
    },

    #[error("Node at {0} has no previous sibling to merge into")]
    NoPreviousSibling(Path),

    #[error("Cannot merge nodes of different kinds at {0}")]
    MergeKindMismatch(Path),

    #[error("Move would create a cycle")]
    CycleDetected,

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}
