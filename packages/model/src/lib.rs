//! # Vellum Model
//!
//! The document data model for Vellum: a tree of block, inline and text
//! nodes with path/point/range addressing and JSON serialization.
//!
//! ## Structure
//!
//! ```text
//! Document
//! └── Block*                 (children: all blocks OR all inline/text)
//!     ├── Inline*            (children: inline/text only)
//!     │   └── Text
//!     │       └── Leaf*      (a run of text + one mark set)
//!     └── Text
//! ```
//!
//! Nodes are plain owned values: a "mutation" of a snapshot is a clone
//! that gets edited, so earlier snapshots stay valid forever. Every node
//! carries a [`Key`] that survives edits; paths are cheap positional
//! addresses that go stale whenever sibling counts change.
//!
//! ## Addressing
//!
//! - [`Path`] — child indices from the root; lexicographic order is
//!   document order.
//! - [`Point`] — a character offset inside a text node, addressed by key
//!   and/or path.
//! - [`Range`] / [`Selection`] / [`Decoration`] — two-point spans.

pub mod document;
pub mod error;
pub mod key;
pub mod mark;
pub mod node;
pub mod path;
pub mod point;
pub mod range;
pub mod text;

use std::collections::HashMap;

/// Arbitrary per-node user data, as it appears in the serialized form.
pub type DataMap = HashMap<String, serde_json::Value>;

pub use document::Document;
pub use error::ModelError;
pub use key::Key;
pub use mark::{Mark, MarkProperties};
pub use node::{Block, Inline, Node, NodeProperties};
pub use path::Path;
pub use point::Point;
pub use range::{Decoration, Range, Selection, SelectionProperties};
pub use text::{Leaf, Text};
