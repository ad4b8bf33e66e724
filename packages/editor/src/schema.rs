//! # Schema
//!
//! Declarative structural rules plus the validation that feeds the
//! normalization fixpoint.
//!
//! ## Design
//!
//! - The built-in structural rules (documents hold blocks, containers
//!   are non-empty, void inlines are flanked by text, adjacent texts
//!   merge, and so on) are always checked first, in a fixed order.
//! - Caller-declared rules are plain data: an ordered list of
//!   [`RuleSet`]s is resolved once at construction into per-type maps,
//!   with earlier sets taking precedence. There is no dynamic rule
//!   merging after that point.
//! - Validation never mutates. It reports the first [`Violation`] it
//!   finds, carrying enough context (keys, indices) for the change
//!   layer to repair it; repairs re-resolve everything by key because
//!   each repair can shift paths.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use vellum_common::Visitor;
use vellum_model::{Document, Key, Leaf, Mark, Node, Path};

use crate::change::Change;

/// Predicate over one `data` entry (`None` when the key is absent).
pub type DataValidator = Arc<dyn Fn(Option<&serde_json::Value>) -> bool + Send + Sync>;

/// Custom repair hook declared by a rule. Returns `true` when it
/// handled the violation; `false` falls back to the default repair.
pub type RuleNormalizer = Arc<dyn Fn(&mut Change, &Violation) -> bool + Send + Sync>;

/// The three node kinds a rule can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Block,
    Inline,
    Text,
}

impl NodeKind {
    pub fn of(node: &Node) -> NodeKind {
        match node {
            Node::Block(_) => NodeKind::Block,
            Node::Inline(_) => NodeKind::Inline,
            Node::Text(_) => NodeKind::Text,
        }
    }
}

/// A structural pattern: which kinds and which types a node may be.
/// Empty lists match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMatch {
    pub kinds: Vec<NodeKind>,
    pub types: Vec<String>,
}

impl NodeMatch {
    pub fn of_kind(kind: NodeKind) -> Self {
        Self {
            kinds: vec![kind],
            types: Vec::new(),
        }
    }

    pub fn of_type(node_type: impl Into<String>) -> Self {
        Self {
            kinds: Vec::new(),
            types: vec![node_type.into()],
        }
    }

    pub fn kind_matches(&self, node: &Node) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&NodeKind::of(node))
    }

    pub fn type_matches(&self, node: &Node) -> bool {
        self.types.is_empty()
            || node
                .node_type()
                .map(|t| self.types.iter().any(|allowed| allowed == t))
                .unwrap_or(false)
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.kind_matches(node) && self.type_matches(node)
    }
}

/// One entry of a child-sequence constraint.
#[derive(Debug, Clone, Default)]
pub struct ChildSpec {
    pub matching: NodeMatch,
    pub min: Option<usize>,
    pub max: Option<usize>,
}

/// The constraints a rule can place on one node type.
#[derive(Clone, Default)]
pub struct NodeRule {
    pub is_void: Option<bool>,
    pub data: Vec<(String, DataValidator)>,
    pub marks: Option<Vec<String>>,
    pub text: Option<Regex>,
    pub first: Option<NodeMatch>,
    pub last: Option<NodeMatch>,
    pub nodes: Option<Vec<ChildSpec>>,
    pub parent: Option<NodeMatch>,
    pub normalize: Option<RuleNormalizer>,
}

impl fmt::Debug for NodeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRule")
            .field("is_void", &self.is_void)
            .field(
                "data",
                &self.data.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .field("marks", &self.marks)
            .field("text", &self.text.as_ref().map(|r| r.as_str()))
            .field("first", &self.first)
            .field("last", &self.last)
            .field("nodes", &self.nodes)
            .field("parent", &self.parent)
            .field("normalize", &self.normalize.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// One collaborator's contribution of rules, keyed by node type.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub document: Option<NodeRule>,
    pub blocks: HashMap<String, NodeRule>,
    pub inlines: HashMap<String, NodeRule>,
}

/// The number of built-in structural rules, used to bound the repair
/// loop.
const CORE_RULE_COUNT: usize = 8;

/// The resolved schema: built-in rules plus per-type declared rules.
#[derive(Clone, Default)]
pub struct Schema {
    document: Option<NodeRule>,
    blocks: HashMap<String, NodeRule>,
    inlines: HashMap<String, NodeRule>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("document", &self.document)
            .field("blocks", &self.blocks)
            .field("inlines", &self.inlines)
            .finish()
    }
}

impl Schema {
    /// The built-in structural rules only.
    pub fn core() -> Self {
        Self::default()
    }

    /// Resolve an ordered list of rule sets into one schema. Earlier
    /// sets take precedence, so resolution walks the list in reverse
    /// and lets earlier entries overwrite later ones.
    pub fn from_rule_sets(sets: Vec<RuleSet>) -> Self {
        let mut schema = Schema::default();
        for set in sets.into_iter().rev() {
            if let Some(rule) = set.document {
                schema.document = Some(rule);
            }
            for (node_type, rule) in set.blocks {
                schema.blocks.insert(node_type, rule);
            }
            for (node_type, rule) in set.inlines {
                schema.inlines.insert(node_type, rule);
            }
        }
        schema
    }

    /// Total rule count; the repair loop for one node is capped at this
    /// plus one before the schema is declared broken.
    pub fn rule_count(&self) -> usize {
        CORE_RULE_COUNT
            + usize::from(self.document.is_some())
            + self.blocks.len()
            + self.inlines.len()
    }

    /// The declared rule governing the node at `path` (the empty path
    /// addresses the document).
    pub fn rule_for(&self, document: &Document, path: &Path) -> Option<&NodeRule> {
        if path.is_empty() {
            return self.document.as_ref();
        }
        match document.get_descendant(path)? {
            Node::Block(b) => self.blocks.get(&b.node_type),
            Node::Inline(i) => self.inlines.get(&i.node_type),
            Node::Text(_) => None,
        }
    }

    /// Validate one node (not its descendants). Returns the first
    /// violation, or `None` when the node is valid or gone.
    pub fn validate(&self, document: &Document, path: &Path) -> Option<Violation> {
        self.validate_core(document, path)
            .or_else(|| self.validate_declared(document, path))
    }

    // Built-in structural rules, in fixed order.
    fn validate_core(&self, document: &Document, path: &Path) -> Option<Violation> {
        if path.is_empty() {
            // 1. Documents hold only blocks.
            for (index, child) in document.nodes.iter().enumerate() {
                if !child.is_block() {
                    return Some(Violation::ChildKindInvalid {
                        node: document.key.clone(),
                        child: child.key().clone(),
                        index,
                    });
                }
            }
            return None;
        }

        let node = document.get_descendant(path)?;
        let (key, children, is_block) = match node {
            Node::Text(_) => return None,
            Node::Block(b) => (b.key.clone(), &b.nodes, true),
            Node::Inline(i) => (i.key.clone(), &i.nodes, false),
        };

        // 2./3. A block's children are uniformly blocks or uniformly
        // inline/text; an inline holds inline/text only.
        if is_block && !children.is_empty() {
            let first_is_block = children[0].is_block();
            for (index, child) in children.iter().enumerate() {
                if child.is_block() != first_is_block {
                    return Some(Violation::ChildKindInvalid {
                        node: key,
                        child: child.key().clone(),
                        index,
                    });
                }
            }
        } else if !is_block {
            for (index, child) in children.iter().enumerate() {
                if child.is_block() {
                    return Some(Violation::ChildKindInvalid {
                        node: key,
                        child: child.key().clone(),
                        index,
                    });
                }
            }
        }

        // 4. Containers have at least one child.
        if children.is_empty() {
            return Some(Violation::NodeChildless { node: key });
        }

        // 5. Empty non-void inline children are removed.
        for (index, child) in children.iter().enumerate() {
            if child.is_inline()
                && !child.is_void()
                && child.text_len() == 0
                && !contains_void(child)
            {
                return Some(Violation::InlineChildEmpty {
                    node: key,
                    child: child.key().clone(),
                    index,
                });
            }
        }

        // 6. Void inline children are flanked by text siblings.
        for (index, child) in children.iter().enumerate() {
            if child.is_inline() && child.is_void() {
                if index == 0 || !children[index - 1].is_text() {
                    return Some(Violation::VoidUnflanked {
                        node: key,
                        index,
                        before: true,
                    });
                }
                if index == children.len() - 1 || !children[index + 1].is_text() {
                    return Some(Violation::VoidUnflanked {
                        node: key,
                        index,
                        before: false,
                    });
                }
            }
        }

        // 7. Adjacent text children merge.
        for index in 1..children.len() {
            if children[index - 1].is_text() && children[index].is_text() {
                return Some(Violation::AdjacentTexts { node: key, index });
            }
        }

        // 8. Redundant empty texts are pruned, except next to a void
        // inline.
        if children.len() > 1 {
            for (index, child) in children.iter().enumerate() {
                if let Node::Text(t) = child {
                    if t.is_empty() {
                        let prev_is_void_inline = index > 0
                            && children[index - 1].is_inline()
                            && children[index - 1].is_void();
                        let next_is_void_inline = index + 1 < children.len()
                            && children[index + 1].is_inline()
                            && children[index + 1].is_void();
                        if !prev_is_void_inline && !next_is_void_inline {
                            return Some(Violation::TextRedundant {
                                node: key,
                                child: t.key.clone(),
                            });
                        }
                    }
                }
            }
        }

        None
    }

    // Declared rules, checked after the built-ins.
    fn validate_declared(&self, document: &Document, path: &Path) -> Option<Violation> {
        let rule = self.rule_for(document, path)?;

        let (key, children, node): (Key, &Vec<Node>, Option<&Node>) = if path.is_empty() {
            (document.key.clone(), &document.nodes, None)
        } else {
            let node = document.get_descendant(path)?;
            match node.nodes() {
                Some(children) => (node.key().clone(), children, Some(node)),
                None => return None,
            }
        };

        // Void-ness.
        if let (Some(expected), Some(node)) = (rule.is_void, node) {
            if node.is_void() != expected {
                return Some(Violation::NodeIsVoidInvalid {
                    node: key,
                    expected,
                });
            }
        }

        // Data predicates.
        for (data_key, validator) in &rule.data {
            let data = match node {
                Some(n) => n.data(),
                None => Some(&document.data),
            };
            let entry = data.and_then(|d| d.get(data_key));
            if !validator(entry) {
                return Some(Violation::NodeDataInvalid {
                    node: key,
                    key: data_key.clone(),
                });
            }
        }

        // Mark whitelist over the subtree.
        if let Some(allowed) = &rule.marks {
            for mark in subtree_marks(children) {
                if !allowed.contains(&mark.mark_type) {
                    return Some(Violation::NodeMarkInvalid { node: key, mark });
                }
            }
        }

        // Required text pattern.
        if let Some(pattern) = &rule.text {
            let text: String = children.iter().map(|n| n.text()).collect();
            if !pattern.is_match(&text) {
                return Some(Violation::NodeTextInvalid { node: key });
            }
        }

        // First/last child constraints.
        if let (Some(matching), Some(first)) = (&rule.first, children.first()) {
            if !matching.kind_matches(first) {
                return Some(Violation::FirstChildKindInvalid {
                    node: key,
                    child: first.key().clone(),
                });
            }
            if !matching.type_matches(first) {
                return Some(Violation::FirstChildTypeInvalid {
                    node: key,
                    child: first.key().clone(),
                });
            }
        }
        if let (Some(matching), Some(last)) = (&rule.last, children.last()) {
            if !matching.kind_matches(last) {
                return Some(Violation::LastChildKindInvalid {
                    node: key,
                    child: last.key().clone(),
                });
            }
            if !matching.type_matches(last) {
                return Some(Violation::LastChildTypeInvalid {
                    node: key,
                    child: last.key().clone(),
                });
            }
        }

        // Child sequence.
        if let Some(specs) = &rule.nodes {
            if let Some(violation) = validate_child_sequence(&key, children, specs) {
                return Some(violation);
            }
        }

        // Parent constraint.
        if let Some(matching) = &rule.parent {
            if !path.is_empty() {
                let parent_path = path.parent();
                match document.get_descendant(&parent_path) {
                    Some(parent) => {
                        if !matching.kind_matches(parent) {
                            return Some(Violation::ParentKindInvalid {
                                node: key,
                                parent: parent.key().clone(),
                            });
                        }
                        if !matching.type_matches(parent) {
                            return Some(Violation::ParentTypeInvalid {
                                node: key,
                                parent: parent.key().clone(),
                            });
                        }
                    }
                    // The parent is the document: only an unconstrained
                    // pattern matches it.
                    None => {
                        if !matching.kinds.is_empty() || !matching.types.is_empty() {
                            return Some(Violation::ParentKindInvalid {
                                node: key,
                                parent: document.key.clone(),
                            });
                        }
                    }
                }
            }
        }

        None
    }
}

/// Match children against an ordered list of specs with min/max
/// multiplicities, reporting the first child (or gap) that cannot be
/// placed.
fn validate_child_sequence(
    key: &Key,
    children: &[Node],
    specs: &[ChildSpec],
) -> Option<Violation> {
    let mut spec_index = 0;
    let mut seen = 0usize;

    for (index, child) in children.iter().enumerate() {
        loop {
            let Some(spec) = specs.get(spec_index) else {
                return Some(Violation::ChildUnknown {
                    node: key.clone(),
                    child: child.key().clone(),
                    index,
                });
            };
            if let Some(max) = spec.max {
                if seen >= max {
                    spec_index += 1;
                    seen = 0;
                    continue;
                }
            }
            if spec.matching.matches(child) {
                seen += 1;
                break;
            }
            if seen >= spec.min.unwrap_or(0) {
                spec_index += 1;
                seen = 0;
                continue;
            }
            return Some(Violation::ChildTypeInvalid {
                node: key.clone(),
                child: child.key().clone(),
                index,
            });
        }
    }

    while let Some(spec) = specs.get(spec_index) {
        if seen < spec.min.unwrap_or(0) {
            return Some(Violation::ChildRequired {
                node: key.clone(),
                index: children.len(),
            });
        }
        spec_index += 1;
        seen = 0;
    }

    None
}

fn contains_void(node: &Node) -> bool {
    if node.is_void() {
        return true;
    }
    node.nodes()
        .map(|children| children.iter().any(contains_void))
        .unwrap_or(false)
}

struct MarkCollector {
    marks: Vec<Mark>,
}

impl Visitor for MarkCollector {
    fn visit_leaf(&mut self, leaf: &Leaf) {
        for mark in &leaf.marks {
            if !self.marks.contains(mark) {
                self.marks.push(mark.clone());
            }
        }
    }
}

fn subtree_marks(children: &[Node]) -> Vec<Mark> {
    let mut collector = MarkCollector { marks: Vec::new() };
    for child in children {
        collector.visit_node(child);
    }
    collector.marks
}

/// One concrete invariant violation, carrying the context a repair
/// needs. Nodes are referenced by key: paths may have shifted by the
/// time the repair runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// A child of the wrong kind for its container.
    ChildKindInvalid { node: Key, child: Key, index: usize },
    /// A child whose type does not fit the declared sequence.
    ChildTypeInvalid { node: Key, child: Key, index: usize },
    /// A child past the end of the declared sequence.
    ChildUnknown { node: Key, child: Key, index: usize },
    /// The declared sequence requires a child that is missing.
    ChildRequired { node: Key, index: usize },
    /// A container with no children at all.
    NodeChildless { node: Key },
    /// An empty non-void inline child.
    InlineChildEmpty { node: Key, child: Key, index: usize },
    /// A void inline child missing a text sibling on one side.
    VoidUnflanked {
        node: Key,
        index: usize,
        before: bool,
    },
    /// Two adjacent text children.
    AdjacentTexts { node: Key, index: usize },
    /// An empty text child with no void-inline neighbor.
    TextRedundant { node: Key, child: Key },
    /// A data entry rejected by its validator.
    NodeDataInvalid { node: Key, key: String },
    /// Void-ness differs from the rule.
    NodeIsVoidInvalid { node: Key, expected: bool },
    /// A mark outside the rule's whitelist.
    NodeMarkInvalid { node: Key, mark: Mark },
    /// Text that fails the rule's pattern.
    NodeTextInvalid { node: Key },
    FirstChildKindInvalid { node: Key, child: Key },
    FirstChildTypeInvalid { node: Key, child: Key },
    LastChildKindInvalid { node: Key, child: Key },
    LastChildTypeInvalid { node: Key, child: Key },
    ParentKindInvalid { node: Key, parent: Key },
    ParentTypeInvalid { node: Key, parent: Key },
}

impl Violation {
    /// The key of the node the violation was reported against.
    pub fn node_key(&self) -> &Key {
        match self {
            Violation::ChildKindInvalid { node, .. }
            | Violation::ChildTypeInvalid { node, .. }
            | Violation::ChildUnknown { node, .. }
            | Violation::ChildRequired { node, .. }
            | Violation::NodeChildless { node }
            | Violation::InlineChildEmpty { node, .. }
            | Violation::VoidUnflanked { node, .. }
            | Violation::AdjacentTexts { node, .. }
            | Violation::TextRedundant { node, .. }
            | Violation::NodeDataInvalid { node, .. }
            | Violation::NodeIsVoidInvalid { node, .. }
            | Violation::NodeMarkInvalid { node, .. }
            | Violation::NodeTextInvalid { node }
            | Violation::FirstChildKindInvalid { node, .. }
            | Violation::FirstChildTypeInvalid { node, .. }
            | Violation::LastChildKindInvalid { node, .. }
            | Violation::LastChildTypeInvalid { node, .. }
            | Violation::ParentKindInvalid { node, .. }
            | Violation::ParentTypeInvalid { node, .. } => node,
        }
    }
}
