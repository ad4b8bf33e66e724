use vellum_model::{Document, Leaf, Node, Text};

/// Visitor pattern for traversing document nodes immutably
///
/// This trait provides default implementations that walk the entire tree.
/// Override specific visit_* methods to perform custom actions on nodes.
pub trait Visitor: Sized {
    fn visit_document(&mut self, document: &Document) {
        walk_document(self, document);
    }

    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_text(&mut self, text: &Text) {
        walk_text(self, text);
    }

    fn visit_leaf(&mut self, _leaf: &Leaf) {
        // Leaf node, no children to walk
    }
}

/// Mutable visitor pattern for transforming document nodes
///
/// Similar to Visitor, but provides mutable access to nodes.
/// Use this when you need to modify the tree during traversal.
pub trait VisitorMut: Sized {
    fn visit_document_mut(&mut self, document: &mut Document) {
        walk_document_mut(self, document);
    }

    fn visit_node_mut(&mut self, node: &mut Node) {
        walk_node_mut(self, node);
    }

    fn visit_text_mut(&mut self, text: &mut Text) {
        walk_text_mut(self, text);
    }

    fn visit_leaf_mut(&mut self, _leaf: &mut Leaf) {
        // Leaf node, no children to walk
    }
}

// Default walk implementations for immutable visitor

pub fn walk_document<V: Visitor>(visitor: &mut V, document: &Document) {
    for node in &document.nodes {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &Node) {
    match node {
        Node::Block(block) => {
            for child in &block.nodes {
                visitor.visit_node(child);
            }
        }
        Node::Inline(inline) => {
            for child in &inline.nodes {
                visitor.visit_node(child);
            }
        }
        Node::Text(text) => {
            visitor.visit_text(text);
        }
    }
}

pub fn walk_text<V: Visitor>(visitor: &mut V, text: &Text) {
    for leaf in &text.leaves {
        visitor.visit_leaf(leaf);
    }
}

// Default walk implementations for mutable visitor

pub fn walk_document_mut<V: VisitorMut>(visitor: &mut V, document: &mut Document) {
    for node in &mut document.nodes {
        visitor.visit_node_mut(node);
    }
}

pub fn walk_node_mut<V: VisitorMut>(visitor: &mut V, node: &mut Node) {
    match node {
        Node::Block(block) => {
            for child in &mut block.nodes {
                visitor.visit_node_mut(child);
            }
        }
        Node::Inline(inline) => {
            for child in &mut inline.nodes {
                visitor.visit_node_mut(child);
            }
        }
        Node::Text(text) => {
            visitor.visit_text_mut(text);
        }
    }
}

pub fn walk_text_mut<V: VisitorMut>(visitor: &mut V, text: &mut Text) {
    for leaf in &mut text.leaves {
        visitor.visit_leaf_mut(leaf);
    }
}
