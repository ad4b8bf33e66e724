//! Inversion properties of the operation model.
//!
//! For every operation type except the `set_*` kinds, applying an
//! operation and then its inverse must restore the document exactly.

use vellum_editor::{
    apply_operation, invert_operation, Block, Document, Inline, Mark, Node, NodeProperties,
    Operation, Path, Point, Selection, Text, Value,
};

fn paragraph(text: &str) -> Node {
    Node::Block(Block::new("paragraph", vec![Node::Text(Text::new(text))]))
}

fn value_of(texts: &[&str]) -> Value {
    Value::new(Document::from_nodes(texts.iter().map(|t| paragraph(t)).collect()))
}

fn assert_round_trips(value: &Value, op: Operation) {
    let mut after = value.clone();
    apply_operation(&mut after, &op).unwrap();
    assert_ne!(
        after.document, value.document,
        "operation should change the document"
    );

    let inverse = invert_operation(&op);
    apply_operation(&mut after, &inverse).unwrap();
    assert_eq!(after.document, value.document);
}

#[test]
fn test_insert_node_round_trips() {
    let value = value_of(&["one", "two"]);
    assert_round_trips(
        &value,
        Operation::InsertNode {
            path: Path::new(vec![1]),
            node: paragraph("inserted"),
        },
    );
}

#[test]
fn test_remove_node_round_trips() {
    let value = value_of(&["one", "two", "three"]);
    let node = value
        .document
        .assert_descendant(&Path::new(vec![1]))
        .unwrap()
        .clone();
    assert_round_trips(
        &value,
        Operation::RemoveNode {
            path: Path::new(vec![1]),
            node,
        },
    );
}

#[test]
fn test_insert_text_yields_a_x_b() {
    let mut value = value_of(&["ab"]);
    apply_operation(
        &mut value,
        &Operation::InsertText {
            path: Path::new(vec![0, 0]),
            offset: 1,
            text: "X".to_string(),
            marks: None,
        },
    )
    .unwrap();

    assert_eq!(value.document.text(), "aXb");
}

#[test]
fn test_insert_text_round_trips() {
    let value = value_of(&["hello"]);
    assert_round_trips(
        &value,
        Operation::InsertText {
            path: Path::new(vec![0, 0]),
            offset: 2,
            text: "xyz".to_string(),
            marks: None,
        },
    );
}

#[test]
fn test_remove_text_round_trips() {
    let value = value_of(&["hello"]);
    assert_round_trips(
        &value,
        Operation::RemoveText {
            path: Path::new(vec![0, 0]),
            offset: 1,
            text: "ell".to_string(),
            marks: Some(vec![]),
        },
    );
}

#[test]
fn test_add_and_remove_mark_round_trip() {
    let value = value_of(&["abcd"]);
    assert_round_trips(
        &value,
        Operation::AddMark {
            path: Path::new(vec![0, 0]),
            offset: 1,
            length: 2,
            mark: Mark::new("bold"),
        },
    );

    // And the reverse direction, over already-marked text.
    let mut marked = value_of(&["abcd"]);
    apply_operation(
        &mut marked,
        &Operation::AddMark {
            path: Path::new(vec![0, 0]),
            offset: 0,
            length: 4,
            mark: Mark::new("bold"),
        },
    )
    .unwrap();
    assert_round_trips(
        &marked,
        Operation::RemoveMark {
            path: Path::new(vec![0, 0]),
            offset: 1,
            length: 2,
            mark: Mark::new("bold"),
        },
    );
}

#[test]
fn test_split_then_merge_restores_text_node() {
    let value = value_of(&["hello"]);
    assert_round_trips(
        &value,
        Operation::SplitNode {
            path: Path::new(vec![0, 0]),
            position: 2,
            properties: NodeProperties::default(),
        },
    );
}

#[test]
fn test_merge_then_split_restores_blocks() {
    let value = value_of(&["one", "two"]);
    assert_round_trips(
        &value,
        Operation::MergeNode {
            path: Path::new(vec![1]),
            position: 1,
            properties: NodeProperties {
                node_type: Some("paragraph".to_string()),
                data: None,
                is_void: None,
            },
        },
    );
}

#[test]
fn test_set_node_round_trips_via_captured_previous() {
    let value = value_of(&["one"]);
    let mut after = value.clone();

    let op = Operation::SetNode {
        path: Path::new(vec![0]),
        properties: NodeProperties {
            node_type: Some("quote".to_string()),
            data: None,
            is_void: None,
        },
        previous: NodeProperties {
            node_type: Some("paragraph".to_string()),
            data: None,
            is_void: None,
        },
    };
    apply_operation(&mut after, &op).unwrap();
    assert_eq!(
        after
            .document
            .assert_descendant(&Path::new(vec![0]))
            .unwrap()
            .node_type(),
        Some("quote")
    );

    apply_operation(&mut after, &invert_operation(&op)).unwrap();
    assert_eq!(after.document, value.document);
}

#[test]
fn test_move_node_round_trips_between_parents() {
    let value = Value::new(Document::from_nodes(vec![
        paragraph("a"),
        Node::Block(Block::new("quote", vec![paragraph("b"), paragraph("c")])),
    ]));
    assert_round_trips(
        &value,
        Operation::MoveNode {
            path: Path::new(vec![1, 0]),
            new_path: Path::new(vec![0]),
        },
    );
}

#[test]
fn test_move_node_to_left_sibling_of_ancestor_round_trips() {
    // The §-critical shape: the destination is a left sibling of one of
    // the moved node's ancestors.
    let value = Value::new(Document::from_nodes(vec![
        paragraph("a"),
        paragraph("b"),
        Node::Block(Block::new("quote", vec![paragraph("inner")])),
    ]));
    assert_round_trips(
        &value,
        Operation::MoveNode {
            path: Path::new(vec![2, 0]),
            new_path: Path::new(vec![1]),
        },
    );
}

#[test]
fn test_move_node_into_later_subtree_round_trips() {
    let value = Value::new(Document::from_nodes(vec![
        paragraph("a"),
        paragraph("b"),
        Node::Block(Block::new("quote", vec![paragraph("inner")])),
    ]));
    assert_round_trips(
        &value,
        Operation::MoveNode {
            path: Path::new(vec![0]),
            new_path: Path::new(vec![2, 1]),
        },
    );
}

#[test]
fn test_repeated_undo_redo_of_move_is_stable() {
    let value = Value::new(Document::from_nodes(vec![
        paragraph("a"),
        Node::Block(Block::new("quote", vec![paragraph("b")])),
    ]));
    let op = Operation::MoveNode {
        path: Path::new(vec![1, 0]),
        new_path: Path::new(vec![0]),
    };

    let mut current = value.clone();
    for _ in 0..5 {
        apply_operation(&mut current, &op).unwrap();
        let inverse = invert_operation(&op);
        apply_operation(&mut current, &inverse).unwrap();
        assert_eq!(current.document, value.document);
    }
}

#[test]
fn test_caret_advances_on_insert_at_caret() {
    let mut value = value_of(&["ab"]);
    value.selection = Selection::collapsed(Point::at_path(Path::new(vec![0, 0]), 1))
        .normalized(&value.document);

    apply_operation(
        &mut value,
        &Operation::InsertText {
            path: Path::new(vec![0, 0]),
            offset: 1,
            text: "XY".to_string(),
            marks: None,
        },
    )
    .unwrap();

    assert_eq!(value.selection.anchor.offset, 3);
    assert_eq!(value.selection.focus.offset, 3);
}

#[test]
fn test_decoration_does_not_extend_from_boundary_insert() {
    use vellum_editor::Decoration;

    let mut value = value_of(&["abcd"]);
    let decoration = Decoration::new(
        Point::at_path(Path::new(vec![0, 0]), 1),
        Point::at_path(Path::new(vec![0, 0]), 3),
        Mark::new("highlight"),
    )
    .normalized(&value.document);
    value.decorations = vec![decoration];

    // Inserting exactly at the decoration start must not widen it.
    apply_operation(
        &mut value,
        &Operation::InsertText {
            path: Path::new(vec![0, 0]),
            offset: 1,
            text: "Z".to_string(),
            marks: None,
        },
    )
    .unwrap();

    assert_eq!(value.decorations[0].anchor.offset, 1);
    assert_eq!(value.decorations[0].focus.offset, 4);
}

#[test]
fn test_remove_text_clamps_points_inside_interval() {
    let mut value = value_of(&["abcdef"]);
    value.selection = Selection::collapsed(Point::at_path(Path::new(vec![0, 0]), 4))
        .normalized(&value.document);

    apply_operation(
        &mut value,
        &Operation::RemoveText {
            path: Path::new(vec![0, 0]),
            offset: 2,
            text: "cde".to_string(),
            marks: None,
        },
    )
    .unwrap();

    assert_eq!(value.document.text(), "abf");
    assert_eq!(value.selection.anchor.offset, 2);
}

#[test]
fn test_split_moves_caret_to_right_node() {
    let mut value = value_of(&["hello"]);
    value.selection = Selection::collapsed(Point::at_path(Path::new(vec![0, 0]), 3))
        .normalized(&value.document);

    apply_operation(
        &mut value,
        &Operation::SplitNode {
            path: Path::new(vec![0, 0]),
            position: 3,
            properties: NodeProperties::default(),
        },
    )
    .unwrap();

    assert_eq!(value.selection.anchor.path, Some(Path::new(vec![0, 1])));
    assert_eq!(value.selection.anchor.offset, 0);
}

#[test]
fn test_remove_node_relocates_selection_to_previous_text() {
    let mut value = value_of(&["one", "two"]);
    value.selection = Selection::collapsed(Point::at_path(Path::new(vec![1, 0]), 2))
        .normalized(&value.document);

    let node = value
        .document
        .assert_descendant(&Path::new(vec![1]))
        .unwrap()
        .clone();
    apply_operation(
        &mut value,
        &Operation::RemoveNode {
            path: Path::new(vec![1]),
            node,
        },
    )
    .unwrap();

    // The caret lands at the end of the previous text.
    assert_eq!(value.selection.anchor.path, Some(Path::new(vec![0, 0])));
    assert_eq!(value.selection.anchor.offset, 3);
}

#[test]
fn test_merge_shifts_points_on_merged_text() {
    let mut value = Value::new(Document::from_nodes(vec![Node::Block(Block::new(
        "paragraph",
        vec![
            Node::Text(Text::new("ab")),
            Node::Inline(Inline::new("link", vec![Node::Text(Text::new("x"))])),
            Node::Text(Text::new("cd")),
        ],
    ))]));
    value.selection = Selection::collapsed(Point::at_path(Path::new(vec![0, 2]), 1))
        .normalized(&value.document);

    // Remove the inline, then merge the two texts it separated.
    let inline = value
        .document
        .assert_descendant(&Path::new(vec![0, 1]))
        .unwrap()
        .clone();
    apply_operation(
        &mut value,
        &Operation::RemoveNode {
            path: Path::new(vec![0, 1]),
            node: inline,
        },
    )
    .unwrap();
    apply_operation(
        &mut value,
        &Operation::MergeNode {
            path: Path::new(vec![0, 1]),
            position: 2,
            properties: NodeProperties::default(),
        },
    )
    .unwrap();

    assert_eq!(value.document.text(), "abcd");
    assert_eq!(value.selection.anchor.path, Some(Path::new(vec![0, 0])));
    assert_eq!(value.selection.anchor.offset, 3);
}
