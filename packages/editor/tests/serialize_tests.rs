//! Serialization round trips and malformed-input failures.

use serde_json::json;
use vellum_editor::{
    Block, Document, Inline, Leaf, Mark, Node, Operation, Path, Point, Range, Schema, Text, Value,
};

fn styled_document() -> Document {
    let mut text = Text::new("hello world");
    text.add_mark(0, 5, &Mark::new("bold"));
    Document::from_nodes(vec![
        Node::Block(Block::new("paragraph", vec![Node::Text(text)])),
        Node::Block(Block::new(
            "paragraph",
            vec![
                Node::Text(Text::new("with ")),
                Node::Inline(Inline::new(
                    "link",
                    vec![Node::Text(Text::new("a link"))],
                )),
                Node::Text(Text::new(" inside")),
            ],
        )),
    ])
}

#[test]
fn test_document_round_trip() {
    let document = styled_document();

    let json = serde_json::to_value(&document).unwrap();
    assert_eq!(json["object"], "document");

    let back: Document = serde_json::from_value(json).unwrap();
    assert_eq!(back, document);
}

#[test]
fn test_node_round_trips() {
    let nodes = vec![
        Node::Block(Block::new("paragraph", vec![Node::Text(Text::new("b"))])),
        Node::Inline(Inline::new("link", vec![Node::Text(Text::new("i"))])),
        Node::Text(Text::from_leaves(vec![
            Leaf::plain("plain "),
            Leaf::new("bold", vec![Mark::new("bold")]),
        ])),
    ];

    for node in nodes {
        let json = serde_json::to_value(&node).unwrap();
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}

#[test]
fn test_serialized_node_shape() {
    let node = Node::Inline(Inline::void("emoji"));
    let json = serde_json::to_value(&node).unwrap();

    assert_eq!(json["object"], "inline");
    assert_eq!(json["type"], "emoji");
    assert_eq!(json["isVoid"], true);
    assert!(json.get("key").is_none());
    assert!(json.get("data").is_none());
}

#[test]
fn test_mark_round_trip_and_shape() {
    let mut data = vellum_editor::DataMap::new();
    data.insert("url".to_string(), json!("https://example.com"));
    let mark = Mark::with_data("link", data);

    let json = serde_json::to_value(&mark).unwrap();
    assert_eq!(json["object"], "mark");
    assert_eq!(json["type"], "link");

    let back: Mark = serde_json::from_value(json).unwrap();
    assert_eq!(back, mark);
}

#[test]
fn test_range_round_trip() {
    let range = Range::new(
        Point::at_path(Path::new(vec![0, 0]), 2),
        Point::at_path(Path::new(vec![1, 0]), 4),
    );

    let json = serde_json::to_string(&range).unwrap();
    let back: Range = serde_json::from_str(&json).unwrap();
    assert_eq!(back, range);
}

#[test]
fn test_value_round_trip() -> anyhow::Result<()> {
    let value = Value::create(styled_document(), Schema::core())?;

    let json = value.to_json()?;
    let back = Value::from_json(&json)?;

    assert_eq!(back, value);
    Ok(())
}

#[test]
fn test_mark_without_type_is_rejected() {
    let result = serde_json::from_value::<Mark>(json!({ "object": "mark" }));
    let err = result.unwrap_err().to_string();
    assert!(err.contains("type"), "unexpected error: {}", err);
}

#[test]
fn test_block_without_type_is_rejected() {
    let result = serde_json::from_value::<Node>(json!({
        "object": "block",
        "nodes": []
    }));
    assert!(result.is_err());
}

#[test]
fn test_unknown_object_tag_is_rejected() {
    let result = serde_json::from_value::<Node>(json!({
        "object": "widget",
        "type": "spinner"
    }));
    assert!(result.is_err());
}

#[test]
fn test_operation_wire_shapes() {
    let move_op = Operation::MoveNode {
        path: Path::new(vec![0, 1]),
        new_path: Path::new(vec![2]),
    };
    let json = serde_json::to_value(&move_op).unwrap();
    assert_eq!(json["type"], "move_node");
    assert_eq!(json["newPath"], json!([2]));

    let add_mark = Operation::AddMark {
        path: Path::new(vec![0, 0]),
        offset: 1,
        length: 3,
        mark: Mark::new("bold"),
    };
    let json = serde_json::to_value(&add_mark).unwrap();
    assert_eq!(json["mark"]["object"], "mark");
    assert_eq!(json["offset"], 1);
    assert_eq!(json["length"], 3);

    let back: Operation = serde_json::from_value(json).unwrap();
    assert_eq!(back, add_mark);
}

#[test]
fn test_set_selection_never_serializes_previous_state() {
    use vellum_editor::SelectionProperties;

    let op = Operation::SetSelection {
        properties: SelectionProperties {
            is_focused: Some(true),
            ..Default::default()
        },
        previous: SelectionProperties {
            is_focused: Some(false),
            ..Default::default()
        },
    };

    let json = serde_json::to_value(&op).unwrap();
    assert_eq!(json["properties"]["isFocused"], true);
    assert!(json.get("previous").is_none());

    // A deserialized operation loses the captured state but stays
    // well-formed.
    let back: Operation = serde_json::from_value(json).unwrap();
    match back {
        Operation::SetSelection { previous, .. } => assert!(previous.is_empty()),
        other => panic!("unexpected operation: {:?}", other),
    }
}
