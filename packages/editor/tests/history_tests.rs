//! Undo/redo round-trips through the editor session.

use vellum_editor::{
    Block, Document, Editor, Node, NodeProperties, Path, Point, Range, Schema, Text,
};

fn paragraph(text: &str) -> Node {
    Node::Block(Block::new("paragraph", vec![Node::Text(Text::new(text))]))
}

fn editor_of(texts: &[&str]) -> Editor {
    let document = Document::from_nodes(texts.iter().map(|t| paragraph(t)).collect());
    Editor::from_document(document, Schema::core()).unwrap()
}

fn text_key_at(editor: &Editor, path: Vec<usize>) -> vellum_editor::Key {
    editor
        .document()
        .assert_descendant(&Path::new(path))
        .unwrap()
        .key()
        .clone()
}

#[test]
fn test_n_edits_undo_n_restores_initial() {
    let mut editor = editor_of(&["one", "two", "three"]);
    let initial = editor.document().clone();

    // Three edits in three different text nodes: three distinct batches.
    for (i, addition) in ["A", "B", "C"].iter().enumerate() {
        let key = text_key_at(&editor, vec![i, 0]);
        editor
            .change(|c| c.insert_text_by_key(&key, 0, addition, None))
            .unwrap();
    }
    let edited = editor.document().clone();
    assert_eq!(editor.document().text(), "AoneBtwoCthree");
    assert_eq!(editor.value().history.undo_levels(), 3);

    for _ in 0..3 {
        editor.undo().unwrap();
    }
    assert_eq!(*editor.document(), initial);

    for _ in 0..3 {
        editor.redo().unwrap();
    }
    assert_eq!(*editor.document(), edited);
}

#[test]
fn test_contiguous_typing_undoes_as_one_batch() {
    let mut editor = editor_of(&[""]);
    let key = text_key_at(&editor, vec![0, 0]);

    for (offset, ch) in ["h", "i", "!"].iter().enumerate() {
        editor
            .change(|c| c.insert_text_by_key(&key, offset, ch, None))
            .unwrap();
    }
    assert_eq!(editor.document().text(), "hi!");
    assert_eq!(editor.value().history.undo_levels(), 1);

    editor.undo().unwrap();
    assert_eq!(editor.document().text(), "");
}

#[test]
fn test_undo_restores_cross_block_delete() {
    let mut editor = editor_of(&["hello", "world"]);
    let initial = editor.document().clone();

    let range = Range::new(
        Point::at_path(Path::new(vec![0, 0]), 3),
        Point::at_path(Path::new(vec![1, 0]), 2),
    );
    editor.change(|c| c.delete_at_range(&range)).unwrap();
    assert_eq!(editor.document().text(), "helrld");
    assert_eq!(editor.document().nodes.len(), 1);

    editor.undo().unwrap();
    assert_eq!(*editor.document(), initial);

    editor.redo().unwrap();
    assert_eq!(editor.document().text(), "helrld");
}

#[test]
fn test_undo_restores_split_block() {
    let mut editor = editor_of(&["helloworld"]);
    let initial = editor.document().clone();

    let point = Point::at_path(Path::new(vec![0, 0]), 5);
    editor.change(|c| c.split_block_at_point(&point)).unwrap();
    assert_eq!(editor.document().nodes.len(), 2);
    assert_eq!(editor.document().nodes[0].text(), "hello");
    assert_eq!(editor.document().nodes[1].text(), "world");

    editor.undo().unwrap();
    assert_eq!(*editor.document(), initial);
}

#[test]
fn test_new_edit_clears_redo() {
    let mut editor = editor_of(&["abc"]);
    let key = text_key_at(&editor, vec![0, 0]);

    editor
        .change(|c| c.insert_text_by_key(&key, 3, "!", None))
        .unwrap();
    editor.undo().unwrap();
    assert!(editor.value().history.can_redo());

    editor
        .change(|c| c.insert_text_by_key(&key, 0, "?", None))
        .unwrap();
    assert!(!editor.value().history.can_redo());
}

#[test]
fn test_undo_does_not_steal_focus() {
    let mut editor = editor_of(&["abc"]);
    let key = text_key_at(&editor, vec![0, 0]);

    // An edit batch, then a focused selection batch.
    editor
        .change(|c| c.insert_text_by_key(&key, 0, "x", None))
        .unwrap();
    editor
        .change(|c| {
            c.select_range(Range::collapsed(Point::at_key(key.clone(), 2)))?;
            c.focus()
        })
        .unwrap();
    assert!(editor.selection().is_focused);

    // Undoing the selection batch must not toggle focus back.
    editor.undo().unwrap();
    assert!(editor.selection().is_focused);

    // Undoing the edit batch restores the text but leaves focus alone.
    editor.undo().unwrap();
    assert_eq!(editor.document().text(), "abc");
    assert!(editor.selection().is_focused);
}

#[test]
fn test_undo_restores_set_node_properties() {
    let mut editor = editor_of(&["abc"]);
    let block_key = editor.document().nodes[0].key().clone();

    editor
        .change(|c| {
            c.set_node_by_key(
                &block_key,
                NodeProperties {
                    node_type: Some("quote".to_string()),
                    data: None,
                    is_void: None,
                },
            )
        })
        .unwrap();
    assert_eq!(editor.document().nodes[0].node_type(), Some("quote"));

    editor.undo().unwrap();
    assert_eq!(editor.document().nodes[0].node_type(), Some("paragraph"));
}

#[test]
fn test_undo_with_empty_history_is_a_no_op() {
    let mut editor = editor_of(&["abc"]);
    let before = editor.value().clone();

    editor.undo().unwrap();
    assert_eq!(*editor.value(), before);
}

#[test]
fn test_styled_delete_restores_marks_on_undo() {
    use vellum_editor::Mark;

    let mut editor = editor_of(&["abcdef"]);
    let key = text_key_at(&editor, vec![0, 0]);

    editor
        .change(|c| {
            let range = Range::new(
                Point::at_path(Path::new(vec![0, 0]), 1),
                Point::at_path(Path::new(vec![0, 0]), 4),
            );
            c.add_mark_at_range(&range, Mark::new("bold"))
        })
        .unwrap();
    let styled = editor.document().clone();

    // Delete across the styled run, then undo: the marks must survive
    // the round trip because each removed chunk carried its leaf marks.
    editor
        .change(|c| {
            let range = Range::new(
                Point::at_path(Path::new(vec![0, 0]), 0),
                Point::at_path(Path::new(vec![0, 0]), 5),
            );
            c.delete_at_range(&range)
        })
        .unwrap();
    assert_eq!(editor.document().text(), "f");

    editor.undo().unwrap();
    assert_eq!(*editor.document(), styled);
}
