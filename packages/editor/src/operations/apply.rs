//! Operation application.
//!
//! `apply_operation` is the single entry point every edit funnels
//! through: it mutates the value's document, then repairs the selection
//! and decoration points that the edit displaced, so a point that was
//! valid before the operation is still valid (or deliberately unset)
//! after it.

use std::collections::HashSet;

use tracing::trace;
use vellum_model::{Decoration, Key, Point};

use super::Operation;
use crate::errors::EditorError;
use crate::value::Value;

/// Apply `op` to `value` in place.
pub fn apply_operation(value: &mut Value, op: &Operation) -> Result<(), EditorError> {
    trace!(kind = op.kind(), "applying operation");

    match op {
        Operation::InsertNode { path, node } => {
            value.document.insert_node(path, node.clone())?;
            refresh_points(value);
        }

        Operation::RemoveNode { path, .. } => {
            let target = value.document.assert_descendant(path)?;
            let mut removed_keys = HashSet::new();
            target.collect_keys(&mut removed_keys);

            // Capture relocation targets before the tree changes. Both
            // exclude the removed subtree: ancestors sort before their
            // descendants, so everything inside sorts after `path`.
            let previous = value
                .document
                .get_previous_text(path)
                .map(|(_, t)| (t.key.clone(), t.len()));
            let next = value.document.get_next_text(path).map(|(_, t)| t.key.clone());

            value.document.remove_node(path)?;

            for point in selection_points(value) {
                relocate_out_of(point, &removed_keys, &previous, &next);
            }
            value.decorations.retain(|d| {
                !point_in(&d.anchor, &removed_keys) && !point_in(&d.focus, &removed_keys)
            });
            refresh_points(value);
        }

        Operation::MoveNode { path, new_path } => {
            value.document.move_node(path, new_path)?;
            refresh_points(value);
        }

        Operation::MergeNode { path, position, .. } => {
            let right = value.document.assert_descendant(path)?;
            let right_text_key = right.as_text().map(|t| t.key.clone());
            let left_key = value.document.assert_descendant(&path.decremented())?.key().clone();

            value.document.merge_node(path)?;

            // Points on the merged text now live in the left node, past
            // its original content.
            if let Some(right_key) = right_text_key {
                for point in all_points(value) {
                    if point.key.as_ref() == Some(&right_key) {
                        point.key = Some(left_key.clone());
                        point.path = None;
                        point.offset += position;
                    }
                }
            }
            refresh_points(value);
        }

        Operation::SplitNode {
            path,
            position,
            properties,
        } => {
            let node = value.document.assert_descendant(path)?;
            let text_key = node.as_text().map(|t| t.key.clone());

            value.document.split_node(path, *position, Some(properties))?;

            // Points past the split offset belong to the new right node.
            if let Some(left_key) = text_key {
                let right_key = value
                    .document
                    .assert_descendant(&path.incremented())?
                    .key()
                    .clone();
                for point in all_points(value) {
                    if point.key.as_ref() == Some(&left_key) && point.offset >= *position {
                        point.key = Some(right_key.clone());
                        point.path = None;
                        point.offset -= position;
                    }
                }
            }
            refresh_points(value);
        }

        Operation::SetNode { path, properties, .. } => {
            if path.is_empty() {
                // The root accepts only data; it has no type or void-ness.
                if let Some(data) = &properties.data {
                    value.document.data = data.clone();
                }
            } else {
                value.document.set_node_properties(path, properties)?;
            }
        }

        Operation::InsertText {
            path,
            offset,
            text,
            marks,
        } => {
            let node = value.document.assert_descendant_mut(path)?;
            let target = node
                .as_text_mut()
                .ok_or_else(|| EditorError::NotText(path.clone()))?;
            let key = target.key.clone();
            let length = text.chars().count();

            target.insert_text(*offset, text, marks.as_deref());

            for point in selection_points(value) {
                point.transform_insert_text(&key, *offset, length, false);
            }
            for point in decoration_points(value) {
                point.transform_insert_text(&key, *offset, length, true);
            }
        }

        Operation::RemoveText {
            path, offset, text, ..
        } => {
            let node = value.document.assert_descendant_mut(path)?;
            let target = node
                .as_text_mut()
                .ok_or_else(|| EditorError::NotText(path.clone()))?;
            let key = target.key.clone();
            let length = text.chars().count();

            target.remove_text(*offset, length);

            for point in all_points(value) {
                point.transform_remove_text(&key, *offset, length);
            }
        }

        Operation::AddMark {
            path,
            offset,
            length,
            mark,
        } => {
            let node = value.document.assert_descendant_mut(path)?;
            let target = node
                .as_text_mut()
                .ok_or_else(|| EditorError::NotText(path.clone()))?;
            target.add_mark(*offset, *length, mark);
        }

        Operation::RemoveMark {
            path,
            offset,
            length,
            mark,
        } => {
            let node = value.document.assert_descendant_mut(path)?;
            let target = node
                .as_text_mut()
                .ok_or_else(|| EditorError::NotText(path.clone()))?;
            target.remove_mark(*offset, *length, mark);
        }

        Operation::SetMark {
            path,
            offset,
            length,
            mark,
            properties,
        } => {
            let node = value.document.assert_descendant_mut(path)?;
            let target = node
                .as_text_mut()
                .ok_or_else(|| EditorError::NotText(path.clone()))?;
            target.set_mark(*offset, *length, mark, properties);
        }

        Operation::SetSelection { properties, .. } => {
            let next = properties.applied_to(&value.selection);
            value.selection = next.normalized(&value.document);
        }

        Operation::SetValue { properties, .. } => {
            properties.apply_to(value);
        }
    }

    Ok(())
}

fn selection_points(value: &mut Value) -> [&mut Point; 2] {
    [&mut value.selection.anchor, &mut value.selection.focus]
}

fn decoration_points(value: &mut Value) -> Vec<&mut Point> {
    value
        .decorations
        .iter_mut()
        .flat_map(|d| [&mut d.anchor, &mut d.focus])
        .collect()
}

fn all_points(value: &mut Value) -> Vec<&mut Point> {
    let mut points = vec![&mut value.selection.anchor, &mut value.selection.focus];
    points.extend(
        value
            .decorations
            .iter_mut()
            .flat_map(|d| [&mut d.anchor, &mut d.focus]),
    );
    points
}

fn point_in(point: &Point, keys: &HashSet<Key>) -> bool {
    point.key.as_ref().map(|k| keys.contains(k)).unwrap_or(false)
}

/// Move a point that was inside a removed subtree to the end of the
/// previous text, the start of the next text, or unset it when the
/// document has nothing left to hold it.
fn relocate_out_of(
    point: &mut Point,
    removed: &HashSet<Key>,
    previous: &Option<(Key, usize)>,
    next: &Option<Key>,
) {
    if !point_in(point, removed) {
        return;
    }
    match (previous, next) {
        (Some((key, len)), _) => {
            point.key = Some(key.clone());
            point.path = None;
            point.offset = *len;
        }
        (None, Some(key)) => {
            point.key = Some(key.clone());
            point.path = None;
            point.offset = 0;
        }
        (None, None) => *point = Point::unset(),
    }
}

/// Re-resolve selection and decoration paths from their keys after a
/// structural change. Decorations that no longer resolve are dropped.
fn refresh_points(value: &mut Value) {
    value.selection = value.selection.normalized(&value.document);
    let refreshed: Vec<Decoration> = value
        .decorations
        .iter()
        .map(|d| d.normalized(&value.document))
        .filter(|d| d.is_set())
        .collect();
    value.decorations = refreshed;
}
