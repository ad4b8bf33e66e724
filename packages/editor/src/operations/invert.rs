//! Operation inversion.
//!
//! For every operation `op` except the `set_*` kinds,
//! `apply(apply(v, op), invert(op)) == v`. The `set_*` kinds satisfy the
//! same equation through the previous property values they captured at
//! creation time.

use super::Operation;

/// Build the operation that exactly undoes `op`.
pub fn invert_operation(op: &Operation) -> Operation {
    match op {
        Operation::InsertNode { path, node } => Operation::RemoveNode {
            path: path.clone(),
            node: node.clone(),
        },

        Operation::RemoveNode { path, node } => Operation::InsertNode {
            path: path.clone(),
            node: node.clone(),
        },

        Operation::MoveNode { path, new_path } => {
            let mut inverse_path = new_path.clone();
            let mut inverse_new_path = path.clone();

            let path_last = path.len() - 1;
            let new_path_last = new_path.len() - 1;

            // If the node's old position was a left sibling of an
            // ancestor of its new position, the ancestor's index lost
            // one when the node moved out from under it.
            if path.len() < inverse_path.len()
                && path.shares_prefix(&inverse_path, path_last)
                && path.get(path_last) < inverse_path.get(path_last)
            {
                let index = inverse_path.get(path_last).unwrap_or(0) - 1;
                inverse_path = inverse_path.with_index_at(path_last, index);
            }

            // If the node's new position is an ancestor of the old
            // position, or a left sibling of one, the old position's
            // index gains one when the node moves back out.
            if new_path.len() < inverse_new_path.len()
                && new_path.shares_prefix(&inverse_new_path, new_path_last)
                && new_path.get(new_path_last) <= inverse_new_path.get(new_path_last)
            {
                let index = inverse_new_path.get(new_path_last).unwrap_or(0) + 1;
                inverse_new_path = inverse_new_path.with_index_at(new_path_last, index);
            }

            Operation::MoveNode {
                path: inverse_path,
                new_path: inverse_new_path,
            }
        }

        Operation::MergeNode {
            path,
            position,
            properties,
        } => Operation::SplitNode {
            path: path.decremented(),
            position: *position,
            properties: properties.clone(),
        },

        Operation::SplitNode {
            path,
            position,
            properties,
        } => Operation::MergeNode {
            path: path.incremented(),
            position: *position,
            properties: properties.clone(),
        },

        Operation::SetNode {
            path,
            properties,
            previous,
        } => Operation::SetNode {
            path: path.clone(),
            properties: previous.clone(),
            previous: properties.clone(),
        },

        Operation::InsertText {
            path,
            offset,
            text,
            marks,
        } => Operation::RemoveText {
            path: path.clone(),
            offset: *offset,
            text: text.clone(),
            marks: marks.clone(),
        },

        Operation::RemoveText {
            path,
            offset,
            text,
            marks,
        } => Operation::InsertText {
            path: path.clone(),
            offset: *offset,
            text: text.clone(),
            marks: marks.clone(),
        },

        Operation::AddMark {
            path,
            offset,
            length,
            mark,
        } => Operation::RemoveMark {
            path: path.clone(),
            offset: *offset,
            length: *length,
            mark: mark.clone(),
        },

        Operation::RemoveMark {
            path,
            offset,
            length,
            mark,
        } => Operation::AddMark {
            path: path.clone(),
            offset: *offset,
            length: *length,
            mark: mark.clone(),
        },

        Operation::SetMark {
            path,
            offset,
            length,
            mark,
            properties,
        } => Operation::SetMark {
            path: path.clone(),
            offset: *offset,
            length: *length,
            mark: properties.applied_to(mark),
            properties: properties.captured_from(mark),
        },

        Operation::SetSelection {
            properties,
            previous,
        } => Operation::SetSelection {
            properties: previous.clone(),
            previous: properties.clone(),
        },

        Operation::SetValue {
            properties,
            previous,
        } => Operation::SetValue {
            properties: previous.clone(),
            previous: properties.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::Path;

    fn move_op(path: Vec<usize>, new_path: Vec<usize>) -> Operation {
        Operation::MoveNode {
            path: Path::new(path),
            new_path: Path::new(new_path),
        }
    }

    #[test]
    fn test_invert_move_between_unrelated_parents() {
        let inverse = invert_operation(&move_op(vec![0, 1], vec![2, 0]));
        assert_eq!(inverse, move_op(vec![2, 0], vec![0, 1]));
    }

    #[test]
    fn test_invert_move_to_left_sibling_of_ancestor() {
        // Moving [1] under [0]: after removal the destination keeps its
        // index, but moving back out must account for [1] reappearing.
        let inverse = invert_operation(&move_op(vec![1], vec![0, 0]));
        assert_eq!(inverse, move_op(vec![0, 0], vec![1]));
    }

    #[test]
    fn test_invert_move_when_source_precedes_destination_ancestor() {
        // Node at [0] moved into the subtree of its right sibling: the
        // sibling's index shrinks by one once [0] is gone.
        let inverse = invert_operation(&move_op(vec![0], vec![2, 1]));
        assert_eq!(inverse, move_op(vec![1, 1], vec![0]));
    }

    #[test]
    fn test_invert_move_when_destination_precedes_source_ancestor() {
        // Node pulled out of [2, 1] to [1]: moving it back in, the old
        // ancestor [2] sits one index later while the node is out front.
        let inverse = invert_operation(&move_op(vec![2, 1], vec![1]));
        assert_eq!(inverse, move_op(vec![1], vec![3, 1]));
    }

    #[test]
    fn test_split_and_merge_are_path_inverses() {
        let split = Operation::SplitNode {
            path: Path::new(vec![0, 1]),
            position: 2,
            properties: Default::default(),
        };

        let merged = invert_operation(&split);
        assert_eq!(
            merged,
            Operation::MergeNode {
                path: Path::new(vec![0, 2]),
                position: 2,
                properties: Default::default(),
            }
        );

        assert_eq!(invert_operation(&merged), split);
    }
}
