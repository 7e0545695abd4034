use std::rc::Rc;

use crate::count::visible_descendant_count;
use crate::key::NodeKey;
use crate::model::{Children, Key, NodeRef, Row, Tree, TreePath};

/// Node visit passed to [`walk`] callbacks.
pub struct WalkInfo<'a> {
    pub node: &'a NodeRef,
    pub parent: Option<&'a NodeRef>,
    pub path: &'a [Key],
    pub lower_sibling_counts: &'a [usize],
    pub tree_index: usize,
}

/// Visit nodes in pre-order, depth first.
///
/// With `ignore_collapsed`, children of nodes whose `expanded` flag is unset
/// are neither visited nor counted. Unresolved lazy children are never
/// visited. The traversal always covers the whole tree.
pub fn walk<K, F>(tree: &Tree, keys: &K, ignore_collapsed: bool, mut callback: F)
where
    K: NodeKey + ?Sized,
    F: FnMut(&WalkInfo<'_>),
{
    let mut cursor = WalkCursor {
        keys,
        ignore_collapsed,
        path: Vec::new(),
        lower_sibling_counts: Vec::new(),
        next_index: 0,
    };
    cursor.visit_children(tree.roots(), None, &mut callback);
}

struct WalkCursor<'k, K: ?Sized> {
    keys: &'k K,
    ignore_collapsed: bool,
    path: TreePath,
    lower_sibling_counts: Vec<usize>,
    next_index: usize,
}

impl<K: NodeKey + ?Sized> WalkCursor<'_, K> {
    fn visit_children<F>(
        &mut self,
        children: &[NodeRef],
        parent: Option<&NodeRef>,
        callback: &mut F,
    ) where
        F: FnMut(&WalkInfo<'_>),
    {
        let count = children.len();
        for (position, child) in children.iter().enumerate() {
            let tree_index = self.next_index;
            self.next_index += 1;
            self.path.push(self.keys.key(tree_index, child));
            self.lower_sibling_counts.push(count - position - 1);

            callback(&WalkInfo {
                node: child,
                parent,
                path: &self.path,
                lower_sibling_counts: &self.lower_sibling_counts,
                tree_index,
            });

            if let Children::Loaded(grandchildren) = &child.children {
                if child.expanded || !self.ignore_collapsed {
                    self.visit_children(grandchildren, Some(child), callback);
                }
            }

            self.path.pop();
            self.lower_sibling_counts.pop();
        }
    }
}

/// Flatten a tree into a depth-first list of rows.
///
/// Tree indices are dense and zero based in traversal order.
pub fn flatten<K: NodeKey + ?Sized>(
    tree: &Tree,
    keys: &K,
    ignore_collapsed: bool,
) -> Vec<Row> {
    let mut rows = Vec::new();
    walk(tree, keys, ignore_collapsed, |info| {
        rows.push(Row {
            node: Rc::clone(info.node),
            parent: info.parent.map(Rc::downgrade),
            path: info.path.to_vec(),
            lower_sibling_counts: info.lower_sibling_counts.to_vec(),
            tree_index: info.tree_index,
        });
    });
    rows
}

/// Number of rows visible with the current expansion state.
pub fn visible_node_count(tree: &Tree) -> usize {
    tree.roots()
        .iter()
        .map(|root| 1 + visible_descendant_count(root))
        .sum()
}

/// Visible row at `tree_index`, if any.
pub fn node_at_tree_index<K: NodeKey + ?Sized>(
    tree: &Tree,
    tree_index: usize,
    keys: &K,
) -> Option<Row> {
    let mut found = None;
    walk(tree, keys, true, |info| {
        if info.tree_index == tree_index {
            found = Some(Row {
                node: Rc::clone(info.node),
                parent: info.parent.map(Rc::downgrade),
                path: info.path.to_vec(),
                lower_sibling_counts: info.lower_sibling_counts.to_vec(),
                tree_index: info.tree_index,
            });
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_tree, title};
    use crate::key::TreeIndexKey;
    use crate::lazy::LazyChildren;
    use crate::model::Node;

    #[test]
    fn given_expanded_tree_when_flattened_then_rows_match_scaffolding() {
        let rows = flatten(&sample_tree(), &TreeIndexKey, true);

        let summary: Vec<(String, usize, Vec<usize>)> = rows
            .iter()
            .map(|row| {
                (title(&row.node), row.tree_index, row.lower_sibling_counts.clone())
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (String::from("A"), 0, vec![1]),
                (String::from("B"), 1, vec![0, 1]),
                (String::from("C"), 2, vec![0, 0]),
                (String::from("D"), 3, vec![0]),
            ]
        );
        assert_eq!(rows[2].path, vec![Key::Index(0), Key::Index(2)]);
        assert_eq!(rows[2].depth(), 1);
    }

    #[test]
    fn given_collapsed_node_when_flattened_then_children_are_skipped() {
        let tree = Tree::new(vec![
            Node::new("A").with_children(vec![Node::new("B")]),
            Node::new("C"),
        ]);

        let visible = flatten(&tree, &TreeIndexKey, true);
        let all = flatten(&tree, &TreeIndexKey, false);

        assert_eq!(visible.len(), 2);
        assert_eq!(visible[1].tree_index, 1);
        assert_eq!(all.len(), 3);
        assert_eq!(title(&all[1].node), "B");
    }

    #[test]
    fn given_any_tree_when_flattened_then_tree_indices_are_dense() {
        let tree = Tree::new(vec![
            Node::new("A").with_expanded(true).with_children(vec![
                Node::new("B").with_children(vec![Node::new("hidden")]),
                Node::new("C")
                    .with_expanded(true)
                    .with_children(vec![Node::new("E"), Node::new("F")]),
            ]),
            Node::new("D"),
        ]);

        let rows = flatten(&tree, &TreeIndexKey, true);
        let indices: Vec<usize> = rows.iter().map(|row| row.tree_index).collect();

        assert_eq!(indices, (0..rows.len()).collect::<Vec<_>>());
        assert_eq!(rows.len(), visible_node_count(&tree));
    }

    #[test]
    fn given_lazy_children_when_walked_then_provider_is_not_traversed() {
        let tree = Tree::new(vec![
            Node::new("A")
                .with_expanded(true)
                .with_lazy_children(LazyChildren::new(|_request| {})),
        ]);

        let rows = flatten(&tree, &TreeIndexKey, false);

        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn given_child_row_when_parent_requested_then_weak_parent_resolves() {
        let tree = sample_tree();
        let rows = flatten(&tree, &TreeIndexKey, true);

        let parent = rows[1].parent_node().unwrap();

        assert!(Rc::ptr_eq(&parent, &tree.roots()[0]));
        assert!(rows[0].parent_node().is_none());
    }

    #[test]
    fn given_tree_index_when_looked_up_then_visible_row_is_returned() {
        let tree = sample_tree();

        let row = node_at_tree_index(&tree, 2, &TreeIndexKey).unwrap();

        assert_eq!(title(&row.node), "C");
        assert!(node_at_tree_index(&tree, 4, &TreeIndexKey).is_none());
    }
}
