use std::rc::Rc;

use crate::count::visible_descendant_count;
use crate::errors::TreeError;
use crate::key::NodeKey;
use crate::model::{Children, Key, Node, NodeRef, Tree, TreePath};
use crate::walk::{visible_node_count, walk};

/// Requested position of an inserted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Target depth (`0` places the node among the roots).
    pub depth: usize,
    /// The node lands at the first valid visible position at or after this
    /// tree index.
    pub minimum_tree_index: usize,
}

impl Placement {
    pub fn new(depth: usize, minimum_tree_index: usize) -> Self {
        Self {
            depth,
            minimum_tree_index,
        }
    }
}

/// Result of [`insert_node`].
#[derive(Debug, Clone)]
pub struct InsertedNode {
    pub tree: Tree,
    /// Visible position of the inserted node.
    pub tree_index: usize,
    /// Key path of the inserted node.
    pub path: TreePath,
    /// New parent, `None` at root level.
    pub parent: Option<NodeRef>,
}

/// Insert `node` at the first visible position at or after
/// `placement.minimum_tree_index` that admits a child at `placement.depth`.
///
/// Placements that cannot be honoured are clamped instead of rejected: a
/// too-large index appends after the last eligible ancestor, and a depth no
/// visible ancestor can host is retried at shallower depths down to the
/// root level. The only failure is an insertion that lands on a node whose
/// children are still lazy.
pub fn insert_node<K: NodeKey + ?Sized>(
    tree: &Tree,
    node: NodeRef,
    placement: Placement,
    expand_parent: bool,
    keys: &K,
) -> Result<InsertedNode, TreeError> {
    let pseudo_root = Rc::new(Node {
        children: Children::Loaded(tree.roots().to_vec()),
        ..Node::default()
    });

    // No visited node sits deeper than the deepest visible row, so every
    // depth past one level below it behaves the same.
    let deepest = placement.depth.min(visible_levels(tree, keys) + 1);
    for depth in (0..=deepest).rev() {
        let inserter = Inserter {
            keys,
            new_node: &node,
            target_depth: depth,
            minimum: placement.minimum_tree_index,
            expand_parent,
        };
        let Visit::Inserted(insertion) =
            inserter.visit(&pseudo_root, true, true, 0, 0, &[])?
        else {
            continue;
        };

        if depth != placement.depth {
            log::debug!(
                "no ancestor at depth {} after row {}, placed at depth {depth}",
                placement.depth,
                placement.minimum_tree_index
            );
        }
        let roots = insertion
            .node
            .children
            .loaded()
            .map(<[NodeRef]>::to_vec)
            .unwrap_or_default();
        let mut path = insertion.parent_path;
        path.push(keys.key(insertion.tree_index, &node));
        return Ok(InsertedNode {
            tree: Tree::from_refs(roots),
            tree_index: insertion.tree_index,
            path,
            parent: insertion.parent,
        });
    }

    // Root level always has room; kept total for odd resolvers.
    let tree_index = visible_node_count(tree);
    let path = vec![keys.key(tree_index, &node)];
    let mut roots = tree.roots().to_vec();
    roots.push(node);
    Ok(InsertedNode {
        tree: Tree::from_refs(roots),
        tree_index,
        path,
        parent: None,
    })
}

/// Depth of the deepest visible row plus one, `0` for an empty tree.
fn visible_levels<K: NodeKey + ?Sized>(tree: &Tree, keys: &K) -> usize {
    let mut levels = 0;
    walk(tree, keys, true, |info| levels = levels.max(info.path.len()));
    levels
}

enum Visit {
    /// Nothing inserted in this subtree; scanning resumes at `next_index`.
    Passed { next_index: usize },
    Inserted(Insertion),
}

struct Insertion {
    /// Rebuilt visited node.
    node: NodeRef,
    tree_index: usize,
    /// Path of the new parent, starting at the visited node.
    parent_path: TreePath,
    parent: Option<NodeRef>,
}

struct Inserter<'a, K: ?Sized> {
    keys: &'a K,
    new_node: &'a NodeRef,
    target_depth: usize,
    minimum: usize,
    expand_parent: bool,
}

impl<K: NodeKey + ?Sized> Inserter<'_, K> {
    /// `position` is the tree index of the visited node plus one (the index
    /// its first child would get) and `level` its depth plus one; the
    /// pseudo root sits at position and level `0`.
    fn visit(
        &self,
        node: &NodeRef,
        is_pseudo_root: bool,
        is_last_child: bool,
        position: usize,
        level: usize,
        prefix: &[Key],
    ) -> Result<Visit, TreeError> {
        let mut own_path = prefix.to_vec();
        own_path.extend(self.self_key(node, is_pseudo_root, position));

        // First child of this node is the earliest admissible spot.
        if position >= self.minimum
            || (is_last_child && !node.children.is_present())
        {
            let Children::Loaded(children) = &node.children else {
                return Err(TreeError::lazy_children(&own_path));
            };
            let mut next_children = Vec::with_capacity(children.len() + 1);
            next_children.push(Rc::clone(self.new_node));
            next_children.extend(children.iter().cloned());

            let mut next = node.with_loaded_children(next_children);
            if self.expand_parent {
                next.expanded = true;
            }
            return Ok(Visit::Inserted(self.inserted(
                Rc::new(next),
                is_pseudo_root,
                position,
                position,
                TreePath::new(),
            )));
        }

        let children = match &node.children {
            Children::Loaded(children) if node.expanded || is_pseudo_root => {
                children
            },
            _ => return Ok(Visit::Passed { next_index: position }),
        };

        if level >= self.target_depth {
            let mut child_index = position;
            let mut insert_at = None;
            for (slot, child) in children.iter().enumerate() {
                if child_index >= self.minimum {
                    insert_at = Some(slot);
                    break;
                }
                child_index += 1 + visible_descendant_count(child);
            }
            let insert_at = match insert_at {
                Some(slot) => slot,
                None if child_index < self.minimum && !is_last_child => {
                    return Ok(Visit::Passed {
                        next_index: child_index,
                    });
                },
                None => children.len(),
            };

            let mut next_children = children.clone();
            next_children.insert(insert_at, Rc::clone(self.new_node));
            return Ok(Visit::Inserted(self.inserted(
                Rc::new(node.with_loaded_children(next_children)),
                is_pseudo_root,
                position,
                child_index,
                TreePath::new(),
            )));
        }

        let mut child_index = position;
        let mut next_children = Vec::with_capacity(children.len());
        let mut found = None;
        for (slot, child) in children.iter().enumerate() {
            if found.is_some() {
                next_children.push(Rc::clone(child));
                continue;
            }
            let visit = self.visit(
                child,
                false,
                is_last_child && slot + 1 == children.len(),
                child_index + 1,
                level + 1,
                &own_path,
            )?;
            match visit {
                Visit::Passed { next_index } => {
                    child_index = next_index;
                    next_children.push(Rc::clone(child));
                },
                Visit::Inserted(insertion) => {
                    next_children.push(insertion.node);
                    found = Some((
                        insertion.tree_index,
                        insertion.parent_path,
                        insertion.parent,
                    ));
                },
            }
        }

        let Some((tree_index, fragment, parent)) = found else {
            return Ok(Visit::Passed {
                next_index: child_index,
            });
        };
        let next = Rc::new(node.with_loaded_children(next_children));
        let mut insertion =
            self.inserted(next, is_pseudo_root, position, tree_index, fragment);
        // The parent is deeper than this node.
        insertion.parent = parent;
        Ok(Visit::Inserted(insertion))
    }

    fn inserted(
        &self,
        node: NodeRef,
        is_pseudo_root: bool,
        position: usize,
        tree_index: usize,
        fragment: TreePath,
    ) -> Insertion {
        let mut parent_path: TreePath =
            self.self_key(&node, is_pseudo_root, position).into_iter().collect();
        parent_path.extend(fragment);
        Insertion {
            parent: (!is_pseudo_root).then(|| Rc::clone(&node)),
            node,
            tree_index,
            parent_path,
        }
    }

    fn self_key(
        &self,
        node: &Node,
        is_pseudo_root: bool,
        position: usize,
    ) -> Option<Key> {
        (!is_pseudo_root).then(|| self.keys.key(position - 1, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_tree, title, titles};
    use crate::key::TreeIndexKey;
    use crate::lazy::LazyChildren;
    use crate::mutate::remove_node;
    use crate::walk::flatten;

    fn insert(tree: &Tree, depth: usize, minimum: usize) -> InsertedNode {
        insert_node(
            tree,
            Node::new("N").into_ref(),
            Placement::new(depth, minimum),
            true,
            &TreeIndexKey,
        )
        .unwrap()
    }

    fn visible(tree: &Tree) -> Vec<String> {
        titles(&flatten(tree, &TreeIndexKey, true))
    }

    #[test]
    fn given_removed_node_when_reinserted_at_old_index_then_tree_is_restored() {
        let tree = sample_tree();
        let path = vec![Key::Index(0), Key::Index(1)];
        let removed = remove_node(&tree, &path, &TreeIndexKey).unwrap();

        let restored = insert_node(
            &removed.tree,
            removed.node,
            Placement::new(path.len() - 1, removed.tree_index),
            false,
            &TreeIndexKey,
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&restored.tree).unwrap(),
            serde_json::to_value(&tree).unwrap()
        );
        assert_eq!(restored.tree_index, 1);
        assert_eq!(restored.path, path);
        assert_eq!(title(restored.parent.as_ref().unwrap()), "A");
    }

    #[test]
    fn given_root_depth_when_inserted_then_node_lands_between_roots() {
        let tree = sample_tree();

        let inserted = insert(&tree, 0, 1);

        assert_eq!(visible(&inserted.tree), vec!["A", "B", "C", "N", "D"]);
        assert_eq!(inserted.tree_index, 3);
        assert_eq!(inserted.path, vec![Key::Index(3)]);
        assert!(inserted.parent.is_none());
        assert!(Rc::ptr_eq(&inserted.tree.roots()[0], &tree.roots()[0]));
        assert!(Rc::ptr_eq(&inserted.tree.roots()[2], &tree.roots()[1]));
    }

    #[test]
    fn given_index_past_the_end_when_inserted_then_node_is_appended() {
        let tree = sample_tree();

        let inserted = insert(&tree, 0, 99);

        assert_eq!(visible(&inserted.tree), vec!["A", "B", "C", "D", "N"]);
        assert_eq!(inserted.tree_index, 4);
    }

    #[test]
    fn given_child_depth_when_inserted_then_node_joins_siblings() {
        let tree = sample_tree();

        let inserted = insert(&tree, 1, 2);

        assert_eq!(visible(&inserted.tree), vec!["A", "B", "N", "C", "D"]);
        assert_eq!(inserted.tree_index, 2);
        assert_eq!(inserted.path, vec![Key::Index(0), Key::Index(2)]);
        assert!(Rc::ptr_eq(&inserted.tree.roots()[1], &tree.roots()[1]));
    }

    #[test]
    fn given_too_deep_placement_when_inserted_then_nearest_ancestor_hosts_node() {
        let tree = sample_tree();

        let inserted = insert(&tree, 3, 4);

        assert_eq!(visible(&inserted.tree), vec!["A", "B", "C", "D", "N"]);
        assert_eq!(inserted.path, vec![Key::Index(3), Key::Index(4)]);
        assert_eq!(title(inserted.parent.as_ref().unwrap()), "D");
        assert!(inserted.tree.roots()[1].expanded);
    }

    #[test]
    fn given_only_collapsed_ancestors_when_inserted_then_depth_falls_back_to_root() {
        let tree = Tree::new(vec![
            Node::new("A").with_children(vec![Node::new("B")]),
        ]);

        let inserted = insert(&tree, 1, 5);

        assert_eq!(visible(&inserted.tree), vec!["A", "N"]);
        assert_eq!(inserted.tree_index, 1);
        assert!(inserted.parent.is_none());
    }

    #[test]
    fn given_unbounded_depth_when_inserted_then_depth_is_clamped_to_root() {
        let tree = Tree::new(vec![
            Node::new("A").with_children(vec![Node::new("B")]),
        ]);

        let inserted = insert(&tree, usize::MAX, 5);

        assert_eq!(visible(&inserted.tree), vec!["A", "N"]);
        assert_eq!(inserted.tree_index, 1);
        assert_eq!(inserted.path, vec![Key::Index(1)]);
        assert!(inserted.parent.is_none());
    }

    #[test]
    fn given_unbounded_depth_when_inserted_then_deepest_visible_row_hosts_node() {
        let tree = sample_tree();

        let inserted = insert(&tree, usize::MAX, 2);

        assert_eq!(visible(&inserted.tree), vec!["A", "B", "N", "C", "D"]);
        assert_eq!(
            inserted.path,
            vec![Key::Index(0), Key::Index(1), Key::Index(2)]
        );
        assert_eq!(title(inserted.parent.as_ref().unwrap()), "B");
    }

    #[test]
    fn given_empty_tree_when_inserted_then_node_becomes_only_root() {
        let inserted = insert(&Tree::default(), 2, 0);

        assert_eq!(visible(&inserted.tree), vec!["N"]);
        assert_eq!(inserted.tree_index, 0);
        assert_eq!(inserted.path, vec![Key::Index(0)]);
    }

    #[test]
    fn given_lazy_target_when_inserted_then_error_is_returned() {
        let tree = Tree::new(vec![
            Node::new("A")
                .with_expanded(true)
                .with_lazy_children(LazyChildren::new(|_request| {})),
        ]);

        let result = insert_node(
            &tree,
            Node::new("N").into_ref(),
            Placement::new(1, 1),
            true,
            &TreeIndexKey,
        );

        assert!(matches!(result, Err(TreeError::LazyChildren { .. })));
    }

    #[test]
    fn given_leaf_target_without_expand_when_inserted_then_parent_stays_collapsed() {
        let tree = Tree::new(vec![Node::new("A"), Node::new("D")]);

        let inserted = insert_node(
            &tree,
            Node::new("N").into_ref(),
            Placement::new(1, 1),
            false,
            &TreeIndexKey,
        )
        .unwrap();

        assert_eq!(visible(&inserted.tree), vec!["A", "D"]);
        assert_eq!(inserted.path, vec![Key::Index(0), Key::Index(1)]);
        assert!(!inserted.tree.roots()[0].expanded);
    }
}
