use std::rc::Rc;

use crate::count::visible_descendant_count;
use crate::errors::TreeError;
use crate::key::NodeKey;
use crate::model::{Children, Key, Node, NodeRef, Tree};
use crate::walk::{visible_node_count, walk};

/// Result of [`remove_node`].
#[derive(Debug, Clone)]
pub struct RemovedNode {
    pub tree: Tree,
    pub node: NodeRef,
    /// Tree index the node held before removal.
    pub tree_index: usize,
}

/// Result of [`add_node_under_parent`].
#[derive(Debug, Clone)]
pub struct AddedNode {
    pub tree: Tree,
    pub tree_index: usize,
}

/// Replace the node at `path` with the result of `update`.
///
/// Only the nodes from the root down to the target are rebuilt; every other
/// subtree of the returned tree is pointer-equal to the one in `tree`.
/// `update` receives the current node and its tree index.
pub fn change_node_at_path<K, F>(
    tree: &Tree,
    path: &[Key],
    keys: &K,
    update: F,
) -> Result<Tree, TreeError>
where
    K: NodeKey + ?Sized,
    F: FnOnce(&NodeRef, usize) -> NodeRef,
{
    edit_at_path(tree, path, keys, |node, tree_index| {
        Some(update(node, tree_index))
    })
}

/// Remove the node at `path` from its parent (or from the roots).
pub fn remove_node<K: NodeKey + ?Sized>(
    tree: &Tree,
    path: &[Key],
    keys: &K,
) -> Result<RemovedNode, TreeError> {
    let mut removed = None;
    let next = edit_at_path(tree, path, keys, |node, tree_index| {
        removed = Some((Rc::clone(node), tree_index));
        None
    })?;
    let (node, tree_index) =
        removed.ok_or_else(|| TreeError::path_not_found(path))?;
    Ok(RemovedNode {
        tree: next,
        node,
        tree_index,
    })
}

/// Look up the node at `path` and its tree index.
pub fn node_at_path<K: NodeKey + ?Sized>(
    tree: &Tree,
    path: &[Key],
    keys: &K,
) -> Result<(NodeRef, usize), TreeError> {
    let mut siblings = tree.roots();
    let mut first_index = 0;
    let mut found = None;

    for (level, key) in path.iter().enumerate() {
        let (node, tree_index) = find_child(siblings, first_index, key, keys)
            .ok_or_else(|| TreeError::path_not_found(path))?;
        if level + 1 < path.len() {
            siblings = match &node.children {
                Children::Loaded(children) => children,
                Children::Lazy(_) => {
                    return Err(TreeError::path_not_found(path));
                },
            };
            first_index = tree_index + 1;
        }
        found = Some((Rc::clone(node), tree_index));
    }

    found.ok_or_else(|| TreeError::path_not_found(path))
}

/// Add `node` as the last (or first) child of the visible node keyed
/// `parent_key`, or at root level when no parent is given.
pub fn add_node_under_parent<K: NodeKey + ?Sized>(
    tree: &Tree,
    node: NodeRef,
    parent_key: Option<&Key>,
    expand_parent: bool,
    add_as_first_child: bool,
    keys: &K,
) -> Result<AddedNode, TreeError> {
    let Some(parent_key) = parent_key else {
        let mut roots = tree.roots().to_vec();
        let tree_index = if add_as_first_child {
            roots.insert(0, node);
            0
        } else {
            let tree_index = visible_node_count(tree);
            roots.push(node);
            tree_index
        };
        return Ok(AddedNode {
            tree: Tree::from_refs(roots),
            tree_index,
        });
    };

    let mut parent = None;
    walk(tree, keys, true, |info| {
        if parent.is_none() && info.path.last() == Some(parent_key) {
            parent = Some((Rc::clone(info.node), info.path.to_vec(), info.tree_index));
        }
    });
    let Some((parent_node, parent_path, parent_index)) = parent else {
        return Err(TreeError::path_not_found(std::slice::from_ref(parent_key)));
    };
    let Children::Loaded(children) = &parent_node.children else {
        return Err(TreeError::lazy_children(&parent_path));
    };

    let tree_index = if add_as_first_child {
        parent_index + 1
    } else {
        parent_index
            + 1
            + children
                .iter()
                .map(|child| 1 + visible_descendant_count(child))
                .sum::<usize>()
    };
    let next = change_node_at_path(tree, &parent_path, keys, |current, _| {
        let mut children = current.children.loaded().unwrap_or_default().to_vec();
        if add_as_first_child {
            children.insert(0, node);
        } else {
            children.push(node);
        }
        let mut next = current.with_loaded_children(children);
        if expand_parent {
            next.expanded = true;
        }
        Rc::new(next)
    })?;

    Ok(AddedNode {
        tree: next,
        tree_index,
    })
}

/// Set `expanded` on every node that has children (loaded or lazy).
///
/// Leaves are left untouched and unchanged subtrees keep their identity.
pub fn toggle_expanded_for_all(tree: &Tree, expanded: bool) -> Tree {
    match set_expanded_among(tree.roots(), expanded) {
        Some(roots) => Tree::from_refs(roots),
        None => tree.clone(),
    }
}

fn set_expanded_among(nodes: &[NodeRef], expanded: bool) -> Option<Vec<NodeRef>> {
    let mut changed = false;
    let next = nodes
        .iter()
        .map(|node| match set_expanded(node, expanded) {
            Some(next) => {
                changed = true;
                next
            },
            None => Rc::clone(node),
        })
        .collect();
    changed.then_some(next)
}

fn set_expanded(node: &NodeRef, expanded: bool) -> Option<NodeRef> {
    let children = match &node.children {
        Children::Loaded(children) => set_expanded_among(children, expanded),
        Children::Lazy(_) => None,
    };
    let is_parent = node.children.is_present();
    if children.is_none() && (!is_parent || node.expanded == expanded) {
        return None;
    }

    let mut next = match children {
        Some(children) => node.with_loaded_children(children),
        None => Node::clone(node),
    };
    if is_parent {
        next.expanded = expanded;
    }
    Some(Rc::new(next))
}

/// Rebuild the spine to `path`, letting `edit` replace (`Some`) or drop
/// (`None`) the target node.
pub(crate) fn edit_at_path<K, F>(
    tree: &Tree,
    path: &[Key],
    keys: &K,
    edit: F,
) -> Result<Tree, TreeError>
where
    K: NodeKey + ?Sized,
    F: FnOnce(&NodeRef, usize) -> Option<NodeRef>,
{
    let mut edit = Some(edit);
    edit_among(tree.roots(), 0, path, keys, &mut edit)
        .map(Tree::from_refs)
        .ok_or_else(|| TreeError::path_not_found(path))
}

fn edit_among<K, F>(
    siblings: &[NodeRef],
    first_index: usize,
    path: &[Key],
    keys: &K,
    edit: &mut Option<F>,
) -> Option<Vec<NodeRef>>
where
    K: NodeKey + ?Sized,
    F: FnOnce(&NodeRef, usize) -> Option<NodeRef>,
{
    let (head, tail) = path.split_first()?;
    let mut tree_index = first_index;

    for (position, node) in siblings.iter().enumerate() {
        if keys.key(tree_index, node) == *head {
            let replacement = if tail.is_empty() {
                edit.take().map(|edit| edit(node, tree_index))
            } else {
                match &node.children {
                    Children::Loaded(children) => {
                        edit_among(children, tree_index + 1, tail, keys, edit)
                            .map(|children| {
                                Some(Rc::new(node.with_loaded_children(children)))
                            })
                    },
                    Children::Lazy(_) => None,
                }
            };

            if let Some(replacement) = replacement {
                let mut next = siblings.to_vec();
                match replacement {
                    Some(replacement) => next[position] = replacement,
                    None => {
                        next.remove(position);
                    },
                }
                return Some(next);
            }
        }
        tree_index += 1 + visible_descendant_count(node);
    }

    None
}

fn find_child<'a, K: NodeKey + ?Sized>(
    siblings: &'a [NodeRef],
    first_index: usize,
    key: &Key,
    keys: &K,
) -> Option<(&'a NodeRef, usize)> {
    let mut tree_index = first_index;
    for node in siblings {
        if keys.key(tree_index, node) == *key {
            return Some((node, tree_index));
        }
        tree_index += 1 + visible_descendant_count(node);
    }
    None
}
