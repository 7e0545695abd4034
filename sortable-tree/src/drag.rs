use std::rc::Rc;

use crate::count::depth_of;
use crate::errors::TreeError;
use crate::insert::{InsertedNode, Placement};
use crate::key::NodeKey;
use crate::memo::MemoCache;
use crate::model::{Key, Node, NodeRef, Row, Tree, TreePath};
use crate::mutate::{change_node_at_path, node_at_path, remove_node};
use crate::slide::slide_rows;

/// Where the dragged node came from.
#[derive(Debug, Clone)]
pub enum DragSource {
    /// Picked up from this tree.
    Internal {
        path: TreePath,
        tree_index: usize,
        parent: Option<NodeRef>,
    },
    /// Dragged in from outside the tree.
    External,
}

/// Arguments handed to a drop veto.
#[derive(Debug)]
pub struct CanDropParams<'a> {
    pub node: &'a NodeRef,
    pub prev_path: Option<&'a [Key]>,
    pub prev_parent: Option<&'a NodeRef>,
    pub prev_tree_index: Option<usize>,
    pub next_path: &'a [Key],
    pub next_parent: Option<&'a NodeRef>,
    pub next_tree_index: usize,
}

/// Outcome of a finished drag, reported to the host.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub tree: Tree,
    pub node: NodeRef,
    pub prev_path: Option<TreePath>,
    pub prev_tree_index: Option<usize>,
    /// `None` when the node left the tree.
    pub next_path: Option<TreePath>,
    pub next_tree_index: Option<usize>,
    pub next_parent: Option<NodeRef>,
}

/// Placeholder rows rendered while hovering.
#[derive(Debug, Clone)]
pub struct DragPreview {
    pub rows: Vec<Row>,
    /// Visible position of the dragged block inside `rows`.
    pub swap_from: usize,
    /// Number of rows the dragged block spans.
    pub swap_length: usize,
    pub swap_depth: usize,
}

/// Depth a dragged node may land at under `max_depth`.
pub fn clamp_depth(depth: usize, max_depth: Option<usize>, node: &Node) -> usize {
    match max_depth {
        Some(max_depth) => {
            depth.min(max_depth.saturating_sub(depth_of(node) + 1))
        },
        None => depth,
    }
}

// ---------------------------------------------------------------------------
// Drag Session
// ---------------------------------------------------------------------------

/// In-flight drag.
///
/// `snapshot` is the tree when the drag started; `base` is the snapshot
/// without the dragged node plus every parent expanded by hovering. Hovers
/// only ever touch `base`, so cancelling restores the snapshot untouched.
#[derive(Debug, Clone)]
pub struct DragSession {
    node: NodeRef,
    source: DragSource,
    snapshot: Tree,
    base: Tree,
    placement: Option<Placement>,
}

impl DragSession {
    /// Pick up the node at `path`.
    pub fn start<K: NodeKey + ?Sized>(
        tree: &Tree,
        path: &[Key],
        keys: &K,
    ) -> Result<Self, TreeError> {
        let removed = remove_node(tree, path, keys)?;
        let parent = match path.split_last() {
            Some((_, parent_path)) if !parent_path.is_empty() => {
                Some(node_at_path(tree, parent_path, keys)?.0)
            },
            _ => None,
        };

        Ok(Self {
            node: removed.node,
            source: DragSource::Internal {
                path: path.to_vec(),
                tree_index: removed.tree_index,
                parent,
            },
            snapshot: tree.clone(),
            base: removed.tree,
            placement: Some(Placement::new(
                path.len().saturating_sub(1),
                removed.tree_index,
            )),
        })
    }

    /// Track a node dragged in from another tree.
    pub fn external(tree: &Tree, node: NodeRef) -> Self {
        Self {
            node,
            source: DragSource::External,
            snapshot: tree.clone(),
            base: tree.clone(),
            placement: None,
        }
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn source(&self) -> &DragSource {
        &self.source
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// Tree the node will be inserted into on drop.
    pub fn base(&self) -> &Tree {
        &self.base
    }

    /// Tree before the drag started.
    pub fn snapshot(&self) -> &Tree {
        &self.snapshot
    }

    /// Move the placeholder. Returns `false` when the placement did not
    /// change and nothing was recomputed.
    pub fn hover<K: NodeKey + ?Sized>(
        &mut self,
        placement: Placement,
        keys: &K,
        memo: &MemoCache,
    ) -> Result<bool, TreeError> {
        if self.placement == Some(placement) {
            return Ok(false);
        }

        let added = self.target(placement, keys, memo)?;
        let rows = memo.flatten(&added.tree, keys, true);
        let parent_path = rows
            .get(added.tree_index)
            .and_then(|row| row.path.split_last())
            .map(|(_, parent_path)| parent_path.to_vec())
            .unwrap_or_default();

        if !parent_path.is_empty() {
            let (parent, _) = node_at_path(&self.base, &parent_path, keys)?;
            if !parent.expanded {
                self.base =
                    change_node_at_path(&self.base, &parent_path, keys, |node, _| {
                        Rc::new(Node::clone(node).with_expanded(true))
                    })?;
            }
        }
        self.placement = Some(placement);
        Ok(true)
    }

    /// Insert the dragged node into the base tree, without committing.
    pub fn target<K: NodeKey + ?Sized>(
        &self,
        placement: Placement,
        keys: &K,
        memo: &MemoCache,
    ) -> Result<InsertedNode, TreeError> {
        memo.insert_node(&self.base, &self.node, placement, true, keys)
    }

    /// Rows with the placeholder slid into the hovered position, or `None`
    /// before the first hover of an external drag.
    pub fn preview<K: NodeKey + ?Sized>(
        &self,
        keys: &K,
        memo: &MemoCache,
    ) -> Result<Option<DragPreview>, TreeError> {
        let Some(placement) = self.placement else {
            return Ok(None);
        };
        let added = self.target(placement, keys, memo)?;
        let swap_length = 1 + memo.descendant_count(&self.node, true);
        let rows = memo.flatten(&added.tree, keys, true);

        Ok(Some(DragPreview {
            rows: slide_rows(
                &rows[..],
                added.tree_index,
                placement.minimum_tree_index,
                swap_length,
            ),
            swap_from: added.tree_index,
            swap_length,
            swap_depth: placement.depth,
        }))
    }

    pub fn can_drop_params<'a>(
        &'a self,
        target: &'a InsertedNode,
    ) -> CanDropParams<'a> {
        let (prev_path, prev_parent, prev_tree_index) = match &self.source {
            DragSource::Internal {
                path,
                tree_index,
                parent,
            } => (Some(path.as_slice()), parent.as_ref(), Some(*tree_index)),
            DragSource::External => (None, None, None),
        };
        CanDropParams {
            node: &self.node,
            prev_path,
            prev_parent,
            prev_tree_index,
            next_path: &target.path,
            next_parent: target.parent.as_ref(),
            next_tree_index: target.tree_index,
        }
    }

    /// Drop at `placement`.
    pub fn commit<K: NodeKey + ?Sized>(
        self,
        placement: Placement,
        keys: &K,
        memo: &MemoCache,
    ) -> Result<MoveOutcome, TreeError> {
        let target = self.target(placement, keys, memo)?;
        Ok(self.finish(target))
    }

    /// Commit a target obtained from [`DragSession::target`].
    pub fn finish(self, target: InsertedNode) -> MoveOutcome {
        let (prev_path, prev_tree_index) = self.prev_position();
        MoveOutcome {
            tree: target.tree,
            node: self.node,
            prev_path,
            prev_tree_index,
            next_path: Some(target.path),
            next_tree_index: Some(target.tree_index),
            next_parent: target.parent,
        }
    }

    /// Abandon the drag and return the tree it started from.
    pub fn cancel(self) -> Tree {
        self.snapshot
    }

    /// The node was dropped into another tree.
    ///
    /// With `copy`, the source tree keeps a shallow copy of the node at its
    /// original place; otherwise the node is gone from this tree. External
    /// drags leave the tree as it was.
    pub fn drop_outside<K: NodeKey + ?Sized>(
        self,
        copy: bool,
        keys: &K,
    ) -> Result<MoveOutcome, TreeError> {
        let tree = match (&self.source, copy) {
            (DragSource::Internal { path, .. }, true) => {
                change_node_at_path(&self.snapshot, path, keys, |node, _| {
                    Rc::new(Node::clone(node))
                })?
            },
            (DragSource::Internal { .. }, false) => self.base.clone(),
            (DragSource::External, _) => self.snapshot.clone(),
        };
        let (prev_path, prev_tree_index) = self.prev_position();
        Ok(MoveOutcome {
            tree,
            node: self.node,
            prev_path,
            prev_tree_index,
            next_path: None,
            next_tree_index: None,
            next_parent: None,
        })
    }

    fn prev_position(&self) -> (Option<TreePath>, Option<usize>) {
        match &self.source {
            DragSource::Internal {
                path, tree_index, ..
            } => (Some(path.clone()), Some(*tree_index)),
            DragSource::External => (None, None),
        }
    }
}
