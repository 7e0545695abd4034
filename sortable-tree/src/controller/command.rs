use crate::model::{NodeRef, Tree, TreePath};

use super::TreeId;

/// Commands dispatched to the tree reducer.
#[derive(Debug, Clone)]
pub enum TreeCommand {
    /// The host replaced the whole tree.
    ReplaceTree { tree: Tree },
    /// Flip `expanded` on the node at `path`.
    ToggleChildrenVisibility { path: TreePath },
    /// Search query changed.
    SetSearchQuery { query: String },
    /// Focused match changed.
    SetSearchFocusOffset { offset: Option<usize> },
    /// A node of this tree was picked up.
    StartDrag { path: TreePath },
    /// A node from another source entered this tree.
    StartExternalDrag { node: NodeRef },
    /// The pointer moved over a candidate position.
    DragHover {
        depth: usize,
        minimum_tree_index: usize,
    },
    /// The node was released over this tree.
    Drop {
        depth: usize,
        minimum_tree_index: usize,
    },
    /// The drag source finished.
    EndDrag { result: DropResult },
    /// The drag backend reports that no drag is in progress anymore.
    DragMonitorEnded,
    /// Fold completed lazy children into the tree.
    ApplyLazyChildren,
}

/// How a drag that started in this tree ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropResult {
    Cancelled,
    /// Dropped on the tree identified by `target`.
    Outside { target: TreeId },
}
