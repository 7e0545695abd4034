use crate::drag::MoveOutcome;
use crate::model::{NodeRef, SearchMatch, Tree, TreePath};

/// Effects produced by the tree reducer, in the order they happened.
#[derive(Debug, Clone)]
pub enum TreeEffect {
    /// The tree changed and should be stored by the host.
    Changed { tree: Tree },
    /// A node was expanded or collapsed by the user.
    VisibilityToggled {
        node: NodeRef,
        path: TreePath,
        expanded: bool,
    },
    /// A drag finished with the node moved, or leaving the tree.
    NodeMoved(MoveOutcome),
    /// A search pass finished.
    SearchFinished { matches: Vec<SearchMatch> },
    /// Scroll the focused match into view.
    ScrollToRow { tree_index: usize },
    DragStateChanged { is_dragging: bool },
}
