//! Immutable tree engine for virtualized, sortable tree views.
//!
//! This crate is split into two layers:
//! - pure tree operations ([`walk`], [`flatten`], [`insert_node`],
//!   [`find`], ...) over a persistent [`Tree`] with structural sharing;
//! - a host-facing controller ([`SortableTree`]) that reduces
//!   [`TreeCommand`]s into [`TreeEffect`]s and tracks search, drag-and-drop
//!   and lazily loaded children.
//!
//! Every operation returns a new tree. Nodes outside the edited path are
//! shared with the input, so hosts can detect unchanged subtrees with
//! [`Tree::ptr_eq`] and [`std::rc::Rc::ptr_eq`].
//!
//! The crate draws nothing. A view layer renders [`SortableTree::rows`]
//! and forwards pointer and keyboard input back as commands.
//!
//! # Quick Example
//!
//! ```
//! use sortable_tree::{Key, Node, SortableTree, Tree, TreeCommand};
//!
//! let tree = Tree::new(vec![
//!     Node::new("src").with_children(vec![Node::new("lib.rs")]),
//!     Node::new("Cargo.toml"),
//! ]);
//! let mut controller = SortableTree::new(tree);
//! controller.mount();
//!
//! controller.reduce(TreeCommand::ToggleChildrenVisibility {
//!     path: vec![Key::Index(0)],
//! });
//! assert_eq!(controller.rows().rows.len(), 3);
//! ```

mod controller;
mod count;
mod drag;
mod errors;
mod insert;
mod key;
mod lazy;
mod memo;
mod model;
mod mutate;
mod search;
mod settings;
mod slide;
mod walk;

#[cfg(test)]
mod fixtures;

pub use controller::{
    CanDrag, CanDrop, CanNodeHaveChildren, CopyOnOutsideDrop, DropResult,
    RenderRows, RowView, SortableTree, SwapWindow, TreeCommand, TreeEffect,
    TreeHooks, TreeId, TreeState,
};
pub use count::{depth_of, descendant_count, visible_descendant_count};
pub use drag::{
    CanDropParams, DragPreview, DragSession, DragSource, MoveOutcome,
    clamp_depth,
};
pub use errors::TreeError;
pub use insert::{InsertedNode, Placement, insert_node};
pub use key::{FieldKey, NodeKey, TreeIndexKey};
pub use lazy::{ChildrenRequest, Completion, LazyChildren, LazyLoader};
pub use memo::MemoCache;
pub use model::{
    Children, Key, Label, LabelContext, Node, NodeRef, Row, SearchMatch,
    Tree, TreePath,
};
pub use mutate::{
    AddedNode, RemovedNode, add_node_under_parent, change_node_at_path,
    node_at_path, remove_node, toggle_expanded_for_all,
};
pub use search::{
    FindOptions, FindOutcome, SearchHighlights, SearchMethod, SearchParams,
    default_search_method, find,
};
pub use settings::TreeSettings;
pub use slide::slide_rows;
pub use walk::{WalkInfo, flatten, node_at_tree_index, visible_node_count, walk};
