mod command;
mod event;
mod reducer;
mod state;

use std::fmt;
use std::rc::Rc;

pub use command::{DropResult, TreeCommand};
pub use event::TreeEffect;
use reducer::TreeCtx;
pub use state::TreeState;
use uuid::Uuid;

use crate::drag::CanDropParams;
use crate::key::{NodeKey, TreeIndexKey};
use crate::lazy::LazyLoader;
use crate::memo::MemoCache;
use crate::model::{Key, Node, NodeRef, Row, Tree};
use crate::search::{SearchHighlights, SearchMethod, SearchParams};
use crate::settings::TreeSettings;

/// Identifier of a tree instance, used to tell drops on this tree apart
/// from drops elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(Uuid);

impl TreeId {
    /// Generate a random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TreeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Veto evaluated before a drop is committed.
pub type CanDrop = dyn Fn(&CanDropParams<'_>) -> bool;

/// Decides whether the visible row may start a drag.
pub type CanDrag = dyn Fn(&Row) -> bool;

/// Decides whether a node accepts dropped children.
pub type CanNodeHaveChildren = dyn Fn(&Node) -> bool;

/// Decides whether a node dropped into another tree leaves a copy behind.
/// Receives the node with its previous path and tree index.
pub type CopyOnOutsideDrop = dyn Fn(&NodeRef, &[Key], usize) -> bool;

/// Optional host callbacks.
#[derive(Clone, Default)]
pub struct TreeHooks {
    search_method: Option<Rc<SearchMethod>>,
    can_drag: Option<Rc<CanDrag>>,
    can_drop: Option<Rc<CanDrop>>,
    can_node_have_children: Option<Rc<CanNodeHaveChildren>>,
    copy_on_outside_drop: Option<Rc<CopyOnOutsideDrop>>,
}

impl TreeHooks {
    pub fn search_method(&self) -> Option<&SearchMethod> {
        self.search_method.as_deref()
    }

    pub fn can_drag(&self) -> Option<&CanDrag> {
        self.can_drag.as_deref()
    }

    pub fn can_drop(&self) -> Option<&CanDrop> {
        self.can_drop.as_deref()
    }

    pub fn can_node_have_children(&self) -> Option<&CanNodeHaveChildren> {
        self.can_node_have_children.as_deref()
    }

    pub fn copy_on_outside_drop(&self) -> Option<&CopyOnOutsideDrop> {
        self.copy_on_outside_drop.as_deref()
    }
}

impl fmt::Debug for TreeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeHooks")
            .field("search_method", &self.search_method.is_some())
            .field("can_drag", &self.can_drag.is_some())
            .field("can_drop", &self.can_drop.is_some())
            .field(
                "can_node_have_children",
                &self.can_node_have_children.is_some(),
            )
            .field("copy_on_outside_drop", &self.copy_on_outside_drop.is_some())
            .finish()
    }
}

/// Row prepared for rendering.
#[derive(Debug, Clone)]
pub struct RowView {
    pub row: Row,
    pub is_search_match: bool,
    pub is_search_focus: bool,
}

/// Dragged block inside [`RenderRows::rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapWindow {
    pub from: usize,
    pub length: usize,
    pub depth: usize,
}

/// Everything a virtualized list needs to draw the tree.
#[derive(Debug, Clone)]
pub struct RenderRows {
    pub rows: Vec<RowView>,
    /// Set while a drag preview is shown.
    pub swap: Option<SwapWindow>,
}

/// Host-facing controller: owns the current tree, search and drag state,
/// and reduces [`TreeCommand`]s into [`TreeEffect`]s.
pub struct SortableTree<K = TreeIndexKey> {
    id: TreeId,
    state: TreeState,
    keys: K,
    settings: TreeSettings,
    hooks: TreeHooks,
    memo: MemoCache,
}

impl SortableTree<TreeIndexKey> {
    /// Create a controller keyed by tree index.
    pub fn new(tree: Tree) -> Self {
        Self {
            id: TreeId::new(),
            state: TreeState::new(tree, LazyLoader::default()),
            keys: TreeIndexKey,
            settings: TreeSettings::default(),
            hooks: TreeHooks::default(),
            memo: MemoCache::new(),
        }
    }
}

impl<K: NodeKey> SortableTree<K> {
    /// Replace the key resolver.
    pub fn with_keys<R: NodeKey>(self, keys: R) -> SortableTree<R> {
        SortableTree {
            id: self.id,
            state: self.state,
            keys,
            settings: self.settings,
            hooks: self.hooks,
            memo: MemoCache::new(),
        }
    }

    pub fn with_settings(mut self, settings: TreeSettings) -> Self {
        self.state
            .lazy_mut()
            .set_load_collapsed(settings.load_collapsed_lazy_children);
        self.settings = settings;
        self
    }

    pub fn with_tree_id(mut self, id: TreeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_search_method(
        mut self,
        method: impl Fn(&SearchParams<'_>) -> bool + 'static,
    ) -> Self {
        self.hooks.search_method = Some(Rc::new(method));
        self
    }

    pub fn with_can_drag(
        mut self,
        can_drag: impl Fn(&Row) -> bool + 'static,
    ) -> Self {
        self.hooks.can_drag = Some(Rc::new(can_drag));
        self
    }

    /// Drops whose new parent is refused are treated as cancelled.
    pub fn with_can_node_have_children(
        mut self,
        can_have_children: impl Fn(&Node) -> bool + 'static,
    ) -> Self {
        self.hooks.can_node_have_children = Some(Rc::new(can_have_children));
        self
    }

    pub fn with_can_drop(
        mut self,
        can_drop: impl Fn(&CanDropParams<'_>) -> bool + 'static,
    ) -> Self {
        self.hooks.can_drop = Some(Rc::new(can_drop));
        self
    }

    pub fn with_copy_on_outside_drop(
        mut self,
        copy: impl Fn(&NodeRef, &[Key], usize) -> bool + 'static,
    ) -> Self {
        self.hooks.copy_on_outside_drop = Some(Rc::new(copy));
        self
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn tree(&self) -> &Tree {
        self.state.tree()
    }

    pub fn state(&self) -> &TreeState {
        &self.state
    }

    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    /// Start lazy loading and run the initial search pass.
    pub fn mount(&mut self) -> Vec<TreeEffect> {
        let ctx = TreeCtx {
            keys: &self.keys,
            settings: &self.settings,
            hooks: &self.hooks,
            memo: &self.memo,
            tree_id: self.id,
        };
        reducer::mount(&mut self.state, &ctx)
    }

    /// Reduce a command into state updates and effects.
    pub fn reduce(&mut self, command: TreeCommand) -> Vec<TreeEffect> {
        let ctx = TreeCtx {
            keys: &self.keys,
            settings: &self.settings,
            hooks: &self.hooks,
            memo: &self.memo,
            tree_id: self.id,
        };
        reducer::reduce(&mut self.state, command, &ctx)
    }

    /// Visible rows, or the drag preview while a node is dragged.
    pub fn rows(&self) -> RenderRows {
        let highlights = SearchHighlights::new(
            self.state.search_matches(),
            self.state.search_focus_offset(),
        );
        let preview = match self.state.drag() {
            Some(session) => match session.preview(&self.keys, &self.memo) {
                Ok(preview) => preview,
                Err(err) => {
                    log::warn!("drag preview failed: {err}");
                    None
                },
            },
            None => None,
        };

        let (rows, swap) = match preview {
            Some(preview) => (
                preview.rows,
                Some(SwapWindow {
                    from: preview.swap_from,
                    length: preview.swap_length,
                    depth: preview.swap_depth,
                }),
            ),
            None => (
                self.memo.flatten(self.state.tree(), &self.keys, true).to_vec(),
                None,
            ),
        };

        RenderRows {
            rows: rows
                .into_iter()
                .map(|row| {
                    let (is_search_match, is_search_focus) = match row.path.last() {
                        Some(key) => {
                            (highlights.is_match(key), highlights.is_focus(key))
                        },
                        None => (false, false),
                    };
                    RowView {
                        row,
                        is_search_match,
                        is_search_focus,
                    }
                })
                .collect(),
            swap,
        }
    }
}

impl<K> fmt::Debug for SortableTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortableTree")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
