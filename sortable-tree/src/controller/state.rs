use crate::drag::DragSession;
use crate::lazy::LazyLoader;
use crate::model::{SearchMatch, Tree};

/// Runtime state behind a [`super::SortableTree`].
#[derive(Debug, Default)]
pub struct TreeState {
    tree: Tree,
    search_query: String,
    search_focus_offset: Option<usize>,
    search_matches: Vec<SearchMatch>,
    drag: Option<DragSession>,
    lazy: LazyLoader,
}

impl TreeState {
    pub(super) fn new(tree: Tree, lazy: LazyLoader) -> Self {
        Self {
            tree,
            lazy,
            ..Self::default()
        }
    }

    // --- Read access ---

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn search_focus_offset(&self) -> Option<usize> {
        self.search_focus_offset
    }

    /// Matches of the last search pass.
    pub fn search_matches(&self) -> &[SearchMatch] {
        &self.search_matches
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // --- Write access ---

    pub(super) fn set_tree(&mut self, tree: Tree) {
        self.tree = tree;
    }

    /// Returns `true` when the query changed.
    pub(super) fn set_search_query(&mut self, query: String) -> bool {
        if self.search_query == query {
            return false;
        }
        self.search_query = query;
        true
    }

    /// Returns `true` when the offset changed.
    pub(super) fn set_search_focus_offset(&mut self, offset: Option<usize>) -> bool {
        if self.search_focus_offset == offset {
            return false;
        }
        self.search_focus_offset = offset;
        true
    }

    pub(super) fn set_search_matches(&mut self, matches: Vec<SearchMatch>) {
        self.search_matches = matches;
    }

    pub(super) fn set_drag(&mut self, drag: DragSession) {
        self.drag = Some(drag);
    }

    pub(super) fn drag_mut(&mut self) -> Option<&mut DragSession> {
        self.drag.as_mut()
    }

    pub(super) fn take_drag(&mut self) -> Option<DragSession> {
        self.drag.take()
    }

    pub(super) fn lazy_mut(&mut self) -> &mut LazyLoader {
        &mut self.lazy
    }
}
