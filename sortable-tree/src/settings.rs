use serde::{Deserialize, Serialize};

use crate::errors::TreeError;

/// Behaviour switches of a [`crate::SortableTree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    /// Deepest depth a node may occupy, counted from `1` at root level.
    pub max_depth: Option<usize>,
    /// Resolve lazy children of visible nodes even while they are collapsed.
    pub load_collapsed_lazy_children: bool,
    /// Collapse everything before each search.
    pub only_expand_searched_nodes: bool,
    /// Leave a copy behind when a node is dropped into another tree.
    pub should_copy_on_outside_drop: bool,
}

impl TreeSettings {
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_load_collapsed_lazy_children(mut self, value: bool) -> Self {
        self.load_collapsed_lazy_children = value;
        self
    }

    pub fn with_only_expand_searched_nodes(mut self, value: bool) -> Self {
        self.only_expand_searched_nodes = value;
        self
    }

    pub fn with_should_copy_on_outside_drop(mut self, value: bool) -> Self {
        self.should_copy_on_outside_drop = value;
        self
    }
}
