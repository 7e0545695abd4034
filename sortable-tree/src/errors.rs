use thiserror::Error;

/// Errors emitted by tree operations.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("No node found at path `{path}`.")]
    PathNotFound { path: String },
    #[error("Cannot insert under `{path}`: its children are not loaded yet.")]
    LazyChildren { path: String },
    #[error("Invalid tree settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl TreeError {
    pub(crate) fn path_not_found(path: &[crate::model::Key]) -> Self {
        TreeError::PathNotFound {
            path: crate::model::display_path(path),
        }
    }

    pub(crate) fn lazy_children(path: &[crate::model::Key]) -> Self {
        TreeError::LazyChildren {
            path: crate::model::display_path(path),
        }
    }
}
