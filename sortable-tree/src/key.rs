use crate::model::{Key, Node};

/// Resolver deriving the external key of a node.
///
/// Keys must be unique among siblings for paths to be unambiguous.
pub trait NodeKey {
    /// Key for `node`, currently displayed at `tree_index`.
    fn key(&self, tree_index: usize, node: &Node) -> Key;
}

impl<F> NodeKey for F
where
    F: Fn(usize, &Node) -> Key,
{
    fn key(&self, tree_index: usize, node: &Node) -> Key {
        self(tree_index, node)
    }
}

/// Default resolver: the key is the tree index itself.
///
/// Positional keys are only stable while the visible ordering is unchanged;
/// collapsing, expanding, inserting or removing any row above a node
/// reassigns its key. Hosts that need keys to survive edits (drag-and-drop
/// identity across renders, lazy completions) should key nodes by content,
/// for example with [`FieldKey`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeIndexKey;

impl NodeKey for TreeIndexKey {
    fn key(&self, tree_index: usize, _node: &Node) -> Key {
        Key::Index(tree_index)
    }
}

/// Content-addressed resolver reading a metadata field of the node.
///
/// String and number values become [`Key::Name`]; nodes without the field
/// fall back to their tree index.
#[derive(Debug, Clone)]
pub struct FieldKey {
    field: String,
}

impl FieldKey {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl NodeKey for FieldKey {
    fn key(&self, tree_index: usize, node: &Node) -> Key {
        match node.data.get(&self.field) {
            Some(serde_json::Value::String(value)) => Key::Name(value.clone()),
            Some(serde_json::Value::Number(value)) => {
                Key::Name(value.to_string())
            },
            _ => Key::Index(tree_index),
        }
    }
}
