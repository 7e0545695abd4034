use std::fmt;
use std::rc::{Rc, Weak};

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::lazy::LazyChildren;

/// Shared handle to an immutable node.
///
/// Identity of a node is the identity of its `Rc` allocation. Operations in
/// this crate rebuild only the spine from a root to the changed node, so every
/// other `NodeRef` of the previous tree stays pointer-equal in the next one.
pub type NodeRef = Rc<Node>;

/// Path of node keys from a root to the target node.
///
/// Each element is the value produced by the [`crate::NodeKey`] resolver for
/// the node at that level, so `path.len() == depth + 1`.
pub type TreePath = Vec<Key>;

/// Identifier of a node within its sibling set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// Positional key (the default resolver returns the tree index).
    Index(usize),
    /// Content-derived key.
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Index(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Name(value.to_owned())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Name(value)
    }
}

/// Format a path as `a/b/c` for diagnostics.
pub(crate) fn display_path(path: &[Key]) -> String {
    path.iter()
        .map(Key::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// Context handed to computed labels.
pub struct LabelContext<'a> {
    pub node: &'a Node,
    pub path: &'a [Key],
    pub tree_index: usize,
}

type ComputeLabel = dyn Fn(&LabelContext<'_>) -> String;

/// Renderable text attached to a node (`title`, `subtitle`).
#[derive(Clone)]
pub enum Label {
    Text(String),
    /// Nested content; its text is the concatenation of all fragments.
    Fragments(Vec<Label>),
    /// Text produced on demand from the node and its position.
    Computed(Rc<ComputeLabel>),
}

impl Label {
    /// Create a label computed from node context.
    pub fn computed(
        compute: impl Fn(&LabelContext<'_>) -> String + 'static,
    ) -> Self {
        Label::Computed(Rc::new(compute))
    }

    /// Flatten the label into plain text.
    pub fn text(&self, ctx: &LabelContext<'_>) -> String {
        match self {
            Label::Text(text) => text.clone(),
            Label::Fragments(fragments) => {
                fragments.iter().map(|fragment| fragment.text(ctx)).collect()
            },
            Label::Computed(compute) => compute(ctx),
        }
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Label::Fragments(fragments) => {
                f.debug_tuple("Fragments").field(fragments).finish()
            },
            Label::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Text(value.to_owned())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Text(value)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Label::Text(text) => serializer.serialize_str(text),
            Label::Fragments(fragments) => serializer.collect_seq(fragments),
            Label::Computed(_) => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawLabel {
            Text(String),
            Fragments(Vec<Label>),
        }

        Ok(match RawLabel::deserialize(deserializer)? {
            RawLabel::Text(text) => Label::Text(text),
            RawLabel::Fragments(fragments) => Label::Fragments(fragments),
        })
    }
}

/// Children of a node: a materialized list or a one-shot provider.
#[derive(Clone, Debug)]
pub enum Children {
    Loaded(Vec<NodeRef>),
    Lazy(LazyChildren),
}

impl Default for Children {
    fn default() -> Self {
        Children::Loaded(Vec::new())
    }
}

impl Children {
    /// Materialized children, or `None` while a provider is pending.
    pub fn loaded(&self) -> Option<&[NodeRef]> {
        match self {
            Children::Loaded(children) => Some(children),
            Children::Lazy(_) => None,
        }
    }

    /// Whether the children are still an unresolved provider.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Children::Lazy(_))
    }

    /// Whether a node owning these children counts as a parent.
    ///
    /// Lazy providers count as non-empty.
    pub fn is_present(&self) -> bool {
        match self {
            Children::Loaded(children) => !children.is_empty(),
            Children::Lazy(_) => true,
        }
    }
}

impl Serialize for Children {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Children::Loaded(children) => serializer.collect_seq(children),
            Children::Lazy(_) => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Children {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let children = Option::<Vec<NodeRef>>::deserialize(deserializer)?;
        Ok(Children::Loaded(children.unwrap_or_default()))
    }
}

/// A tree node.
///
/// The engine reads only `expanded` and `children`; everything else is
/// carried along for the host. Unknown serialized fields land in `data`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<Label>,
    pub expanded: bool,
    pub children: Children,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    /// Create a collapsed leaf with a plain text title.
    pub fn new(title: impl Into<Label>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<Label>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children =
            Children::Loaded(children.into_iter().map(Rc::new).collect());
        self
    }

    pub fn with_lazy_children(mut self, provider: LazyChildren) -> Self {
        self.children = Children::Lazy(provider);
        self
    }

    pub fn with_data(
        mut self,
        key: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.data.insert(key.to_owned(), value.into());
        self
    }

    /// Wrap the node into a shared handle.
    pub fn into_ref(self) -> NodeRef {
        Rc::new(self)
    }

    /// Copy of this node with different children.
    pub(crate) fn with_loaded_children(&self, children: Vec<NodeRef>) -> Self {
        Self {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            expanded: self.expanded,
            children: Children::Loaded(children),
            data: self.data.clone(),
        }
    }
}

/// An ordered forest of root nodes.
///
/// Cloning a tree is cheap and keeps identity: [`Tree::ptr_eq`] holds for
/// the clone. Every mutating operation returns a new tree.
#[derive(Clone)]
pub struct Tree {
    roots: Rc<[NodeRef]>,
}

impl Tree {
    /// Build a tree from owned root nodes.
    pub fn new(roots: Vec<Node>) -> Self {
        Self::from_refs(roots.into_iter().map(Rc::new).collect())
    }

    /// Build a tree from shared root handles.
    pub fn from_refs(roots: Vec<NodeRef>) -> Self {
        Self {
            roots: Rc::from(roots),
        }
    }

    /// Root nodes in order.
    pub fn roots(&self) -> &[NodeRef] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of root nodes.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether both trees are the same allocation.
    pub fn ptr_eq(&self, other: &Tree) -> bool {
        Rc::ptr_eq(&self.roots, &other.roots)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::from_refs(Vec::new())
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.roots.iter()).finish()
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.roots.iter())
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let roots = Option::<Vec<NodeRef>>::deserialize(deserializer)?;
        Ok(Self::from_refs(roots.unwrap_or_default()))
    }
}

/// Flattened representation of a visible tree node.
#[derive(Clone, Debug)]
pub struct Row {
    /// Source node.
    pub node: NodeRef,
    /// Parent of the node; lookup only, does not keep the parent alive.
    pub parent: Option<Weak<Node>>,
    /// Key path from the root to this row.
    pub path: TreePath,
    /// Later siblings at every ancestor level, used for connector lines.
    pub lower_sibling_counts: Vec<usize>,
    /// Zero-based position among visible rows.
    pub tree_index: usize,
}

impl Row {
    /// Zero-based tree depth (`0` for root-level rows).
    pub fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Parent node, if it is still alive.
    pub fn parent_node(&self) -> Option<NodeRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }
}

/// A node accepted by a search predicate.
#[derive(Clone, Debug)]
pub struct SearchMatch {
    pub node: NodeRef,
    pub path: TreePath,
    /// Position in the expansion-adjusted flattening; `None` when a collapsed
    /// ancestor hides the match.
    pub tree_index: Option<usize>,
}
