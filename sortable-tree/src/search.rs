use std::collections::HashMap;
use std::rc::Rc;

use crate::key::NodeKey;
use crate::model::{
    Children, Key, Label, LabelContext, Node, NodeRef, SearchMatch, Tree,
};
use crate::mutate::toggle_expanded_for_all;

/// Arguments handed to a search method for every node.
pub struct SearchParams<'a> {
    pub node: &'a Node,
    pub path: &'a [Key],
    pub tree_index: usize,
    pub query: &'a str,
}

/// Predicate deciding whether a node matches a query.
pub type SearchMethod = dyn Fn(&SearchParams<'_>) -> bool;

/// Switches of a [`find`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Expand every ancestor of every match.
    pub expand_all_match_paths: bool,
    /// Expand the ancestors of the focused match.
    pub expand_focus_match_paths: bool,
    /// Zero-based index of the focused match among all matches.
    pub search_focus_offset: Option<usize>,
    /// Collapse the whole tree before searching.
    pub collapse_before_search: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            expand_all_match_paths: false,
            expand_focus_match_paths: true,
            search_focus_offset: None,
            collapse_before_search: false,
        }
    }
}

/// Result of [`find`].
#[derive(Debug, Clone)]
pub struct FindOutcome {
    pub tree: Tree,
    /// Matches in traversal order.
    pub matches: Vec<SearchMatch>,
}

/// Case-sensitive substring search over `title` and `subtitle`.
pub fn default_search_method(params: &SearchParams<'_>) -> bool {
    let ctx = LabelContext {
        node: params.node,
        path: params.path,
        tree_index: params.tree_index,
    };
    let contains = |label: &Option<Label>| {
        label
            .as_ref()
            .is_some_and(|label| label.text(&ctx).contains(params.query))
    };
    contains(&params.node.title) || contains(&params.node.subtitle)
}

/// Run `method` over every node of the tree, hidden or not.
///
/// Ancestors of matches are expanded according to `options`. Tree indices
/// reported in the matches refer to the returned tree; matches that remain
/// hidden under a collapsed ancestor report `None`. Subtrees without
/// matches keep their identity.
pub fn find<K, M>(
    tree: &Tree,
    keys: &K,
    query: &str,
    method: &M,
    options: &FindOptions,
) -> FindOutcome
where
    K: NodeKey + ?Sized,
    M: Fn(&SearchParams<'_>) -> bool + ?Sized,
{
    let base = if options.collapse_before_search {
        toggle_expanded_for_all(tree, false)
    } else {
        tree.clone()
    };

    let mut finder = Finder {
        keys,
        method,
        query,
        options,
        match_count: 0,
    };
    let found = finder.visit_children(base.roots(), 0, &[]);

    FindOutcome {
        tree: found.children.map(Tree::from_refs).unwrap_or(base),
        matches: found.matches,
    }
}

struct Finder<'a, K: ?Sized, M: ?Sized> {
    keys: &'a K,
    method: &'a M,
    query: &'a str,
    options: &'a FindOptions,
    match_count: usize,
}

struct FoundNode {
    node: NodeRef,
    matches: Vec<SearchMatch>,
    has_focus: bool,
    /// Index of the last row of this subtree, counted as if it were open.
    last_index: usize,
}

struct FoundChildren {
    /// Replacement children, `None` when none of them changed.
    children: Option<Vec<NodeRef>>,
    matches: Vec<SearchMatch>,
    has_focus: bool,
    expand: bool,
    next_index: usize,
}

impl<K, M> Finder<'_, K, M>
where
    K: NodeKey + ?Sized,
    M: Fn(&SearchParams<'_>) -> bool + ?Sized,
{
    fn visit_children(
        &mut self,
        children: &[NodeRef],
        first_index: usize,
        path: &[Key],
    ) -> FoundChildren {
        let mut found = FoundChildren {
            children: None,
            matches: Vec::new(),
            has_focus: false,
            expand: false,
            next_index: first_index,
        };
        let mut next_children = Vec::with_capacity(children.len());
        let mut changed = false;

        for child in children {
            let visit = self.visit(child, found.next_index, path);
            found.next_index = if visit.node.expanded {
                visit.last_index + 1
            } else {
                found.next_index + 1
            };

            if !visit.matches.is_empty() || visit.has_focus {
                let expand_all = self.options.expand_all_match_paths;
                let expand_focus = self.options.expand_focus_match_paths;
                if (expand_all && !visit.matches.is_empty())
                    || ((expand_all || expand_focus) && visit.has_focus)
                {
                    found.expand = true;
                }
                found.has_focus |= visit.has_focus;
                found.matches.extend(visit.matches);
            }

            changed |= !Rc::ptr_eq(&visit.node, child);
            next_children.push(visit.node);
        }

        if changed {
            found.children = Some(next_children);
        }
        found
    }

    fn visit(
        &mut self,
        node: &NodeRef,
        tree_index: usize,
        parent_path: &[Key],
    ) -> FoundNode {
        let mut path = parent_path.to_vec();
        path.push(self.keys.key(tree_index, node));

        let is_self_match = (self.method)(&SearchParams {
            node,
            path: &path,
            tree_index,
            query: self.query,
        });
        let mut has_focus = false;
        if is_self_match {
            has_focus = self.options.search_focus_offset == Some(self.match_count);
            self.match_count += 1;
        }

        let below = match &node.children {
            Children::Loaded(children) if !children.is_empty() => {
                Some(self.visit_children(children, tree_index + 1, &path))
            },
            _ => None,
        };
        let (children, mut matches, expand, last_index) = match below {
            Some(below) => {
                has_focus |= below.has_focus;
                (below.children, below.matches, below.expand, below.next_index - 1)
            },
            None => (None, Vec::new(), false, tree_index),
        };

        if !is_self_match && matches.is_empty() {
            return FoundNode {
                node: Rc::clone(node),
                matches,
                has_focus,
                last_index,
            };
        }

        let expanded = node.expanded || expand;
        let next = if children.is_none() && expanded == node.expanded {
            Rc::clone(node)
        } else {
            let mut next = match children {
                Some(children) => node.with_loaded_children(children),
                None => Node::clone(node),
            };
            next.expanded = expanded;
            Rc::new(next)
        };

        if !expanded {
            for hidden in &mut matches {
                hidden.tree_index = None;
            }
        }
        if is_self_match {
            matches.insert(
                0,
                SearchMatch {
                    node: Rc::clone(&next),
                    path,
                    tree_index: Some(tree_index),
                },
            );
        }

        FoundNode {
            node: next,
            matches,
            has_focus,
            last_index,
        }
    }
}

/// Lookup of search flags for rendered rows.
///
/// Rows are matched by the last key of their path.
#[derive(Debug, Clone, Default)]
pub struct SearchHighlights {
    offsets: HashMap<Key, usize>,
    focus_offset: Option<usize>,
}

impl SearchHighlights {
    pub fn new(matches: &[SearchMatch], focus_offset: Option<usize>) -> Self {
        let offsets = matches
            .iter()
            .enumerate()
            .filter_map(|(offset, found)| {
                found.path.last().map(|key| (key.clone(), offset))
            })
            .collect();
        Self {
            offsets,
            focus_offset,
        }
    }

    pub fn is_match(&self, key: &Key) -> bool {
        self.offsets.contains_key(key)
    }

    pub fn is_focus(&self, key: &Key) -> bool {
        self.focus_offset.is_some()
            && self.offsets.get(key).copied() == self.focus_offset
    }
}
