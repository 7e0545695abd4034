//! Deferred children.
//!
//! A node may carry a [`LazyChildren`] provider instead of a child list. The
//! [`LazyLoader`] invokes each provider once the node becomes eligible and
//! collects completions on a channel; [`LazyLoader::apply`] folds them into
//! the current tree.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::key::NodeKey;
use crate::model::{Children, Node, NodeRef, Tree, TreePath, display_path};
use crate::mutate::{change_node_at_path, node_at_path};
use crate::walk::walk;

type Provide = dyn Fn(ChildrenRequest);

/// One-shot provider of a node's children.
#[derive(Clone)]
pub struct LazyChildren(Rc<Provide>);

impl LazyChildren {
    pub fn new(provide: impl Fn(ChildrenRequest) + 'static) -> Self {
        Self(Rc::new(provide))
    }

    fn request(&self, request: ChildrenRequest) {
        (self.0)(request)
    }
}

impl fmt::Debug for LazyChildren {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyChildren(..)")
    }
}

/// Arguments passed to a [`LazyChildren`] provider.
#[derive(Debug)]
pub struct ChildrenRequest {
    pub node: NodeRef,
    pub path: TreePath,
    pub lower_sibling_counts: Vec<usize>,
    pub tree_index: usize,
    /// Hand the loaded children back. May be called later, from the same
    /// thread, after the provider has returned.
    pub done: Completion,
}

/// Completion handle of a children request. Consumed on use.
pub struct Completion {
    origin: Weak<Node>,
    path: TreePath,
    sender: Sender<Resolution>,
}

impl Completion {
    pub fn done(self, children: Vec<Node>) {
        let resolution = Resolution {
            origin: self.origin,
            path: self.path,
            children,
        };
        if self.sender.send(resolution).is_err() {
            log::debug!("lazy children resolved after loader was dropped");
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("path", &display_path(&self.path))
            .finish_non_exhaustive()
    }
}

struct Resolution {
    origin: Weak<Node>,
    path: TreePath,
    children: Vec<Node>,
}

/// Drives lazy providers for a tree.
pub struct LazyLoader {
    sender: Sender<Resolution>,
    receiver: Receiver<Resolution>,
    submitted: Vec<Weak<Node>>,
    load_collapsed: bool,
}

impl Default for LazyLoader {
    fn default() -> Self {
        Self::new(false)
    }
}

impl LazyLoader {
    /// With `load_collapsed`, providers of collapsed (but visible) nodes run
    /// too.
    pub fn new(load_collapsed: bool) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            submitted: Vec::new(),
            load_collapsed,
        }
    }

    pub fn set_load_collapsed(&mut self, load_collapsed: bool) {
        self.load_collapsed = load_collapsed;
    }

    /// Invoke providers of eligible visible nodes that were not requested
    /// yet. Returns the number of providers started.
    pub fn scan<K: NodeKey + ?Sized>(&mut self, tree: &Tree, keys: &K) -> usize {
        self.submitted.retain(|origin| origin.strong_count() > 0);

        let mut pending = Vec::new();
        walk(tree, keys, true, |info| {
            let Children::Lazy(provider) = &info.node.children else {
                return;
            };
            if !(info.node.expanded || self.load_collapsed) {
                return;
            }
            let origin = Rc::downgrade(info.node);
            if self.submitted.iter().any(|seen| seen.ptr_eq(&origin)) {
                return;
            }
            self.submitted.push(origin.clone());
            pending.push((
                provider.clone(),
                ChildrenRequest {
                    node: Rc::clone(info.node),
                    path: info.path.to_vec(),
                    lower_sibling_counts: info.lower_sibling_counts.to_vec(),
                    tree_index: info.tree_index,
                    done: Completion {
                        origin,
                        path: info.path.to_vec(),
                        sender: self.sender.clone(),
                    },
                },
            ));
        });

        let started = pending.len();
        for (provider, request) in pending {
            log::debug!(
                "loading lazy children at `{}`",
                display_path(&request.path)
            );
            provider.request(request);
        }
        started
    }

    /// Fold every completed request into `tree`.
    ///
    /// A completion replaces the children of the node it was requested for
    /// only while that node still sits at the recorded path. Otherwise it is
    /// discarded and the node becomes eligible for a new request on the next
    /// [`scan`](Self::scan). Returns `None` when nothing changed.
    pub fn apply<K: NodeKey + ?Sized>(
        &mut self,
        tree: &Tree,
        keys: &K,
    ) -> Option<Tree> {
        let mut current = tree.clone();
        let mut changed = false;

        loop {
            let resolution = match self.receiver.try_recv() {
                Ok(resolution) => resolution,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            self.submitted
                .retain(|origin| !origin.ptr_eq(&resolution.origin));

            let Some(origin) = resolution.origin.upgrade() else {
                log::debug!(
                    "discarding lazy children for released node `{}`",
                    display_path(&resolution.path)
                );
                continue;
            };
            let at_path = matches!(
                node_at_path(&current, &resolution.path, keys),
                Ok((node, _)) if Rc::ptr_eq(&node, &origin)
            );
            if !at_path {
                log::debug!(
                    "discarding stale lazy children for `{}`",
                    display_path(&resolution.path)
                );
                continue;
            }

            let children = resolution.children.into_iter().map(Rc::new).collect();
            let replacement = Rc::new(origin.with_loaded_children(children));
            match change_node_at_path(&current, &resolution.path, keys, |_, _| {
                Rc::clone(&replacement)
            }) {
                Ok(next) => {
                    current = next;
                    changed = true;
                },
                Err(err) => log::debug!("discarding lazy children: {err}"),
            }
        }

        changed.then_some(current)
    }
}

impl fmt::Debug for LazyLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyLoader")
            .field("submitted", &self.submitted.len())
            .field("load_collapsed", &self.load_collapsed)
            .finish_non_exhaustive()
    }
}
