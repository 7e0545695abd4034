use std::cell::RefCell;
use std::rc::Rc;

use crate::count::count_below;
use crate::errors::TreeError;
use crate::insert::{InsertedNode, Placement, insert_node};
use crate::key::NodeKey;
use crate::model::{NodeRef, Row, Tree};
use crate::walk::flatten;

/// Single-entry caches over the hot derivations of a drag loop.
///
/// Each entry remembers the most recent call and is keyed by the identity
/// of its tree and node arguments, the key resolver and the scalar
/// arguments. Entries hold strong references to their tree and node
/// inputs, so those identities can never be reused by a different value
/// while cached. Resolvers are borrowed: call [`MemoCache::invalidate`]
/// after mutating one in place.
#[derive(Debug, Default)]
pub struct MemoCache {
    rows: RefCell<Option<RowsEntry>>,
    inserted: RefCell<Option<InsertEntry>>,
    count: RefCell<Option<(NodeRef, bool, usize)>>,
}

/// Type and address of a borrowed key resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolverId {
    type_name: &'static str,
    address: usize,
}

impl ResolverId {
    fn of<K: ?Sized>(keys: &K) -> Self {
        Self {
            type_name: std::any::type_name::<K>(),
            address: (keys as *const K).cast::<()>().addr(),
        }
    }
}

#[derive(Debug)]
struct RowsEntry {
    tree: Tree,
    resolver: ResolverId,
    ignore_collapsed: bool,
    rows: Rc<[Row]>,
}

#[derive(Debug)]
struct InsertEntry {
    tree: Tree,
    resolver: ResolverId,
    node: NodeRef,
    placement: Placement,
    expand_parent: bool,
    inserted: InsertedNode,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized [`flatten`].
    pub fn flatten<K: NodeKey + ?Sized>(
        &self,
        tree: &Tree,
        keys: &K,
        ignore_collapsed: bool,
    ) -> Rc<[Row]> {
        let resolver = ResolverId::of(keys);
        if let Some(entry) = self.rows.borrow().as_ref() {
            if entry.tree.ptr_eq(tree)
                && entry.resolver == resolver
                && entry.ignore_collapsed == ignore_collapsed
            {
                return Rc::clone(&entry.rows);
            }
        }

        let rows: Rc<[Row]> = Rc::from(flatten(tree, keys, ignore_collapsed));
        *self.rows.borrow_mut() = Some(RowsEntry {
            tree: tree.clone(),
            resolver,
            ignore_collapsed,
            rows: Rc::clone(&rows),
        });
        rows
    }

    /// Memoized [`insert_node`]. Failures are not cached.
    pub fn insert_node<K: NodeKey + ?Sized>(
        &self,
        tree: &Tree,
        node: &NodeRef,
        placement: Placement,
        expand_parent: bool,
        keys: &K,
    ) -> Result<InsertedNode, TreeError> {
        let resolver = ResolverId::of(keys);
        if let Some(entry) = self.inserted.borrow().as_ref() {
            if entry.tree.ptr_eq(tree)
                && entry.resolver == resolver
                && Rc::ptr_eq(&entry.node, node)
                && entry.placement == placement
                && entry.expand_parent == expand_parent
            {
                return Ok(entry.inserted.clone());
            }
        }

        let inserted =
            insert_node(tree, Rc::clone(node), placement, expand_parent, keys)?;
        *self.inserted.borrow_mut() = Some(InsertEntry {
            tree: tree.clone(),
            resolver,
            node: Rc::clone(node),
            placement,
            expand_parent,
            inserted: inserted.clone(),
        });
        Ok(inserted)
    }

    /// Memoized [`crate::descendant_count`], or
    /// [`crate::visible_descendant_count`] with `ignore_collapsed`.
    pub fn descendant_count(
        &self,
        node: &NodeRef,
        ignore_collapsed: bool,
    ) -> usize {
        if let Some((cached, ignoring, count)) = self.count.borrow().as_ref() {
            if Rc::ptr_eq(cached, node) && *ignoring == ignore_collapsed {
                return *count;
            }
        }

        let count = count_below(node, ignore_collapsed);
        *self.count.borrow_mut() =
            Some((Rc::clone(node), ignore_collapsed, count));
        count
    }

    /// Drop every entry.
    pub fn invalidate(&self) {
        self.rows.borrow_mut().take();
        self.inserted.borrow_mut().take();
        self.count.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::fixtures::sample_tree;
    use crate::key::{FieldKey, TreeIndexKey};
    use crate::model::{Key, Node};

    #[test]
    fn given_same_tree_when_flattened_twice_then_rows_are_reused() {
        let calls = Cell::new(0);
        let keys = |index: usize, _node: &Node| {
            calls.set(calls.get() + 1);
            Key::Index(index)
        };
        let cache = MemoCache::new();
        let tree = sample_tree();

        let first = cache.flatten(&tree, &keys, true);
        let second = cache.flatten(&tree.clone(), &keys, true);

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn given_new_tree_or_arguments_when_flattened_then_rows_are_recomputed() {
        let cache = MemoCache::new();
        let tree = sample_tree();
        let first = cache.flatten(&tree, &TreeIndexKey, true);

        let all = cache.flatten(&tree, &TreeIndexKey, false);
        let other = cache.flatten(&sample_tree(), &TreeIndexKey, false);

        assert!(!Rc::ptr_eq(&first, &all));
        assert!(!Rc::ptr_eq(&all, &other));
    }

    #[test]
    fn given_other_resolver_when_flattened_then_rows_use_its_keys() {
        let cache = MemoCache::new();
        let tree = Tree::new(vec![
            Node::new("A").with_data("id", "a").with_data("name", "alpha"),
        ]);
        let by_id = FieldKey::new("id");
        let by_name = FieldKey::new("name");

        let ids = cache.flatten(&tree, &by_id, true);
        let names = cache.flatten(&tree, &by_name, true);
        let ids_again = cache.flatten(&tree, &by_id, true);

        assert_eq!(ids[0].path, vec![Key::from("a")]);
        assert_eq!(names[0].path, vec![Key::from("alpha")]);
        assert!(!Rc::ptr_eq(&ids, &ids_again));
        assert_eq!(ids_again[0].path, vec![Key::from("a")]);
    }

    #[test]
    fn given_other_resolver_when_inserted_then_path_uses_its_keys() {
        let cache = MemoCache::new();
        let tree = Tree::new(vec![
            Node::new("A").with_data("id", "a").with_data("name", "alpha"),
        ]);
        let node = Node::new("N")
            .with_data("id", "n")
            .with_data("name", "nu")
            .into_ref();
        let placement = Placement::new(0, 1);
        let id_keys = FieldKey::new("id");
        let name_keys = FieldKey::new("name");

        let by_id = cache
            .insert_node(&tree, &node, placement, true, &id_keys)
            .unwrap();
        let by_name = cache
            .insert_node(&tree, &node, placement, true, &name_keys)
            .unwrap();

        assert_eq!(by_id.path, vec![Key::from("n")]);
        assert_eq!(by_name.path, vec![Key::from("nu")]);
    }

    #[test]
    fn given_same_hover_when_inserted_twice_then_tree_is_reused() {
        let cache = MemoCache::new();
        let tree = sample_tree();
        let node = Node::new("N").into_ref();
        let placement = Placement::new(0, 1);

        let first = cache
            .insert_node(&tree, &node, placement, true, &TreeIndexKey)
            .unwrap();
        let second = cache
            .insert_node(&tree, &node, placement, true, &TreeIndexKey)
            .unwrap();
        let moved = cache
            .insert_node(&tree, &node, Placement::new(0, 0), true, &TreeIndexKey)
            .unwrap();

        assert!(first.tree.ptr_eq(&second.tree));
        assert!(!first.tree.ptr_eq(&moved.tree));
        assert_eq!(moved.tree_index, 0);
    }

    #[test]
    fn given_invalidated_cache_when_flattened_then_rows_are_recomputed() {
        let cache = MemoCache::new();
        let tree = sample_tree();
        let first = cache.flatten(&tree, &TreeIndexKey, true);

        cache.invalidate();
        let second = cache.flatten(&tree, &TreeIndexKey, true);

        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn given_same_node_when_counted_twice_then_count_is_cached() {
        let cache = MemoCache::new();
        let tree = sample_tree();
        let folder = Node::new("F")
            .with_children(vec![Node::new("x"), Node::new("y")])
            .into_ref();

        assert_eq!(cache.descendant_count(&tree.roots()[0], false), 2);
        assert_eq!(cache.descendant_count(&tree.roots()[0], false), 2);
        assert_eq!(cache.descendant_count(&tree.roots()[1], false), 0);
        assert_eq!(cache.descendant_count(&folder, false), 2);
        assert_eq!(cache.descendant_count(&folder, true), 0);
    }
}
