use crate::model::{Children, Node};

/// Number of nodes below `node`, hidden or not.
///
/// Unresolved lazy children count as zero until they are resolved.
pub fn descendant_count(node: &Node) -> usize {
    count_below(node, false)
}

/// Number of nodes below `node` that are visible with the current expansion
/// state. A collapsed node has no visible descendants.
pub fn visible_descendant_count(node: &Node) -> usize {
    count_below(node, true)
}

pub(crate) fn count_below(node: &Node, ignore_collapsed: bool) -> usize {
    if ignore_collapsed && !node.expanded {
        return 0;
    }
    match &node.children {
        Children::Loaded(children) => children
            .iter()
            .map(|child| 1 + count_below(child, ignore_collapsed))
            .sum(),
        Children::Lazy(_) => 0,
    }
}

/// Depth of the deepest descendant relative to `node` (a leaf is `0`).
///
/// Unresolved lazy children are assumed to add one level.
pub fn depth_of(node: &Node) -> usize {
    match &node.children {
        Children::Loaded(children) => children
            .iter()
            .map(|child| 1 + depth_of(child))
            .max()
            .unwrap_or(0),
        Children::Lazy(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::TreeIndexKey;
    use crate::lazy::LazyChildren;
    use crate::model::Tree;
    use crate::walk::flatten;

    fn nested() -> Node {
        Node::new("root").with_children(vec![
            Node::new("a").with_children(vec![Node::new("a1"), Node::new("a2")]),
            Node::new("b")
                .with_expanded(true)
                .with_children(vec![Node::new("b1")]),
        ])
    }

    #[test]
    fn given_nested_node_when_counted_then_all_descendants_are_included() {
        assert_eq!(descendant_count(&nested()), 5);
    }

    #[test]
    fn given_node_when_counted_then_count_matches_full_flattening() {
        let node = nested();
        let rows = flatten(&Tree::new(vec![node.clone()]), &TreeIndexKey, false);

        assert_eq!(descendant_count(&node), rows.len() - 1);
    }

    #[test]
    fn given_collapsed_branches_when_counting_visible_then_they_are_skipped() {
        let node = nested().with_expanded(true);

        // a is collapsed, b is expanded
        assert_eq!(visible_descendant_count(&node), 3);
        assert_eq!(visible_descendant_count(&nested()), 0);
    }

    #[test]
    fn given_lazy_children_when_counted_then_branch_is_empty() {
        let node = Node::new("lazy")
            .with_expanded(true)
            .with_lazy_children(LazyChildren::new(|_request| {}));

        assert_eq!(descendant_count(&node), 0);
        assert_eq!(depth_of(&node), 1);
    }

    #[test]
    fn given_nested_node_when_depth_measured_then_deepest_level_is_returned() {
        assert_eq!(depth_of(&Node::new("leaf")), 0);
        assert_eq!(depth_of(&nested()), 2);
    }
}
