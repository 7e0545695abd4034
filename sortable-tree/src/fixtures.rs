use crate::model::{Label, Node, Row, Tree};

/// `[A (expanded) [B, C], D]`.
pub(crate) fn sample_tree() -> Tree {
    Tree::new(vec![
        Node::new("A")
            .with_expanded(true)
            .with_children(vec![Node::new("B"), Node::new("C")]),
        Node::new("D"),
    ])
}

pub(crate) fn title(node: &Node) -> String {
    match &node.title {
        Some(Label::Text(text)) => text.clone(),
        _ => String::new(),
    }
}

pub(crate) fn titles(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|row| title(&row.node)).collect()
}
