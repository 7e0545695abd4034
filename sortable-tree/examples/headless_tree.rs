use sortable_tree::{
    DropResult, Key, LazyChildren, Node, SortableTree, Tree, TreeCommand,
    TreeEffect, TreeId,
};

fn project_tree() -> Tree {
    let generated = LazyChildren::new(|request| {
        log::info!("loading children of row {}", request.tree_index);
        request.done.done(vec![
            Node::new("bindings.rs").with_data("id", "bindings"),
            Node::new("schema.rs").with_data("id", "schema"),
        ]);
    });

    Tree::new(vec![
        Node::new("src")
            .with_data("id", "src")
            .with_expanded(true)
            .with_children(vec![
                Node::new("main.rs").with_data("id", "main"),
                Node::new("model.rs").with_data("id", "model"),
                Node::new("view.rs").with_data("id", "view"),
            ]),
        Node::new("generated")
            .with_data("id", "generated")
            .with_lazy_children(generated),
        Node::new("Cargo.toml")
            .with_subtitle("manifest")
            .with_data("id", "manifest"),
    ])
}

fn print_rows<K: sortable_tree::NodeKey>(label: &str, tree: &SortableTree<K>) {
    println!("-- {label}");
    let render = tree.rows();
    for (index, view) in render.rows.iter().enumerate() {
        let title = view
            .row
            .node
            .title
            .as_ref()
            .map(|title| {
                title.text(&sortable_tree::LabelContext {
                    node: &view.row.node,
                    path: &view.row.path,
                    tree_index: view.row.tree_index,
                })
            })
            .unwrap_or_default();
        let marker = match (view.is_search_focus, view.is_search_match) {
            (true, _) => "*",
            (false, true) => "+",
            (false, false) => " ",
        };
        let dragged = render.swap.is_some_and(|swap| {
            index >= swap.from && index < swap.from + swap.length
        });
        println!(
            "{marker} {}{title}{}",
            "  ".repeat(view.row.depth()),
            if dragged { "  <- dragging" } else { "" }
        );
    }
}

fn report(effects: &[TreeEffect]) {
    for effect in effects {
        match effect {
            TreeEffect::Changed { tree } => {
                log::debug!("tree changed, {} roots", tree.len());
            },
            TreeEffect::NodeMoved(outcome) => log::info!(
                "moved from {:?} to {:?}",
                outcome.prev_tree_index,
                outcome.next_tree_index
            ),
            TreeEffect::SearchFinished { matches } => {
                log::info!("{} search matches", matches.len());
            },
            other => log::debug!("{other:?}"),
        }
    }
}

fn main() {
    env_logger::init();

    let mut tree = SortableTree::new(project_tree())
        .with_keys(sortable_tree::FieldKey::new("id"));
    report(&tree.mount());
    print_rows("initial", &tree);

    report(&tree.reduce(TreeCommand::ToggleChildrenVisibility {
        path: vec![Key::from("generated")],
    }));
    print_rows("generated expanded", &tree);

    report(&tree.reduce(TreeCommand::SetSearchQuery {
        query: String::from(".rs"),
    }));
    report(&tree.reduce(TreeCommand::SetSearchFocusOffset { offset: Some(2) }));
    print_rows("search for .rs", &tree);

    report(&tree.reduce(TreeCommand::StartDrag {
        path: vec![Key::from("src"), Key::from("main")],
    }));
    report(&tree.reduce(TreeCommand::DragHover {
        depth: 0,
        minimum_tree_index: 7,
    }));
    print_rows("dragging main.rs", &tree);

    report(&tree.reduce(TreeCommand::Drop {
        depth: 0,
        minimum_tree_index: 7,
    }));
    print_rows("dropped", &tree);

    report(&tree.reduce(TreeCommand::StartDrag {
        path: vec![Key::from("manifest")],
    }));
    report(&tree.reduce(TreeCommand::EndDrag {
        result: DropResult::Outside {
            target: TreeId::new(),
        },
    }));
    print_rows("Cargo.toml dropped into another tree", &tree);
}
