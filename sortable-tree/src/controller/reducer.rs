use std::rc::Rc;

use super::command::{DropResult, TreeCommand};
use super::event::TreeEffect;
use super::state::TreeState;
use super::{TreeHooks, TreeId};
use crate::drag::{DragSession, DragSource, clamp_depth};
use crate::insert::Placement;
use crate::key::NodeKey;
use crate::memo::MemoCache;
use crate::model::{Node, NodeRef, Tree, TreePath, display_path};
use crate::mutate::change_node_at_path;
use crate::search::{FindOptions, default_search_method, find};
use crate::settings::TreeSettings;

/// Runtime context for the tree reducer.
pub struct TreeCtx<'a, K: ?Sized> {
    pub keys: &'a K,
    pub settings: &'a TreeSettings,
    pub hooks: &'a TreeHooks,
    pub memo: &'a MemoCache,
    pub tree_id: TreeId,
}

/// Resolve lazy children and run the initial search pass.
pub(super) fn mount<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    ctx: &TreeCtx<'_, K>,
) -> Vec<TreeEffect> {
    let mut effects = Vec::new();
    let tree = state.tree().clone();
    let settled = settle_lazy(state, tree.clone(), ctx.keys);
    if !settled.ptr_eq(&tree) {
        state.set_tree(settled.clone());
        effects.push(TreeEffect::Changed { tree: settled });
    }
    search(state, ctx, &mut effects, SearchPass::REFRESH);
    effects
}

/// Reduce a tree command into state updates and effects.
pub(super) fn reduce<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    command: TreeCommand,
    ctx: &TreeCtx<'_, K>,
) -> Vec<TreeEffect> {
    let mut effects = Vec::new();
    match command {
        TreeCommand::ReplaceTree { tree } => {
            if !tree.ptr_eq(state.tree()) {
                commit_tree(state, tree, ctx, &mut effects, true);
            }
        },
        TreeCommand::ToggleChildrenVisibility { path } => {
            reduce_toggle(state, path, ctx, &mut effects);
        },
        TreeCommand::SetSearchQuery { query } => {
            if state.set_search_query(query) {
                search(state, ctx, &mut effects, SearchPass::QUERY);
            }
        },
        TreeCommand::SetSearchFocusOffset { offset } => {
            if state.set_search_focus_offset(offset) {
                search(state, ctx, &mut effects, SearchPass::FOCUS);
            }
        },
        TreeCommand::StartDrag { path } => {
            reduce_start_drag(state, path, ctx, &mut effects);
        },
        TreeCommand::StartExternalDrag { node } => {
            reduce_start_external_drag(state, node, &mut effects);
        },
        TreeCommand::DragHover {
            depth,
            minimum_tree_index,
        } => reduce_drag_hover(state, depth, minimum_tree_index, ctx),
        TreeCommand::Drop {
            depth,
            minimum_tree_index,
        } => reduce_drop(state, depth, minimum_tree_index, ctx, &mut effects),
        TreeCommand::EndDrag { result } => {
            reduce_end_drag(state, result, ctx, &mut effects);
        },
        TreeCommand::DragMonitorEnded => cancel_drag(state, &mut effects),
        TreeCommand::ApplyLazyChildren => {
            let tree = state.tree().clone();
            let settled = settle_lazy(state, tree.clone(), ctx.keys);
            if !settled.ptr_eq(&tree) {
                commit_tree(state, settled, ctx, &mut effects, true);
            }
        },
    }
    effects
}

// ---------------------------------------------------------------------------
// Tree updates
// ---------------------------------------------------------------------------

/// Store a new tree: resolve ready lazy children, drop any drag in flight
/// and refresh search matches.
fn commit_tree<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    tree: Tree,
    ctx: &TreeCtx<'_, K>,
    effects: &mut Vec<TreeEffect>,
    refresh_search: bool,
) {
    let tree = settle_lazy(state, tree, ctx.keys);
    state.set_tree(tree.clone());
    effects.push(TreeEffect::Changed { tree });

    if state.take_drag().is_some() {
        effects.push(TreeEffect::DragStateChanged { is_dragging: false });
    }
    if refresh_search {
        search(state, ctx, effects, SearchPass::REFRESH);
    }
}

/// Start pending providers and fold completions that are already done.
/// Nodes whose completion went stale are requested again.
fn settle_lazy<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    mut tree: Tree,
    keys: &K,
) -> Tree {
    let lazy = state.lazy_mut();
    lazy.scan(&tree, keys);
    loop {
        match lazy.apply(&tree, keys) {
            Some(next) => tree = next,
            None if lazy.scan(&tree, keys) > 0 => continue,
            None => return tree,
        }
        lazy.scan(&tree, keys);
    }
}

fn reduce_toggle<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    path: TreePath,
    ctx: &TreeCtx<'_, K>,
    effects: &mut Vec<TreeEffect>,
) {
    let mut toggled = None;
    let result = change_node_at_path(state.tree(), &path, ctx.keys, |node, _| {
        let next = Rc::new(Node::clone(node).with_expanded(!node.expanded));
        toggled = Some(Rc::clone(&next));
        next
    });

    match result {
        Ok(tree) => {
            commit_tree(state, tree, ctx, effects, true);
            if let Some(node) = toggled {
                effects.push(TreeEffect::VisibilityToggled {
                    expanded: node.expanded,
                    node,
                    path,
                });
            }
        },
        Err(err) => log::warn!("toggle children visibility failed: {err}"),
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct SearchPass {
    seek_index: bool,
    expand: bool,
    single_search: bool,
}

impl SearchPass {
    /// After the tree changed: report matches only.
    const REFRESH: Self = Self {
        seek_index: false,
        expand: false,
        single_search: false,
    };
    const QUERY: Self = Self {
        seek_index: true,
        expand: true,
        single_search: false,
    };
    const FOCUS: Self = Self {
        seek_index: true,
        expand: true,
        single_search: true,
    };
}

fn search<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    ctx: &TreeCtx<'_, K>,
    effects: &mut Vec<TreeEffect>,
    pass: SearchPass,
) {
    let method = ctx.hooks.search_method();
    if state.search_query().is_empty() && method.is_none() {
        state.set_search_matches(Vec::new());
        effects.push(TreeEffect::SearchFinished {
            matches: Vec::new(),
        });
        return;
    }

    let options = FindOptions {
        expand_all_match_paths: pass.expand && !pass.single_search,
        expand_focus_match_paths: pass.expand,
        search_focus_offset: state.search_focus_offset(),
        collapse_before_search: ctx.settings.only_expand_searched_nodes,
    };
    let query = state.search_query();
    let outcome = match method {
        Some(method) => find(state.tree(), ctx.keys, query, method, &options),
        None => find(
            state.tree(),
            ctx.keys,
            query,
            &default_search_method,
            &options,
        ),
    };

    if pass.expand && !outcome.tree.ptr_eq(state.tree()) {
        commit_tree(state, outcome.tree, ctx, effects, false);
    }

    let focus = state
        .search_focus_offset()
        .and_then(|offset| outcome.matches.get(offset))
        .and_then(|found| found.tree_index);
    effects.push(TreeEffect::SearchFinished {
        matches: outcome.matches.clone(),
    });
    if pass.seek_index {
        if let Some(tree_index) = focus {
            effects.push(TreeEffect::ScrollToRow { tree_index });
        }
    }
    state.set_search_matches(outcome.matches);
}

// ---------------------------------------------------------------------------
// Drag and drop
// ---------------------------------------------------------------------------

fn reduce_start_drag<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    path: TreePath,
    ctx: &TreeCtx<'_, K>,
    effects: &mut Vec<TreeEffect>,
) {
    if let Some(can_drag) = ctx.hooks.can_drag() {
        let rows = ctx.memo.flatten(state.tree(), ctx.keys, true);
        if rows.iter().any(|row| row.path == path && !can_drag(row)) {
            log::debug!("drag rejected at `{}`", display_path(&path));
            return;
        }
    }

    match DragSession::start(state.tree(), &path, ctx.keys) {
        Ok(session) => {
            if state.is_dragging() {
                log::debug!("drag started while another drag was in flight");
            }
            state.set_drag(session);
            effects.push(TreeEffect::DragStateChanged { is_dragging: true });
        },
        Err(err) => log::warn!("drag start failed: {err}"),
    }
}

fn reduce_start_external_drag(
    state: &mut TreeState,
    node: NodeRef,
    effects: &mut Vec<TreeEffect>,
) {
    let session = DragSession::external(state.tree(), node);
    state.set_drag(session);
    effects.push(TreeEffect::DragStateChanged { is_dragging: true });
}

fn reduce_drag_hover<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    depth: usize,
    minimum_tree_index: usize,
    ctx: &TreeCtx<'_, K>,
) {
    let Some(session) = state.drag_mut() else {
        log::debug!("drag hover ignored: no drag in flight");
        return;
    };
    let depth = clamp_depth(depth, ctx.settings.max_depth, session.node());
    let placement = Placement::new(depth, minimum_tree_index);
    if let Err(err) = session.hover(placement, ctx.keys, ctx.memo) {
        log::warn!("drag hover failed: {err}");
    }
}

fn reduce_drop<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    depth: usize,
    minimum_tree_index: usize,
    ctx: &TreeCtx<'_, K>,
    effects: &mut Vec<TreeEffect>,
) {
    let Some(session) = state.take_drag() else {
        log::warn!("drop ignored: no drag in flight");
        return;
    };
    let depth = clamp_depth(depth, ctx.settings.max_depth, session.node());
    let placement = Placement::new(depth, minimum_tree_index);

    let target = match session.target(placement, ctx.keys, ctx.memo) {
        Ok(target) => target,
        Err(err) => {
            log::warn!("drop failed: {err}");
            effects.push(TreeEffect::DragStateChanged { is_dragging: false });
            return;
        },
    };
    let parent_accepts =
        match (&target.parent, ctx.hooks.can_node_have_children()) {
            (Some(parent), Some(can_have_children)) => can_have_children(parent),
            _ => true,
        };
    let accepted = parent_accepts
        && ctx.hooks.can_drop().is_none_or(|can_drop| {
            can_drop(&session.can_drop_params(&target))
        });
    if !accepted {
        log::debug!("drop rejected at tree index {}", target.tree_index);
        effects.push(TreeEffect::DragStateChanged { is_dragging: false });
        return;
    }

    let outcome = session.finish(target);
    commit_tree(state, outcome.tree.clone(), ctx, effects, true);
    effects.push(TreeEffect::NodeMoved(outcome));
    effects.push(TreeEffect::DragStateChanged { is_dragging: false });
}

fn reduce_end_drag<K: NodeKey + ?Sized>(
    state: &mut TreeState,
    result: DropResult,
    ctx: &TreeCtx<'_, K>,
    effects: &mut Vec<TreeEffect>,
) {
    let target = match result {
        DropResult::Cancelled => return cancel_drag(state, effects),
        DropResult::Outside { target } => target,
    };
    // A drop on this tree was already handled by `Drop`.
    if target == ctx.tree_id {
        return cancel_drag(state, effects);
    }
    let Some(session) = state.take_drag() else {
        log::debug!("outside drop ignored: no drag in flight");
        return;
    };

    let copy = match (session.source(), ctx.hooks.copy_on_outside_drop()) {
        (DragSource::External, _) => {
            effects.push(TreeEffect::DragStateChanged { is_dragging: false });
            return;
        },
        (DragSource::Internal { path, tree_index, .. }, Some(should_copy)) => {
            should_copy(session.node(), path.as_slice(), *tree_index)
        },
        (DragSource::Internal { .. }, None) => {
            ctx.settings.should_copy_on_outside_drop
        },
    };

    match session.drop_outside(copy, ctx.keys) {
        Ok(outcome) => {
            commit_tree(state, outcome.tree.clone(), ctx, effects, true);
            effects.push(TreeEffect::NodeMoved(outcome));
        },
        Err(err) => log::warn!("outside drop failed: {err}"),
    }
    effects.push(TreeEffect::DragStateChanged { is_dragging: false });
}

fn cancel_drag(state: &mut TreeState, effects: &mut Vec<TreeEffect>) {
    let Some(session) = state.take_drag() else {
        return;
    };
    state.set_tree(session.cancel());
    effects.push(TreeEffect::DragStateChanged { is_dragging: false });
}
