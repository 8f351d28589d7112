//! `with src; body` → `let inherit (src) u1 u2 ...; in body` where the
//! `uᵢ` are the names actually used from the with's scope.

use std::collections::BTreeSet;

use lsp_types as lsp;
use nix_ast::{Node, NodeArena, NodeId, NodeKind};

use super::single_edit_action;
use crate::state::NixTU;

/// Unwrap `(expr)` nesting.
fn unwrap_paren(arena: &NodeArena, mut expr: NodeId) -> NodeId {
    while let Node::ExprParen(paren) = arena.get(expr) {
        match paren.expr {
            Some(inner) => expr = inner,
            None => break,
        }
    }
    expr
}

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let (Some(pm), Some(vla)) = (tu.parent_map(), tu.variable_lookup()) else { return };
    let arena = &tu.parse().arena;
    let Some(with_id) = pm.up_to(arena, node, NodeKind::ExprWith) else { return };
    let Node::ExprWith(with) = arena.get(with_id) else { return };

    // Only when the cursor is on the `with` keyword itself.
    let kw_range = arena.get(with.kw_with).range();
    let node_range = arena.get(node).range();
    if node_range.begin.offset > kw_range.end.offset
        || node_range.end.offset < kw_range.begin.offset
    {
        return;
    }

    // Converting an outer `with` of a nested chain would shadow the inner
    // scope, changing resolution.
    let (Some(source), Some(body)) = (with.with, with.expr) else { return };
    if arena.get(unwrap_paren(arena, body)).kind() == NodeKind::ExprWith {
        return;
    }

    // Names actually taken from this scope.
    let Some(def) = vla.with_def(with_id) else { return };
    let mut names: BTreeSet<String> = BTreeSet::new();
    for use_ in vla.def(def).uses() {
        if let Node::ExprVar(var) = arena.get(*use_) {
            if let Some(ident) = arena.get(var.id).as_identifier() {
                names.insert(ident.name.clone());
            }
        }
    }
    // An unused with is the "remove with" quickfix's business.
    if names.is_empty() {
        return;
    }

    let mut new_text = format!("let inherit ({})", arena.get(source).src(tu.src()));
    for name in &names {
        new_text.push(' ');
        new_text.push_str(name);
    }
    new_text.push_str("; in ");
    new_text.push_str(arena.get(body).src(tu.src()));

    actions.push(single_edit_action(
        tu,
        uri,
        "Convert `with` to `let/inherit`",
        lsp::CodeActionKind::REFACTOR_REWRITE,
        with.range,
        new_text,
    ));
}
