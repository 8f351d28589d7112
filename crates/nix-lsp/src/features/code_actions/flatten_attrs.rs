//! `k = { a = v; b = w; };` → `k.a = v; k.b = w;`.

use lsp_types as lsp;
use nix_ast::{Node, NodeArena, NodeId, NodeKind};

use super::single_edit_action;
use crate::state::NixTU;

/// A nested set is flattenable when it is non-recursive and every binding
/// is a plain static-keyed one (no inherit, no dynamic names).
fn flattenable_binds(arena: &NodeArena, attrs: &nix_ast::ExprAttrs) -> Option<NodeId> {
    if attrs.is_recursive() {
        return None;
    }
    let binds = attrs.binds?;
    let bindings = &arena.get(binds).as_binds()?.bindings;
    if bindings.is_empty() {
        return None;
    }
    for child in bindings {
        let Node::Binding(bind) = arena.get(*child) else { return None };
        let path = arena.get(bind.path).as_attr_path()?;
        if path.names.iter().any(|n| !arena.attr_name_is_static(*n)) {
            return None;
        }
    }
    Some(binds)
}

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let Some(pm) = tu.parent_map() else { return };
    let arena = &tu.parse().arena;
    let Some(binding) = pm.up_to(arena, node, NodeKind::Binding) else { return };
    let Node::Binding(bind) = arena.get(binding) else { return };

    let Some(value) = bind.value else { return };
    let Node::ExprAttrs(nested) = arena.get(value) else { return };
    let Some(nested_binds) = flattenable_binds(arena, nested) else { return };

    let Some(outer_path) = arena.get(bind.path).as_attr_path() else { return };
    if outer_path.names.iter().any(|n| !arena.attr_name_is_static(*n)) {
        return;
    }
    let outer = arena.get(bind.path).src(tu.src());

    let Some(bindings) = arena.get(nested_binds).as_binds().map(|b| &b.bindings) else {
        return;
    };
    let mut new_text = String::new();
    for (index, child) in bindings.iter().enumerate() {
        let Node::Binding(inner) = arena.get(*child) else { return };
        new_text.push_str(outer);
        new_text.push('.');
        new_text.push_str(arena.get(inner.path).src(tu.src()));
        new_text.push_str(" = ");
        if let Some(inner_value) = inner.value {
            new_text.push_str(arena.get(inner_value).src(tu.src()));
        }
        new_text.push(';');
        if index + 1 < bindings.len() {
            new_text.push(' ');
        }
    }

    actions.push(single_edit_action(
        tu,
        uri,
        "Flatten nested attribute set",
        lsp::CodeActionKind::REFACTOR_REWRITE,
        bind.range,
        new_text,
    ));
}
