//! `x = x;` → `inherit x;` and `a = e.a;` → `inherit (e) a;`.

use lsp_types as lsp;
use nix_ast::{Node, NodeId, NodeKind};

use super::single_edit_action;
use super::utils::quote_nix_attr_key;
use crate::state::NixTU;

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let Some(pm) = tu.parent_map() else { return };
    let arena = &tu.parse().arena;
    let Some(binding) = pm.up_to(arena, node, NodeKind::Binding) else { return };
    let Node::Binding(bind) = arena.get(binding) else { return };

    // Static single-segment LHS only.
    let Some(path) = arena.get(bind.path).as_attr_path() else { return };
    let [name] = path.names.as_slice() else { return };
    let Some(attr_name) = arena.attr_name_static(*name) else { return };
    let Some(value) = bind.value else { return };

    match arena.get(value) {
        // { x = x; } -> { inherit x; }
        Node::ExprVar(var) => {
            let Some(ident) = arena.get(var.id).as_identifier() else { return };
            if ident.name != attr_name {
                return;
            }
            actions.push(single_edit_action(
                tu,
                uri,
                "Convert to `inherit`",
                lsp::CodeActionKind::REFACTOR_REWRITE,
                bind.range,
                format!("inherit {};", quote_nix_attr_key(attr_name)),
            ));
        }
        // { a = source.a; } -> { inherit (source) a; }
        Node::ExprSelect(select) => {
            if select.default.is_some() {
                return;
            }
            let Some(sel_path) = select.path.and_then(|p| arena.get(p).as_attr_path()) else {
                return;
            };
            let Some(last) = sel_path.names.last() else { return };
            if arena.attr_name_static(*last) != Some(attr_name) {
                return;
            }
            // The source is the base expression plus any intermediate
            // segments; any dynamic segment bails out.
            let mut source = arena.get(select.expr).src(tu.src()).to_string();
            for segment in &sel_path.names[..sel_path.names.len() - 1] {
                let Some(seg) = arena.attr_name_static(*segment) else { return };
                source.push('.');
                source.push_str(&quote_nix_attr_key(seg));
            }
            actions.push(single_edit_action(
                tu,
                uri,
                format!("Convert to `inherit ({source})`"),
                lsp::CodeActionKind::REFACTOR_REWRITE,
                bind.range,
                format!("inherit ({source}) {};", quote_nix_attr_key(attr_name)),
            ));
        }
        _ => {}
    }
}
