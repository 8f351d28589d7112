//! `inherit x;` → `x = x;` and `inherit (e) x;` → `x = e.x;`.

use lsp_types as lsp;
use nix_ast::{Node, NodeId, NodeKind};

use super::single_edit_action;
use crate::state::NixTU;

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let Some(pm) = tu.parent_map() else { return };
    let arena = &tu.parse().arena;
    let Some(inherit) = pm.up_to(arena, node, NodeKind::Inherit) else { return };
    let Node::Inherit(inh) = arena.get(inherit) else { return };

    // Only single-name inherits convert cleanly.
    let [name] = inh.names.as_slice() else { return };
    let Some(attr_name) = arena.attr_name_static(*name) else { return };

    let new_text = match inh.expr {
        Some(expr) => {
            format!("{attr_name} = {}.{attr_name};", arena.get(expr).src(tu.src()))
        }
        None => format!("{attr_name} = {attr_name};"),
    };
    actions.push(single_edit_action(
        tu,
        uri,
        "Convert to explicit binding",
        lsp::CodeActionKind::REFACTOR_REWRITE,
        inh.range,
        new_text,
    ));
}
