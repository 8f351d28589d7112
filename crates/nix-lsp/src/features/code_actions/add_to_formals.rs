//! Add an undefined variable to the enclosing lambda's formals.

use std::collections::HashMap;

use lsp_types as lsp;
use nix_ast::{Node, NodeId, NodeKind};
use nix_sema::LookupResultKind;

use super::utils::quote_nix_attr_key;
use crate::convert::to_lsp_position;
use crate::state::NixTU;

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let (Some(pm), Some(vla)) = (tu.parent_map(), tu.variable_lookup()) else { return };
    let arena = &tu.parse().arena;

    let Some(var) = pm.up_to(arena, node, NodeKind::ExprVar) else { return };
    let Node::ExprVar(v) = arena.get(var) else { return };
    if vla.query(var).map(|r| r.kind) != Some(LookupResultKind::Undefined) {
        return;
    }
    let Some(name) = arena.get(v.id).as_identifier().map(|i| i.name.clone()) else { return };

    let Some(lambda) = pm.up_to(arena, node, NodeKind::ExprLambda) else { return };
    let Node::ExprLambda(l) = arena.get(lambda) else { return };
    let Some(formals_id) = l
        .arg
        .and_then(|arg| arena.get(arg).as_lambda_arg())
        .and_then(|arg| arg.formals)
    else {
        return;
    };
    let Some(formals) = arena.get(formals_id).as_formals() else { return };
    if formals.dedup.contains_key(&name) {
        return;
    }

    // Insertion point: after the last plain formal; before an only
    // ellipsis; right after `{` when the formals are empty.
    let (insert_offset, new_text) = match formals.members.as_slice() {
        [] => {
            let offset = arena.get(formals_id).range().begin.offset + 1;
            (offset, format!(" {} ", quote_nix_attr_key(&name)))
        }
        members => {
            let last = members[members.len() - 1];
            let last_is_ellipsis =
                matches!(arena.get(last), Node::Formal(f) if f.is_ellipsis());
            if last_is_ellipsis {
                if members.len() == 1 {
                    let offset = arena.get(last).range().begin.offset;
                    (offset, format!("{}, ", quote_nix_attr_key(&name)))
                } else {
                    let Some(last_plain) = members[..members.len() - 1]
                        .iter()
                        .rev()
                        .find(|m| matches!(arena.get(**m), Node::Formal(f) if !f.is_ellipsis()))
                    else {
                        return;
                    };
                    let offset = arena.get(*last_plain).range().end.offset;
                    (offset, format!(", {}", quote_nix_attr_key(&name)))
                }
            } else {
                let offset = arena.get(last).range().end.offset;
                (offset, format!(", {}", quote_nix_attr_key(&name)))
            }
        }
    };

    let position = to_lsp_position(tu.line_starts(), tu.src(), insert_offset);
    let mut changes = HashMap::new();
    changes.insert(
        uri.clone(),
        vec![lsp::TextEdit { range: lsp::Range { start: position, end: position }, new_text }],
    );
    actions.push(lsp::CodeAction {
        title: format!("add `{name}` to formals"),
        kind: Some(lsp::CodeActionKind::QUICKFIX),
        is_preferred: Some(true),
        edit: Some(lsp::WorkspaceEdit { changes: Some(changes), ..Default::default() }),
        ..Default::default()
    });
}
