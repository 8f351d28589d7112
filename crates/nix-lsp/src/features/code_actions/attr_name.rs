//! Quote/unquote attribute names: `foo` ⇄ `"foo"`.

use lsp_types as lsp;
use nix_ast::{AttrNameForm, Node, NodeId, NodeKind};

use super::single_edit_action;
use super::utils::is_valid_nix_identifier;
use crate::state::NixTU;

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let Some(pm) = tu.parent_map() else { return };
    let arena = &tu.parse().arena;
    let Some(attr_name) = pm.up_to(arena, node, NodeKind::AttrName) else { return };
    let Node::AttrName(an) = arena.get(attr_name) else { return };

    match an.form {
        AttrNameForm::Id(id) => {
            let Some(ident) = arena.get(id).as_identifier() else { return };
            actions.push(single_edit_action(
                tu,
                uri,
                "Quote attribute name",
                lsp::CodeActionKind::REFACTOR_REWRITE,
                an.range,
                format!("\"{}\"", ident.name),
            ));
        }
        AttrNameForm::String(_) => {
            let Some(name) = arena.attr_name_static(attr_name) else { return };
            if is_valid_nix_identifier(name) {
                let name = name.to_string();
                actions.push(single_edit_action(
                    tu,
                    uri,
                    "Unquote attribute name",
                    lsp::CodeActionKind::REFACTOR_REWRITE,
                    an.range,
                    name,
                ));
            }
        }
        AttrNameForm::Interpolation(_) => {}
    }
}
