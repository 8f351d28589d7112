//! Code completion from the scope tree.

use lsp_types as lsp;
use nix_ast::Node;
use nix_sema::{EnvId, VariableLookupAnalysis};

use crate::ast_util::{descend_position, up_env};
use crate::state::NixTU;

/// Keep completion lists small; anything longer is marked incomplete and
/// recomputed as the user types.
const MAX_COMPLETION_SIZE: usize = 30;

/// Collect every name visible in the environment at the cursor, filtered by
/// the identifier prefix under it.
pub fn completion(tu: &NixTU, position: lsp::Position) -> lsp::CompletionList {
    let mut list = lsp::CompletionList { is_incomplete: false, items: Vec::new() };
    let Some(node) = descend_position(tu, position) else { return list };
    let Some(vla) = tu.variable_lookup() else { return list };

    let prefix = match tu.parse().arena.get(node) {
        Node::Identifier(ident) => ident.name.clone(),
        _ => String::new(),
    };

    let Some(env) = up_env(tu, node) else { return list };
    list.is_incomplete = collect_defs(vla, Some(env), &prefix, &mut list.items);
    list
}

/// Collect definitions of an env and its ancestors, outermost first.
/// Returns true when the list was truncated.
fn collect_defs(
    vla: &VariableLookupAnalysis,
    env: Option<EnvId>,
    prefix: &str,
    items: &mut Vec<lsp::CompletionItem>,
) -> bool {
    let Some(env) = env else { return false };
    if collect_defs(vla, vla.env(env).parent(), prefix, items) {
        return true;
    }
    for (name, def) in vla.env(env).defs() {
        // Nix internal spellings, not meant to be typed.
        if name.starts_with("__") {
            continue;
        }
        if !name.starts_with(prefix) {
            continue;
        }
        if items.len() >= MAX_COMPLETION_SIZE {
            return true;
        }
        let kind = if vla.def(*def).is_builtin() {
            lsp::CompletionItemKind::KEYWORD
        } else {
            lsp::CompletionItemKind::VARIABLE
        };
        items.push(lsp::CompletionItem {
            label: name.clone(),
            kind: Some(kind),
            ..Default::default()
        });
    }
    false
}
