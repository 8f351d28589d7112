//! Code actions: quick fixes from diagnostics, plus structural refactors.
//!
//! Every action is a pure text edit packaged as a single workspace edit;
//! nothing mutates the AST in place.

mod add_to_formals;
mod attr_name;
mod convert_to_inherit;
mod extract_to_file;
mod flatten_attrs;
mod inherit_to_binding;
mod json_to_nix;
mod pack_attrs;
mod rewrite_string;
mod utils;
mod with_to_let;

use std::collections::HashMap;

use lsp_types as lsp;

use crate::convert::{to_lsp_text_edit, to_offset, tu_range};
use crate::state::NixTU;

pub fn code_actions(tu: &NixTU, uri: &lsp::Uri, range: lsp::Range) -> Vec<lsp::CodeAction> {
    let mut actions = Vec::new();
    let selection = (to_offset(tu, range.start), to_offset(tu, range.end));
    let (Some(start), Some(end)) = selection else { return actions };

    // Quick fixes: every diagnostic intersecting the selection exposes its
    // fix-its.
    for diag in tu.diagnostics() {
        let d_range = diag.range();
        if d_range.begin.offset > end || start > d_range.end.offset {
            continue;
        }
        for fix in diag.fixes() {
            let edits: Vec<lsp::TextEdit> =
                fix.edits().iter().map(|e| to_lsp_text_edit(tu, e)).collect();
            let mut changes = HashMap::new();
            changes.insert(uri.clone(), edits);
            actions.push(lsp::CodeAction {
                title: fix.message().to_string(),
                kind: Some(lsp::CodeActionKind::QUICKFIX),
                diagnostics: Some(vec![crate::convert::lsp_diagnostics(tu, uri, diag)
                    .into_iter()
                    .next()
                    .unwrap_or_default()]),
                edit: Some(lsp::WorkspaceEdit {
                    changes: Some(changes),
                    ..Default::default()
                }),
                ..Default::default()
            });
        }
    }

    // Structural refactors on the node under the cursor.
    if let Some(root) = tu.root() {
        if let Some(node) = tu.parse().arena.descend(root, start, start) {
            attr_name::add(tu, node, uri, &mut actions);
            convert_to_inherit::add(tu, node, uri, &mut actions);
            inherit_to_binding::add(tu, node, uri, &mut actions);
            flatten_attrs::add(tu, node, uri, &mut actions);
            pack_attrs::add(tu, node, uri, &mut actions);
            add_to_formals::add(tu, node, uri, &mut actions);
            with_to_let::add(tu, node, uri, &mut actions);
            rewrite_string::add(tu, node, uri, &mut actions);
            extract_to_file::add(tu, node, uri, &mut actions);
        }
    }

    // JSON conversion works on the raw selection.
    json_to_nix::add(tu, uri, range, &mut actions);

    actions
}

/// Shorthand used by the refactor modules.
pub(crate) fn single_edit_action(
    tu: &NixTU,
    uri: &lsp::Uri,
    title: impl Into<String>,
    kind: lsp::CodeActionKind,
    range: nix_position_tracking::LexerCursorRange,
    new_text: String,
) -> lsp::CodeAction {
    utils::create_single_edit_action(title.into(), kind, uri, tu_range(tu, range), new_text)
}
