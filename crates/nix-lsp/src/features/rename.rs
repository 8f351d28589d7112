//! Rename and prepare-rename.

use std::collections::HashMap;

use lsp_types as lsp;

use crate::ast_util::{descend_position, find_definition};
use crate::convert::tu_range;
use crate::state::NixTU;

/// Text edits at the definition and every use. Pure text edits; the client
/// applies them as one workspace edit.
pub fn rename(
    tu: &NixTU,
    uri: &lsp::Uri,
    position: lsp::Position,
    new_name: &str,
) -> Result<lsp::WorkspaceEdit, &'static str> {
    let node = descend_position(tu, position).ok_or("cannot find AST node on given position")?;
    let def = find_definition(tu, node)?;
    let vla = tu.variable_lookup().ok_or("no variable analysis for this document")?;
    let definition = vla.def(def);
    let arena = &tu.parse().arena;

    let mut edits = Vec::new();
    for use_ in definition.uses() {
        edits.push(lsp::TextEdit {
            range: tu_range(tu, arena.get(*use_).range()),
            new_text: new_name.to_string(),
        });
    }
    if let Some(syntax) = definition.syntax() {
        edits.push(lsp::TextEdit {
            range: tu_range(tu, arena.get(syntax).range()),
            new_text: new_name.to_string(),
        });
    }

    let mut changes = HashMap::new();
    changes.insert(uri.clone(), edits);
    Ok(lsp::WorkspaceEdit { changes: Some(changes), ..Default::default() })
}

/// The range of the token to be replaced. Builtins and undefined variables
/// are rejected.
pub fn prepare_rename(
    tu: &NixTU,
    position: lsp::Position,
) -> Result<lsp::Range, &'static str> {
    let node = descend_position(tu, position).ok_or("cannot find AST node on given position")?;
    find_definition(tu, node)?;
    Ok(tu_range(tu, tu.parse().arena.get(node).range()))
}
