//! Find references.

use lsp_types as lsp;

use crate::ast_util::{descend_position, find_definition};
use crate::convert::tu_range;
use crate::state::NixTU;

/// Every use of the symbol under the cursor, plus the definition itself.
pub fn references(
    tu: &NixTU,
    uri: &lsp::Uri,
    position: lsp::Position,
) -> Result<Vec<lsp::Location>, &'static str> {
    let node = descend_position(tu, position).ok_or("cannot find AST node on given position")?;
    let def = find_definition(tu, node)?;
    let vla = tu.variable_lookup().ok_or("no variable analysis for this document")?;
    let definition = vla.def(def);
    let arena = &tu.parse().arena;

    let mut locations = Vec::new();
    for use_ in definition.uses() {
        locations.push(lsp::Location {
            uri: uri.clone(),
            range: tu_range(tu, arena.get(*use_).range()),
        });
    }
    if let Some(syntax) = definition.syntax() {
        locations.push(lsp::Location {
            uri: uri.clone(),
            range: tu_range(tu, arena.get(syntax).range()),
        });
    }
    Ok(locations)
}
