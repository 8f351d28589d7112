//! Go to definition / declaration.

use lsp_types as lsp;

use crate::ast_util::{descend_position, find_definition};
use crate::convert::tu_range;
use crate::state::NixTU;

/// Resolve the variable under the cursor to its definition's location.
pub fn definition(
    tu: &NixTU,
    uri: &lsp::Uri,
    position: lsp::Position,
) -> Result<lsp::Location, &'static str> {
    let node = descend_position(tu, position).ok_or("cannot find AST node on given position")?;
    let def = find_definition(tu, node)?;
    let vla = tu.variable_lookup().ok_or("no variable analysis for this document")?;
    let syntax = vla.def(def).syntax().ok_or("definition has no syntax")?;
    let range = tu_range(tu, tu.parse().arena.get(syntax).range());
    Ok(lsp::Location { uri: uri.clone(), range })
}
