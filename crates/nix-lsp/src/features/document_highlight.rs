//! Document highlight.

use lsp_types as lsp;

use crate::ast_util::{descend_position, find_definition};
use crate::convert::tu_range;
use crate::state::NixTU;

/// Uses are "read" highlights; the definition itself is a "write".
/// Returns an empty list when nothing resolves — the client calls this on
/// every cursor move, so errors would only be noise.
pub fn document_highlight(
    tu: &NixTU,
    position: lsp::Position,
) -> Vec<lsp::DocumentHighlight> {
    let Some(node) = descend_position(tu, position) else { return Vec::new() };
    let Ok(def) = find_definition(tu, node) else { return Vec::new() };
    let Some(vla) = tu.variable_lookup() else { return Vec::new() };
    let definition = vla.def(def);
    let arena = &tu.parse().arena;

    let mut highlights = Vec::new();
    for use_ in definition.uses() {
        highlights.push(lsp::DocumentHighlight {
            range: tu_range(tu, arena.get(*use_).range()),
            kind: Some(lsp::DocumentHighlightKind::READ),
        });
    }
    if let Some(syntax) = definition.syntax() {
        highlights.push(lsp::DocumentHighlight {
            range: tu_range(tu, arena.get(syntax).range()),
            kind: Some(lsp::DocumentHighlightKind::WRITE),
        });
    }
    highlights
}
