//! Hover.

use lsp_types as lsp;

use crate::ast_util::{descend_position, get_scope_and_prefix, have_package_scope};
use crate::convert::tu_range;
use crate::eval::{self, PROVIDER_DEADLINE, PackageInfoProvider};
use crate::state::NixTU;

/// A short markdown card for the node under the cursor. Inside a
/// `with pkgs;` scope the package-metadata provider is consulted first;
/// static information is the fallback.
pub fn hover(
    tu: &NixTU,
    position: lsp::Position,
    provider: Option<&dyn PackageInfoProvider>,
) -> Option<lsp::Hover> {
    let node = descend_position(tu, position)?;

    if have_package_scope(tu, node) {
        if let Some(provider) = provider {
            let (mut scope, name) = get_scope_and_prefix(tu, node);
            if !name.is_empty() {
                scope.push(name);
                if let Some(package) = provider.attrpath_info(&scope, PROVIDER_DEADLINE) {
                    return Some(lsp::Hover {
                        contents: markdown(eval::markdown(&package)),
                        range: Some(tu_range(tu, tu.parse().arena.get(node).range())),
                    });
                }
            }
        }
    }

    // Report the nearest enclosing expression; wrapper nodes like a bare
    // identifier are rarely what the user means.
    let named = tu
        .parent_map()
        .and_then(|pm| pm.up_expr(&tu.parse().arena, node))
        .unwrap_or(node);
    let name = tu.parse().arena.get(named).name();
    let range = tu_range(tu, tu.parse().arena.get(named).range());
    Some(lsp::Hover { contents: markdown(format!("`{name}`")), range: Some(range) })
}

fn markdown(value: String) -> lsp::HoverContents {
    lsp::HoverContents::Markup(lsp::MarkupContent {
        kind: lsp::MarkupKind::Markdown,
        value,
    })
}
