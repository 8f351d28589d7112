//! Document links for literal relative path expressions.

use std::str::FromStr;

use lsp_types as lsp;
use nix_ast::Node;

use crate::convert::tu_range;
use crate::state::NixTU;

/// Every literal path expression (`./module.nix`, `../lib`) becomes a link
/// resolved against the document's directory. Interpolated paths cannot be
/// resolved statically and are skipped.
pub fn document_link(tu: &NixTU, uri: &lsp::Uri) -> Vec<lsp::DocumentLink> {
    let mut links = Vec::new();
    let Some(root) = tu.root() else { return links };
    let Ok(base) = url::Url::parse(uri.as_str()) else { return links };
    let arena = &tu.parse().arena;

    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if let Node::ExprPath(path) = arena.get(id) {
            let literal = arena
                .get(path.parts)
                .as_interpolated_parts()
                .and_then(|p| p.literal());
            if let Some(text) = literal {
                if let Some(target) = resolve(&base, text) {
                    links.push(lsp::DocumentLink {
                        range: tu_range(tu, path.range),
                        target: Some(target),
                        tooltip: None,
                        data: None,
                    });
                }
            }
        }
        for child in arena.get(id).children().into_iter().flatten() {
            stack.push(child);
        }
    }
    links
}

fn resolve(base: &url::Url, path: &str) -> Option<lsp::Uri> {
    // `~/...` and `<...>` need environment knowledge; only plain relative
    // and absolute paths resolve here.
    if path.starts_with('~') {
        return None;
    }
    let target = base.join(path).ok()?;
    lsp::Uri::from_str(target.as_str()).ok()
}
