//! Package-version inlay hints.
//!
//! Every `Var` or `Select` under a `with pkgs;` scope is assumed to name a
//! package; the metadata provider supplies a version which is rendered as
//! `: version` after the node.

use lsp_types as lsp;
use nix_ast::{Node, NodeId};
use nix_sema::LookupResultKind;

use crate::ast_util::{have_package_scope, idioms};
use crate::convert::{to_offset, tu_range};
use crate::eval::{PROVIDER_DEADLINE, PackageInfoProvider};
use crate::state::NixTU;

pub fn inlay_hints(
    tu: &NixTU,
    range: Option<lsp::Range>,
    provider: Option<&dyn PackageInfoProvider>,
) -> Vec<lsp::InlayHint> {
    let mut hints = Vec::new();
    let (Some(root), Some(provider)) = (tu.root(), provider) else { return hints };
    let limit = range.and_then(|r| {
        Some((to_offset(tu, r.start)?, to_offset(tu, r.end)?))
    });
    dfs(tu, provider, root, limit, &mut hints);
    hints
}

fn range_ok(tu: &NixTU, node: NodeId, limit: Option<(usize, usize)>) -> bool {
    let Some((begin, end)) = limit else { return true };
    let range = tu.parse().arena.get(node).range();
    begin <= range.begin.offset && range.end.offset <= end
}

/// The attribute-path selector for a node, or `None` when the node is not a
/// package reference.
fn selector(tu: &NixTU, node: NodeId, limit: Option<(usize, usize)>) -> Option<Vec<String>> {
    if !have_package_scope(tu, node) || !range_ok(tu, node, limit) {
        return None;
    }
    let arena = &tu.parse().arena;
    match arena.get(node) {
        Node::ExprVar(var) => {
            let name = arena.get(var.id).as_identifier()?.name.clone();
            if name == idioms::LIB {
                return None;
            }
            // Lexically bound variables are not packages.
            let lookup = tu.variable_lookup()?.query(node)?;
            (lookup.kind != LookupResultKind::Defined).then(|| vec![name])
        }
        Node::ExprSelect(select) => {
            let mut parts = vec![arena.get(select.expr).src(tu.src()).to_string()];
            let path = arena.get(select.path?).as_attr_path()?;
            for name in &path.names {
                parts.push(arena.get(*name).src(tu.src()).to_string());
            }
            Some(parts)
        }
        _ => None,
    }
}

fn dfs(
    tu: &NixTU,
    provider: &dyn PackageInfoProvider,
    node: NodeId,
    limit: Option<(usize, usize)>,
    hints: &mut Vec<lsp::InlayHint>,
) {
    if let Some(sel) = selector(tu, node, limit) {
        if let Some(package) = provider.attrpath_info(&sel, PROVIDER_DEADLINE) {
            if let Some(version) = package.version {
                let range = tu_range(tu, tu.parse().arena.get(node).range());
                hints.push(lsp::InlayHint {
                    position: range.end,
                    label: lsp::InlayHintLabel::String(format!(": {version}")),
                    kind: Some(lsp::InlayHintKind::TYPE),
                    text_edits: None,
                    tooltip: None,
                    padding_left: None,
                    padding_right: None,
                    data: None,
                });
            }
        }
    }
    for child in tu.parse().arena.get(node).children().into_iter().flatten() {
        dfs(tu, provider, child, limit, hints);
    }
}
