//! Document symbols: a tree-shaped outline mirroring the CST.

#![allow(deprecated)] // DocumentSymbol::deprecated must still be populated.

use lsp_types as lsp;
use nix_ast::{Node, NodeArena, NodeId};
use nix_sema::{LookupResultKind, VariableLookupAnalysis};

use crate::convert::tu_range;
use crate::state::NixTU;

pub fn document_symbol(tu: &NixTU) -> Vec<lsp::DocumentSymbol> {
    let mut symbols = Vec::new();
    let (Some(root), Some(vla)) = (tu.root(), tu.variable_lookup()) else {
        return symbols;
    };
    collect(tu, vla, Some(root), &mut symbols);
    symbols
}

fn symbol(
    name: String,
    detail: &str,
    kind: lsp::SymbolKind,
    range: lsp::Range,
    selection: lsp::Range,
    children: Vec<lsp::DocumentSymbol>,
) -> lsp::DocumentSymbol {
    lsp::DocumentSymbol {
        name,
        detail: Some(detail.to_string()),
        kind,
        tags: None,
        deprecated: Some(false),
        range,
        selection_range: selection,
        children: Some(children),
    }
}

fn lambda_name(arena: &NodeArena, lambda: &nix_ast::ExprLambda) -> String {
    let id = lambda
        .arg
        .and_then(|arg| arena.get(arg).as_lambda_arg().and_then(|a| a.id));
    match id.and_then(|id| arena.get(id).as_identifier()) {
        Some(ident) => ident.name.clone(),
        None => "(anonymous lambda)".to_string(),
    }
}

fn lambda_selection(tu: &NixTU, lambda: &nix_ast::ExprLambda) -> lsp::Range {
    let arena = &tu.parse().arena;
    let Some(arg) = lambda.arg.and_then(|a| arena.get(a).as_lambda_arg()) else {
        return tu_range(tu, lambda.range);
    };
    if let Some(id) = arg.id {
        return tu_range(tu, arena.get(id).range());
    }
    if let Some(formals) = arg.formals {
        return tu_range(tu, arena.get(formals).range());
    }
    tu_range(tu, lambda.range)
}

/// Make a variable's entry rich: booleans, null and builtins get their own
/// symbol kinds, undefined variables are flagged deprecated.
fn rich_var(
    vla: &VariableLookupAnalysis,
    var: NodeId,
    name: &str,
    sym: &mut lsp::DocumentSymbol,
) {
    match name {
        "true" | "false" => {
            sym.kind = lsp::SymbolKind::BOOLEAN;
            sym.detail = Some("builtin boolean".to_string());
            return;
        }
        "null" => {
            sym.kind = lsp::SymbolKind::NULL;
            sym.detail = Some("null".to_string());
            return;
        }
        _ => {}
    }
    let Some(result) = vla.query(var) else { return };
    match result.kind {
        LookupResultKind::Defined => sym.kind = lsp::SymbolKind::CONSTANT,
        LookupResultKind::FromWith => sym.kind = lsp::SymbolKind::VARIABLE,
        LookupResultKind::Undefined => {
            sym.deprecated = Some(true);
            return;
        }
    }
    if result.def.is_some_and(|d| vla.def(d).is_builtin()) {
        sym.kind = lsp::SymbolKind::EVENT;
    }
}

fn collect(
    tu: &NixTU,
    vla: &VariableLookupAnalysis,
    node: Option<NodeId>,
    symbols: &mut Vec<lsp::DocumentSymbol>,
) {
    let Some(id) = node else { return };
    let arena = &tu.parse().arena;
    match arena.get(id) {
        Node::ExprString(s) => {
            let name = arena
                .get(s.parts)
                .as_interpolated_parts()
                .and_then(|p| p.literal())
                .map_or_else(|| "(dynamic string)".to_string(), str::to_string);
            let range = tu_range(tu, s.range);
            symbols.push(symbol(name, "string", lsp::SymbolKind::STRING, range, range, vec![]));
        }
        Node::ExprInt(i) => {
            let range = tu_range(tu, i.range);
            symbols.push(symbol(
                i.value.to_string(),
                "integer",
                lsp::SymbolKind::NUMBER,
                range,
                range,
                vec![],
            ));
        }
        Node::ExprFloat(f) => {
            let range = tu_range(tu, f.range);
            symbols.push(symbol(
                f.value.to_string(),
                "float",
                lsp::SymbolKind::NUMBER,
                range,
                range,
                vec![],
            ));
        }
        Node::AttrName(a) => {
            let name = arena
                .attr_name_static(id)
                .map_or_else(|| "(dynamic attribute name)".to_string(), str::to_string);
            let range = tu_range(tu, a.range);
            symbols.push(symbol(
                name,
                "attribute name",
                lsp::SymbolKind::PROPERTY,
                range,
                range,
                vec![],
            ));
        }
        Node::ExprVar(v) => {
            let name = arena
                .get(v.id)
                .as_identifier()
                .map_or_else(String::new, |i| i.name.clone());
            let range = tu_range(tu, v.range);
            let mut sym =
                symbol(name.clone(), "identifier", lsp::SymbolKind::VARIABLE, range, range, vec![]);
            rich_var(vla, id, &name, &mut sym);
            symbols.push(sym);
        }
        Node::ExprLambda(l) => {
            let mut children = Vec::new();
            collect(tu, vla, l.body, &mut children);
            let range = tu_range(tu, l.range);
            symbols.push(symbol(
                lambda_name(arena, l),
                "lambda",
                lsp::SymbolKind::FUNCTION,
                range,
                lambda_selection(tu, l),
                children,
            ));
        }
        Node::ExprList(l) => {
            let mut children = Vec::new();
            for element in &l.elements {
                collect(tu, vla, Some(*element), &mut children);
            }
            let range = tu_range(tu, l.range);
            symbols.push(symbol(
                "{anonymous}".to_string(),
                "list",
                lsp::SymbolKind::ARRAY,
                range,
                range,
                children,
            ));
        }
        Node::ExprAttrs(_) => {
            // Dispatch through the lowered annotation, after desugaring.
            let Some(sema) = tu.parse().sema.get(&id) else { return };
            for (name, attr) in sema.static_attrs() {
                let Some(value) = attr.value() else { continue };
                let mut children = Vec::new();
                collect(tu, vla, Some(value), &mut children);
                let key_range = arena.get(attr.key()).range();
                let full = nix_position_tracking::LexerCursorRange::new(
                    key_range.begin,
                    arena.get(value).range().end.max(key_range.end),
                );
                symbols.push(symbol(
                    name.clone(),
                    "attribute",
                    lsp::SymbolKind::FIELD,
                    tu_range(tu, full),
                    tu_range(tu, key_range),
                    children,
                ));
            }
            for attr in sema.dynamic_attrs() {
                let mut children = Vec::new();
                if let Some(value) = attr.value() {
                    collect(tu, vla, Some(value), &mut children);
                }
                let key_range = arena.get(attr.key()).range();
                symbols.push(symbol(
                    "${dynamic attribute}".to_string(),
                    "attribute",
                    lsp::SymbolKind::FIELD,
                    tu_range(tu, key_range),
                    tu_range(tu, key_range),
                    children,
                ));
            }
        }
        other => {
            // Trivial dispatch: keep these symbols at the same level.
            for child in other.children().into_iter().flatten() {
                collect(tu, vla, Some(child), symbols);
            }
        }
    }
}
