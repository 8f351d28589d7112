//! Extract a non-trivial expression into a sibling file, parameterized
//! over its free variables.
//!
//! The original site becomes `import ./name.nix { inherit v1 v2; }`. The
//! action refuses expressions capturing names that only exist via `with`
//! (the scope cannot be reconstructed in the new file) and never overwrites
//! an existing file.

use std::collections::BTreeSet;
use std::str::FromStr;

use lsp_types as lsp;
use nix_ast::{Node, NodeId, NodeKind};
use nix_sema::LookupResultKind;

use crate::convert::tu_range;
use crate::state::NixTU;

/// Free variables of the subtree at `root`: used inside, defined outside.
/// `None` when any name comes from a `with` scope.
fn collect_free_variables(tu: &NixTU, root: NodeId) -> Option<BTreeSet<String>> {
    let vla = tu.variable_lookup()?;
    let arena = &tu.parse().arena;
    let root_range = arena.get(root).range();
    let mut free = BTreeSet::new();

    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if let Node::ExprVar(var) = arena.get(id) {
            if let Some(result) = vla.query(id) {
                match result.kind {
                    LookupResultKind::FromWith => return None,
                    LookupResultKind::Defined => {
                        let def = result.def.map(|d| vla.def(d));
                        let outside = def.as_ref().is_some_and(|d| {
                            !d.is_builtin()
                                && d.syntax().is_some_and(|syntax| {
                                    !root_range.contains(&arena.get(syntax).range())
                                })
                        });
                        if outside {
                            if let Some(ident) = arena.get(var.id).as_identifier() {
                                free.insert(ident.name.clone());
                            }
                        }
                    }
                    LookupResultKind::Undefined => {}
                }
            }
        }
        for child in arena.get(id).children().into_iter().flatten() {
            stack.push(child);
        }
    }
    Some(free)
}

/// Whether the expression is worth extracting: aggregates and control flow
/// yes, bare literals and references no.
fn is_extractable(tu: &NixTU, node: NodeId) -> bool {
    let arena = &tu.parse().arena;
    match arena.get(node) {
        Node::ExprAttrs(attrs) => attrs
            .binds
            .and_then(|b| arena.get(b).as_binds())
            .is_some_and(|b| !b.bindings.is_empty()),
        Node::ExprList(list) => !list.elements.is_empty(),
        Node::ExprLambda(_)
        | Node::ExprLet(_)
        | Node::ExprIf(_)
        | Node::ExprWith(_)
        | Node::ExprCall(_)
        | Node::ExprBinOp(_)
        | Node::ExprUnaryOp(_)
        | Node::ExprOpHasAttr(_)
        | Node::ExprAssert(_)
        | Node::ExprParen(_) => true,
        _ => false,
    }
}

/// The expression to extract: the node itself, or — when the cursor sits on
/// an attribute name — that binding's value.
fn find_extractable(tu: &NixTU, node: NodeId) -> Option<NodeId> {
    if is_extractable(tu, node) {
        return Some(node);
    }
    let pm = tu.parent_map()?;
    let arena = &tu.parse().arena;
    if matches!(arena.get(node).kind(), NodeKind::Identifier | NodeKind::AttrName) {
        let path = pm.query(node)?;
        if arena.get(path).kind() == NodeKind::AttrPath {
            let binding = pm.query(path)?;
            if let Node::Binding(bind) = arena.get(binding) {
                let value = bind.value?;
                if is_extractable(tu, value) {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// A file name derived from the enclosing binding, or from the expression
/// kind as a fallback.
fn generate_filename(tu: &NixTU, node: NodeId) -> String {
    if let Some(pm) = tu.parent_map() {
        let arena = &tu.parse().arena;
        if let Some(binding) = pm.up_to(arena, node, NodeKind::Binding) {
            if let Node::Binding(bind) = arena.get(binding) {
                let name = arena
                    .get(bind.path)
                    .as_attr_path()
                    .and_then(|p| p.names.last().copied())
                    .and_then(|n| arena.attr_name_static(n));
                if let Some(name) = name {
                    let sanitized: String = name
                        .chars()
                        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                        .collect();
                    return format!("{sanitized}.nix");
                }
            }
        }
    }
    match tu.parse().arena.get(node).kind() {
        NodeKind::ExprLambda => "extracted-lambda.nix".to_string(),
        NodeKind::ExprAttrs => "extracted-attrs.nix".to_string(),
        NodeKind::ExprList => "extracted-list.nix".to_string(),
        NodeKind::ExprLet => "extracted-let.nix".to_string(),
        NodeKind::ExprIf => "extracted-if.nix".to_string(),
        _ => "extracted.nix".to_string(),
    }
}

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let Some(expr) = find_extractable(tu, node) else { return };
    let arena = &tu.parse().arena;
    let expr_src = arena.get(expr).src(tu.src());
    if expr_src.is_empty() {
        return;
    }

    // Names from `with` scope cannot be parameterized; refuse.
    let Some(free) = collect_free_variables(tu, expr) else { return };

    let filename = generate_filename(tu, expr);
    let Ok(base) = url::Url::parse(uri.as_str()) else { return };
    let Ok(target) = base.join(&filename) else { return };
    // Refuse to clobber an existing file.
    if let Ok(path) = target.to_file_path() {
        if path.exists() {
            return;
        }
    }
    let Ok(target_uri) = lsp::Uri::from_str(target.as_str()) else { return };

    let mut content = String::new();
    if !free.is_empty() {
        content.push_str("{ ");
        for (index, name) in free.iter().enumerate() {
            if index > 0 {
                content.push_str(", ");
            }
            content.push_str(name);
        }
        content.push_str(" }:\n");
    }
    content.push_str(expr_src);
    content.push('\n');

    let mut import = format!("import ./{filename}");
    if !free.is_empty() {
        import.push_str(" { inherit");
        for name in &free {
            import.push(' ');
            import.push_str(name);
        }
        import.push_str("; }");
    }

    let create = lsp::CreateFile {
        uri: target_uri.clone(),
        options: Some(lsp::CreateFileOptions {
            overwrite: Some(false),
            ignore_if_exists: Some(false),
        }),
        annotation_id: None,
    };
    let new_file_edit = lsp::TextDocumentEdit {
        text_document: lsp::OptionalVersionedTextDocumentIdentifier {
            uri: target_uri,
            version: None,
        },
        edits: vec![lsp::OneOf::Left(lsp::TextEdit {
            range: lsp::Range::default(),
            new_text: content,
        })],
    };
    let source_edit = lsp::TextDocumentEdit {
        text_document: lsp::OptionalVersionedTextDocumentIdentifier {
            uri: uri.clone(),
            version: None,
        },
        edits: vec![lsp::OneOf::Left(lsp::TextEdit {
            range: tu_range(tu, arena.get(expr).range()),
            new_text: import,
        })],
    };

    actions.push(lsp::CodeAction {
        title: format!("Extract expression to {filename}"),
        kind: Some(lsp::CodeActionKind::REFACTOR),
        edit: Some(lsp::WorkspaceEdit {
            document_changes: Some(lsp::DocumentChanges::Operations(vec![
                lsp::DocumentChangeOperation::Op(lsp::ResourceOp::Create(create)),
                lsp::DocumentChangeOperation::Edit(new_file_edit),
                lsp::DocumentChangeOperation::Edit(source_edit),
            ])),
            ..Default::default()
        }),
        ..Default::default()
    });
}
