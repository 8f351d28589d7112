//! Pack dotted paths: `a.b.c = v;` into nested attribute sets.
//!
//! Three variants are offered when siblings share the head segment: pack
//! just this binding, pack all siblings one level deep, or fully nest all
//! siblings through the lowered annotation.

use lsp_types as lsp;
use nix_ast::{Node, NodeId, NodeKind, SemaAttrs};
use nix_position_tracking::LexerCursorRange;

use super::single_edit_action;
use super::utils::quote_nix_attr_key;
use crate::state::NixTU;

/// Recursion bound for nested text generation.
const MAX_NESTED_DEPTH: usize = 100;

/// Number of attributes nested under the binding's head segment, or 0 when
/// packing is unsafe (dynamic attrs, non-set values).
fn sibling_count(tu: &NixTU, head: &str, parent_attrs: NodeId) -> usize {
    let arena = &tu.parse().arena;
    let Some(sema) = tu.parse().sema.get(&parent_attrs) else { return 0 };
    let Some(attr) = sema.static_attrs().get(head) else { return 0 };
    let Some(value) = attr.value() else { return 0 };
    if arena.get(value).kind() != NodeKind::ExprAttrs {
        return 0;
    }
    let Some(nested) = tu.parse().sema.get(&value) else { return 0 };
    if !nested.dynamic_attrs().is_empty() {
        return 0;
    }
    nested.static_attrs().len()
}

/// Fully nested rendering of a lowered attribute set.
fn generate_nested_text(tu: &NixTU, sema: &SemaAttrs, out: &mut String, depth: usize) {
    if depth > MAX_NESTED_DEPTH {
        out.push_str("{ }");
        return;
    }
    let arena = &tu.parse().arena;
    out.push_str("{ ");
    for (key, attr) in sema.static_attrs() {
        out.push_str(&quote_nix_attr_key(key));
        out.push_str(" = ");
        match attr.value() {
            Some(value)
                if arena.get(value).kind() == NodeKind::ExprAttrs && !attr.from_inherit() =>
            {
                match tu.parse().sema.get(&value) {
                    Some(nested) if nested.dynamic_attrs().is_empty() => {
                        generate_nested_text(tu, nested, out, depth + 1);
                    }
                    _ => out.push_str(arena.get(value).src(tu.src())),
                }
            }
            Some(value) => out.push_str(arena.get(value).src(tu.src())),
            None => {}
        }
        out.push_str("; ");
    }
    out.push('}');
}

/// One-level packing of all sibling bindings sharing `head`, preserving
/// remaining dotted paths from source.
fn generate_shallow_text(tu: &NixTU, binds: NodeId, head: &str, out: &mut String) {
    let arena = &tu.parse().arena;
    let Some(bindings) = arena.get(binds).as_binds().map(|b| &b.bindings) else { return };
    out.push_str("{ ");
    for child in bindings {
        let Node::Binding(bind) = arena.get(*child) else { continue };
        let Some(path) = arena.get(bind.path).as_attr_path() else { continue };
        let Some(first) = path.names.first() else { continue };
        if arena.attr_name_static(*first) != Some(head) {
            continue;
        }
        if path.names.len() == 1 {
            out.push_str(&quote_nix_attr_key(head));
        } else {
            let rest_begin = arena.get(path.names[1]).range().begin.offset;
            let rest_end = arena.get(bind.path).range().end.offset;
            out.push_str(&tu.src()[rest_begin..rest_end]);
        }
        out.push_str(" = ");
        if let Some(value) = bind.value {
            out.push_str(arena.get(value).src(tu.src()));
        }
        out.push_str("; ");
    }
    out.push('}');
}

/// The source range covering this binding and every sibling sharing `head`.
fn sibling_range(tu: &NixTU, bind_range: LexerCursorRange, binds: NodeId, head: &str) -> LexerCursorRange {
    let arena = &tu.parse().arena;
    let mut range = bind_range;
    let Some(bindings) = arena.get(binds).as_binds().map(|b| &b.bindings) else {
        return range;
    };
    for child in bindings {
        let Node::Binding(sib) = arena.get(*child) else { continue };
        let Some(path) = arena.get(sib.path).as_attr_path() else { continue };
        let Some(first) = path.names.first() else { continue };
        if arena.attr_name_static(*first) != Some(head) {
            continue;
        }
        if sib.range.begin.offset < range.begin.offset {
            range.begin = sib.range.begin;
        }
        if sib.range.end.offset > range.end.offset {
            range.end = sib.range.end;
        }
    }
    range
}

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let Some(pm) = tu.parent_map() else { return };
    let arena = &tu.parse().arena;
    let Some(binding) = pm.up_to(arena, node, NodeKind::Binding) else { return };
    let Node::Binding(bind) = arena.get(binding) else { return };

    let Some(path) = arena.get(bind.path).as_attr_path() else { return };
    if path.names.len() < 2 {
        return;
    }
    if path.names.iter().any(|n| !arena.attr_name_is_static(*n)) {
        return;
    }

    // The enclosing set must be non-recursive; packing into a `rec` set
    // would change what the nested names can see.
    let Some(binds) = pm.query(binding) else { return };
    if arena.get(binds).kind() != NodeKind::Binds {
        return;
    }
    let Some(parent_attrs) = pm.query(binds) else { return };
    let Node::ExprAttrs(parent) = arena.get(parent_attrs) else { return };
    if parent.is_recursive() {
        return;
    }

    let Some(head) = arena.attr_name_static(path.names[0]).map(str::to_string) else {
        return;
    };
    let siblings = sibling_count(tu, &head, parent_attrs);
    if siblings == 0 {
        return;
    }

    // Pack this one: `a.b.c = v;` -> `a = { b.c = v; };`
    let pack_one = {
        let mut text = arena.get(path.names[0]).src(tu.src()).to_string();
        text.push_str(" = { ");
        let rest_begin = arena.get(path.names[1]).range().begin.offset;
        let rest_end = arena.get(bind.path).range().end.offset;
        text.push_str(&tu.src()[rest_begin..rest_end]);
        text.push_str(" = ");
        if let Some(value) = bind.value {
            text.push_str(arena.get(value).src(tu.src()));
        }
        text.push_str("; };");
        text
    };
    actions.push(single_edit_action(
        tu,
        uri,
        "Pack dotted path to nested set",
        lsp::CodeActionKind::REFACTOR_REWRITE,
        bind.range,
        pack_one,
    ));

    if siblings <= 1 {
        return;
    }

    let bulk_range = sibling_range(tu, bind.range, binds, &head);

    // Shallow pack: all siblings, one level deep.
    let mut shallow = quote_nix_attr_key(&head);
    shallow.push_str(" = ");
    generate_shallow_text(tu, binds, &head, &mut shallow);
    shallow.push(';');
    actions.push(single_edit_action(
        tu,
        uri,
        format!("Pack all '{head}' bindings to nested set"),
        lsp::CodeActionKind::REFACTOR_REWRITE,
        bulk_range,
        shallow,
    ));

    // Recursive pack: fully nested through the annotation.
    let Some(sema) = tu.parse().sema.get(&parent_attrs) else { return };
    let Some(attr) = sema.static_attrs().get(&head) else { return };
    let Some(value) = attr.value() else { return };
    let Some(nested) = tu.parse().sema.get(&value) else { return };
    let mut recursive = quote_nix_attr_key(&head);
    recursive.push_str(" = ");
    generate_nested_text(tu, nested, &mut recursive, 0);
    recursive.push(';');
    actions.push(single_edit_action(
        tu,
        uri,
        format!("Recursively pack all '{head}' bindings to nested set"),
        lsp::CodeActionKind::REFACTOR_REWRITE,
        bulk_range,
        recursive,
    ));
}
