//! Toggle between `"..."` and `''...''` string styles, re-escaping as
//! required.

use lsp_types as lsp;
use nix_ast::{InterpolablePart, Node, NodeId, NodeKind};

use super::single_edit_action;
use super::utils::escape_nix_string;
use crate::state::NixTU;

/// Escape for an indented string literal: `''` → `'''`, `${` → `''${`.
fn escape_for_indented_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 8);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push_str("'''");
            }
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push_str("''${");
            }
            other => out.push(other),
        }
    }
    out
}

pub fn add(tu: &NixTU, node: NodeId, uri: &lsp::Uri, actions: &mut Vec<lsp::CodeAction>) {
    let Some(pm) = tu.parent_map() else { return };
    let arena = &tu.parse().arena;
    let Some(string_id) = pm.up_to(arena, node, NodeKind::ExprString) else { return };
    let Node::ExprString(string) = arena.get(string_id) else { return };
    let Some(parts) = arena.get(string.parts).as_interpolated_parts() else { return };

    let is_indented = tu.src()[string.range.begin.offset..].starts_with("''");

    let (open, close) = if is_indented { ("\"", "\"") } else { ("''", "''") };
    let mut new_text = open.to_string();
    for fragment in &parts.fragments {
        match fragment {
            InterpolablePart::Literal(text) => {
                if is_indented {
                    // Indented -> double-quoted: escape quotes, newlines
                    // become \n again.
                    new_text.push_str(&escape_nix_string(text));
                } else {
                    new_text.push_str(&escape_for_indented_string(text));
                }
            }
            InterpolablePart::Interpolation(interp) => {
                // Interpolations keep their exact source text.
                new_text.push_str(arena.get(*interp).src(tu.src()));
            }
        }
    }
    new_text.push_str(close);

    let title = if is_indented {
        "Convert to double-quoted string"
    } else {
        "Convert to indented string"
    };
    actions.push(single_edit_action(
        tu,
        uri,
        title,
        lsp::CodeActionKind::REFACTOR_REWRITE,
        string.range,
        new_text,
    ));
}
