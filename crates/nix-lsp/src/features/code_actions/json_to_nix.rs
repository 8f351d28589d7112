//! Convert a selected JSON value to its canonical Nix rendering.

use lsp_types as lsp;

use super::utils::{MAX_JSON_DEPTH, MAX_JSON_WIDTH, create_single_edit_action, quote_nix_attr_key};
use super::utils::escape_nix_string;
use crate::convert::to_offset;
use crate::state::NixTU;

/// Render one JSON value as Nix. Objects become `{ k = v; ... }`, arrays
/// become `[ v v ... ]`. Returns `None` past the depth/width limits.
fn json_to_nix(value: &serde_json::Value, indent: usize, depth: usize) -> Option<String> {
    if depth > MAX_JSON_DEPTH {
        return None;
    }
    let pad = "  ".repeat(indent);
    let pad_next = "  ".repeat(indent + 1);
    Some(match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(true) => "true".to_string(),
        serde_json::Value::Bool(false) => "false".to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("\"{}\"", escape_nix_string(s)),
        serde_json::Value::Array(items) => {
            if items.len() > MAX_JSON_WIDTH {
                return None;
            }
            if items.is_empty() {
                "[ ]".to_string()
            } else {
                let mut out = "[\n".to_string();
                for item in items {
                    out.push_str(&pad_next);
                    out.push_str(&json_to_nix(item, indent + 1, depth + 1)?);
                    out.push('\n');
                }
                out.push_str(&pad);
                out.push(']');
                out
            }
        }
        serde_json::Value::Object(fields) => {
            if fields.len() > MAX_JSON_WIDTH {
                return None;
            }
            if fields.is_empty() {
                "{ }".to_string()
            } else {
                let mut out = "{\n".to_string();
                for (key, field) in fields {
                    out.push_str(&pad_next);
                    out.push_str(&quote_nix_attr_key(key));
                    out.push_str(" = ");
                    out.push_str(&json_to_nix(field, indent + 1, depth + 1)?);
                    out.push_str(";\n");
                }
                out.push_str(&pad);
                out.push('}');
                out
            }
        }
    })
}

pub fn add(tu: &NixTU, uri: &lsp::Uri, range: lsp::Range, actions: &mut Vec<lsp::CodeAction>) {
    let (Some(start), Some(end)) = (to_offset(tu, range.start), to_offset(tu, range.end))
    else {
        return;
    };
    if start >= end || end > tu.src().len() {
        return;
    }
    let selected = &tu.src()[start..end];
    // Minimum viable selection is "{}" or "[]"; anything else is cheap to
    // reject by its first byte.
    if selected.len() < 2 || !matches!(selected.as_bytes()[0], b'{' | b'[') {
        return;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(selected) else { return };
    // Empty structures are already valid Nix.
    match &value {
        serde_json::Value::Array(items) if items.is_empty() => return,
        serde_json::Value::Object(fields) if fields.is_empty() => return,
        _ => {}
    }
    let Some(new_text) = json_to_nix(&value, 0, 0) else { return };
    actions.push(create_single_edit_action(
        "Convert JSON to Nix".to_string(),
        lsp::CodeActionKind::REFACTOR_REWRITE,
        uri,
        range,
        new_text,
    ));
}
