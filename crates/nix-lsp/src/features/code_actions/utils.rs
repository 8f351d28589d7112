//! Shared helpers for code actions: identifier validation, string escaping
//! and `CodeAction` construction.

use std::collections::HashMap;

use lsp_types as lsp;

/// Maximum recursion depth for JSON to Nix conversion.
pub const MAX_JSON_DEPTH: usize = 100;

/// Maximum array/object width for JSON to Nix conversion.
pub const MAX_JSON_WIDTH: usize = 10_000;

pub fn create_single_edit_action(
    title: String,
    kind: lsp::CodeActionKind,
    uri: &lsp::Uri,
    range: lsp::Range,
    new_text: String,
) -> lsp::CodeAction {
    let mut changes = HashMap::new();
    changes.insert(uri.clone(), vec![lsp::TextEdit { range, new_text }]);
    lsp::CodeAction {
        title,
        kind: Some(kind),
        edit: Some(lsp::WorkspaceEdit { changes: Some(changes), ..Default::default() }),
        ..Default::default()
    }
}

/// Whether `s` can stand unquoted as an attribute name: identifier syntax
/// and not a keyword or reserved literal.
pub fn is_valid_nix_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '\'')) {
        return false;
    }
    !matches!(
        s,
        "if" | "then"
            | "else"
            | "assert"
            | "with"
            | "let"
            | "in"
            | "rec"
            | "inherit"
            | "or"
            | "true"
            | "false"
            | "null"
    )
}

/// Escape for a double-quoted Nix string: `"`, `\`, `${`, and the usual
/// control characters.
pub fn escape_nix_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4 + 2);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push_str("\\${");
            }
            other => out.push(other),
        }
    }
    out
}

/// Quote an attribute key unless it is already a valid identifier.
pub fn quote_nix_attr_key(key: &str) -> String {
    if is_valid_nix_identifier(key) {
        key.to_string()
    } else {
        format!("\"{}\"", escape_nix_string(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identifier_validity() {
        assert!(is_valid_nix_identifier("foo"));
        assert!(is_valid_nix_identifier("foo-bar'"));
        assert!(is_valid_nix_identifier("_x1"));
        assert!(!is_valid_nix_identifier("1x"));
        assert!(!is_valid_nix_identifier(""));
        assert!(!is_valid_nix_identifier("rec"));
        assert!(!is_valid_nix_identifier("true"));
        assert!(!is_valid_nix_identifier("has space"));
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_nix_string("a\"b"), "a\\\"b");
        assert_eq!(escape_nix_string("a${b}"), "a\\${b}");
        assert_eq!(escape_nix_string("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_nix_string("back\\slash"), "back\\\\slash");
        // A `$` not followed by `{` stays as-is.
        assert_eq!(escape_nix_string("a$b"), "a$b");
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_nix_attr_key("foo"), "foo");
        assert_eq!(quote_nix_attr_key("foo.bar"), "\"foo.bar\"");
        assert_eq!(quote_nix_attr_key("rec"), "\"rec\"");
    }
}
