//! End-to-end scenarios against the analysis pipeline and feature
//! handlers: literal input, observable output.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::str::FromStr;

use lsp_types as lsp;
use nix_lsp::features;
use nix_lsp::state::NixTU;
use pretty_assertions::assert_eq;

fn tu(src: &str) -> NixTU {
    NixTU::analyze(src.to_string(), Some(1))
}

fn uri() -> lsp::Uri {
    lsp::Uri::from_str("file:///tmp/test.nix").unwrap()
}

fn pos(line: u32, character: u32) -> lsp::Position {
    lsp::Position { line, character }
}

/// Byte offset of an LSP range start within `src` (single-line inputs).
fn offsets(tu: &NixTU, range: lsp::Range) -> (usize, usize) {
    let start = tu
        .line_starts()
        .position_to_offset(tu.src(), range.start.line, range.start.character)
        .unwrap();
    let end = tu
        .line_starts()
        .position_to_offset(tu.src(), range.end.line, range.end.character)
        .unwrap();
    (start, end)
}

#[test]
fn scenario_parse_error_with_fix() {
    let tu = tu("{ a = 1;\n  foo\n\n");
    let expected: Vec<_> = tu
        .diagnostics()
        .iter()
        .filter(|d| d.sname() == "expected")
        .collect();
    assert!(!expected.is_empty());
    assert!(expected.iter().any(|d| {
        let message = d.format();
        (message.contains(';') || message.contains('}') || message.contains('='))
            && !d.fixes().is_empty()
    }));

    let symbols = features::document_symbol::document_symbol(&tu);
    let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a"]);
}

#[test]
fn scenario_undefined_variable_with_unused_with() {
    let src = "with whatEverUndefined; [ ]";
    let tu = tu(src);
    assert_eq!(tu.diagnostics().len(), 2);

    let undefined = tu
        .diagnostics()
        .iter()
        .find(|d| d.sname() == "undefined-variable")
        .unwrap();
    assert_eq!(undefined.range().view(src), "whatEverUndefined");

    assert!(tu.diagnostics().iter().any(|d| d.sname() == "extra-with"));
}

#[test]
fn scenario_duplicate_attr_with_merge() {
    let tu = tu("{ a = { x = 1; }; a = { y = 2; }; }");
    assert!(tu.diagnostics().iter().all(|d| d.sname() != "duplicated-attrname"));

    let symbols = features::document_symbol::document_symbol(&tu);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "a");
    let children: Vec<&str> = symbols[0]
        .children
        .as_ref()
        .unwrap()
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(children, vec!["x", "y"]);
}

#[test]
fn scenario_duplicate_attr_without_merge() {
    let tu = tu("{ a = 1; a = 2; }");
    let dups: Vec<_> = tu
        .diagnostics()
        .iter()
        .filter(|d| d.sname() == "duplicated-attrname")
        .collect();
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].notes().len(), 1);
    // The note points at the first `a`.
    assert_eq!(dups[0].notes()[0].range().begin.offset, 2);
}

#[test]
fn scenario_rename_across_scopes() {
    let src = "let a = 1; b = a; in a + b";
    let tu = tu(src);
    let edit = features::rename::rename(&tu, &uri(), pos(0, 4), "c").unwrap();
    let changes = edit.changes.unwrap();
    let edits = changes.get(&uri()).unwrap();

    let mut starts: Vec<usize> = edits.iter().map(|e| offsets(&tu, e.range).0).collect();
    starts.sort_unstable();
    assert_eq!(starts, vec![4, 15, 21]);

    // Applying the edits yields the renamed document and nothing else
    // changes.
    let mut text = src.to_string();
    let mut sorted: Vec<&lsp::TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| offsets(&tu, e.range).0);
    for edit in sorted.iter().rev() {
        let (start, end) = offsets(&tu, edit.range);
        text.replace_range(start..end, &edit.new_text);
    }
    assert_eq!(text, "let c = 1; b = c; in c + b");
}

#[test]
fn scenario_hover_on_variable() {
    let src = "let x = 1; in x";
    let tu = tu(src);
    let hover = features::hover::hover(&tu, pos(0, 14), None).unwrap();
    let lsp::HoverContents::Markup(markup) = hover.contents else {
        panic!("expected markup hover");
    };
    assert!(markup.value.contains("ExprVar"));
    let range = hover.range.unwrap();
    assert_eq!(offsets(&tu, range), (14, 15));
}

#[test]
fn definition_and_references() {
    let src = "let a = 1; in a + a";
    let tu = tu(src);
    let location = features::definition::definition(&tu, &uri(), pos(0, 14)).unwrap();
    assert_eq!(offsets(&tu, location.range), (4, 5));

    let refs = features::references::references(&tu, &uri(), pos(0, 14)).unwrap();
    let mut starts: Vec<usize> = refs.iter().map(|r| offsets(&tu, r.range).0).collect();
    starts.sort_unstable();
    assert_eq!(starts, vec![4, 14, 18]);
}

#[test]
fn definition_rejects_builtins() {
    let tu = tu("map");
    assert!(features::definition::definition(&tu, &uri(), pos(0, 1)).is_err());
    assert!(features::rename::prepare_rename(&tu, pos(0, 1)).is_err());
}

#[test]
fn completion_filters_by_prefix_and_caps() {
    let src = "let alpha = 1; alpaca = 2; in alp";
    let tu = tu(src);
    let list = features::completion::completion(&tu, pos(0, 33));
    let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["alpaca", "alpha"]);

    // With enough names in scope the list caps at 30 and is marked
    // incomplete; internal `__` builtins never show up.
    let bindings: String = (0..20).map(|i| format!("v{i} = 1; ")).collect();
    let src = format!("let {bindings}in [ ]");
    let cursor = src.rfind('[').map(|o| o + 1).unwrap();
    let tu = NixTU::analyze(src.clone(), Some(1));
    let list = features::completion::completion(&tu, pos(0, cursor as u32));
    assert_eq!(list.items.len(), 30);
    assert!(list.is_incomplete);
    assert!(list.items.iter().all(|i| !i.label.starts_with("__")));
}

#[test]
fn completion_kinds_mark_builtins() {
    let src = "let zeta = 1; in ze";
    let tu = tu(src);
    let list = features::completion::completion(&tu, pos(0, 19));
    let zeta = list.items.iter().find(|i| i.label == "zeta").unwrap();
    assert_eq!(zeta.kind, Some(lsp::CompletionItemKind::VARIABLE));
}

#[test]
fn document_highlight_read_write() {
    let src = "let a = 1; in a";
    let tu = tu(src);
    let highlights = features::document_highlight::document_highlight(&tu, pos(0, 14));
    assert_eq!(highlights.len(), 2);
    assert_eq!(highlights[0].kind, Some(lsp::DocumentHighlightKind::READ));
    assert_eq!(highlights[1].kind, Some(lsp::DocumentHighlightKind::WRITE));
}

#[test]
fn folding_multiline_attrs() {
    let src = "{\n  a = [\n    1\n  ];\n}";
    let tu = tu(src);
    let ranges = features::folding_range::folding_range(&tu);
    assert_eq!(ranges.len(), 2);
    assert!(ranges.iter().all(|r| r.kind == Some(lsp::FoldingRangeKind::Region)));
}

#[test]
fn code_action_quickfix_from_diagnostic() {
    let src = "{ a = 1 }";
    let tu = tu(src);
    let range = lsp::Range { start: pos(0, 0), end: pos(0, 9) };
    let actions = features::code_actions::code_actions(&tu, &uri(), range);
    assert!(actions
        .iter()
        .any(|a| a.kind == Some(lsp::CodeActionKind::QUICKFIX) && a.title.contains("insert ;")));
}

#[test]
fn code_action_convert_to_inherit() {
    let src = "{ x = x; }";
    let tu = tu(src);
    let range = lsp::Range { start: pos(0, 2), end: pos(0, 3) };
    let actions = features::code_actions::code_actions(&tu, &uri(), range);
    let action = actions
        .iter()
        .find(|a| a.title == "Convert to `inherit`")
        .unwrap();
    let changes = action.edit.as_ref().unwrap().changes.as_ref().unwrap();
    let edits = changes.get(&uri()).unwrap();
    assert_eq!(edits[0].new_text, "inherit x;");
}

#[test]
fn code_action_inherit_to_binding() {
    let src = "{ inherit (e) x; e = { }; }";
    let tu = tu(src);
    let range = lsp::Range { start: pos(0, 14), end: pos(0, 15) };
    let actions = features::code_actions::code_actions(&tu, &uri(), range);
    let action = actions
        .iter()
        .find(|a| a.title == "Convert to explicit binding")
        .unwrap();
    let changes = action.edit.as_ref().unwrap().changes.as_ref().unwrap();
    let edits = changes.get(&uri()).unwrap();
    assert_eq!(edits[0].new_text, "x = e.x;");
}

#[test]
fn code_action_with_to_let() {
    let src = "with src; [ a b a ]";
    let tu = tu(src);
    let range = lsp::Range { start: pos(0, 0), end: pos(0, 4) };
    let actions = features::code_actions::code_actions(&tu, &uri(), range);
    let action = actions
        .iter()
        .find(|a| a.title == "Convert `with` to `let/inherit`")
        .unwrap();
    let changes = action.edit.as_ref().unwrap().changes.as_ref().unwrap();
    let edits = changes.get(&uri()).unwrap();
    assert_eq!(edits[0].new_text, "let inherit (src) a b; in [ a b a ]");
}

#[test]
fn code_action_rewrite_string() {
    let src = "{ s = \"a\\nb\"; }";
    let tu = tu(src);
    let range = lsp::Range { start: pos(0, 7), end: pos(0, 8) };
    let actions = features::code_actions::code_actions(&tu, &uri(), range);
    let action = actions
        .iter()
        .find(|a| a.title == "Convert to indented string")
        .unwrap();
    let changes = action.edit.as_ref().unwrap().changes.as_ref().unwrap();
    let edits = changes.get(&uri()).unwrap();
    assert_eq!(edits[0].new_text, "''a\nb''");
}

#[test]
fn code_action_json_to_nix() {
    let src = "{\"a\": [1, true]}";
    let tu = tu(src);
    let end = src.len() as u32;
    let range = lsp::Range { start: pos(0, 0), end: pos(0, end) };
    let actions = features::code_actions::code_actions(&tu, &uri(), range);
    let action = actions.iter().find(|a| a.title == "Convert JSON to Nix").unwrap();
    let changes = action.edit.as_ref().unwrap().changes.as_ref().unwrap();
    let edits = changes.get(&uri()).unwrap();
    assert!(edits[0].new_text.contains("a = ["));
}

#[test]
fn code_action_pack_dotted_path() {
    let src = "{ a.b = 1; a.c = 2; }";
    let tu = tu(src);
    let range = lsp::Range { start: pos(0, 2), end: pos(0, 3) };
    let actions = features::code_actions::code_actions(&tu, &uri(), range);
    let titles: Vec<&str> = actions.iter().map(|a| a.title.as_str()).collect();
    assert!(titles.contains(&"Pack dotted path to nested set"));
    assert!(titles.iter().any(|t| t.contains("Pack all 'a' bindings")));
    assert!(titles.iter().any(|t| t.contains("Recursively pack all 'a' bindings")));
}

#[test]
fn code_action_add_to_formals() {
    let src = "{ a }: a + missing";
    let tu = tu(src);
    let range = lsp::Range { start: pos(0, 11), end: pos(0, 12) };
    let actions = features::code_actions::code_actions(&tu, &uri(), range);
    let action = actions
        .iter()
        .find(|a| a.title == "add `missing` to formals")
        .unwrap();
    let changes = action.edit.as_ref().unwrap().changes.as_ref().unwrap();
    let edits = changes.get(&uri()).unwrap();
    assert_eq!(edits[0].new_text, ", missing");
    // Inserted right after the formal `a`.
    assert_eq!(offsets(&tu, edits[0].range), (3, 3));
}

#[test]
fn document_link_resolves_relative_paths() {
    let src = "{ mod = import ./module.nix; }";
    let tu = tu(src);
    let links = features::document_link::document_link(&tu, &uri());
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].target.as_ref().unwrap().as_str(),
        "file:///tmp/module.nix"
    );
}
