#![allow(clippy::unwrap_used, clippy::panic)]

use crate::{ParseResult, parse};
use nix_ast::{InterpolablePart, Node, NodeId, NodeKind};
use nix_diagnostics::{Diagnostic, DiagnosticKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn parse_ok(src: &str) -> (ParseResult, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let result = parse(src, &mut diags);
    (result, diags)
}

fn root_kind(src: &str) -> NodeKind {
    let (result, _) = parse_ok(src);
    let root = result.root.unwrap_or_else(|| panic!("no root for {src:?}"));
    result.arena.get(root).kind()
}

fn diag_kinds(src: &str) -> Vec<DiagnosticKind> {
    let (_, diags) = parse_ok(src);
    diags.iter().map(|d| d.kind()).collect()
}

#[test]
fn simple_expressions() {
    assert_eq!(root_kind("1"), NodeKind::ExprInt);
    assert_eq!(root_kind("1.5"), NodeKind::ExprFloat);
    assert_eq!(root_kind("x"), NodeKind::ExprVar);
    assert_eq!(root_kind("\"a\""), NodeKind::ExprString);
    assert_eq!(root_kind("''a''"), NodeKind::ExprString);
    assert_eq!(root_kind("./foo.nix"), NodeKind::ExprPath);
    assert_eq!(root_kind("<nixpkgs>"), NodeKind::ExprSPath);
    assert_eq!(root_kind("https://example.org/x"), NodeKind::ExprString);
    assert_eq!(root_kind("[ 1 2 ]"), NodeKind::ExprList);
    assert_eq!(root_kind("{ }"), NodeKind::ExprAttrs);
    assert_eq!(root_kind("rec { }"), NodeKind::ExprAttrs);
    assert_eq!(root_kind("(x)"), NodeKind::ExprParen);
}

#[test]
fn keyword_expressions() {
    assert_eq!(root_kind("if a then b else c"), NodeKind::ExprIf);
    assert_eq!(root_kind("assert a; b"), NodeKind::ExprAssert);
    assert_eq!(root_kind("let a = 1; in a"), NodeKind::ExprLet);
    assert_eq!(root_kind("with pkgs; [ ]"), NodeKind::ExprWith);
    assert_eq!(root_kind("x: x"), NodeKind::ExprLambda);
    assert_eq!(root_kind("{ a, b ? 1, ... }: a"), NodeKind::ExprLambda);
    assert_eq!(root_kind("{ a }: a"), NodeKind::ExprLambda);
    assert_eq!(root_kind("x @ { a }: a"), NodeKind::ExprLambda);
    assert_eq!(root_kind("{ a } @ x: a"), NodeKind::ExprLambda);
}

#[test]
fn application_and_select() {
    assert_eq!(root_kind("f x y"), NodeKind::ExprCall);
    assert_eq!(root_kind("a.b.c"), NodeKind::ExprSelect);
    assert_eq!(root_kind("a.b or c"), NodeKind::ExprSelect);
    assert_eq!(root_kind("a ? b"), NodeKind::ExprOpHasAttr);
    // Literal heads never take arguments.
    assert_eq!(root_kind("1 2"), NodeKind::ExprInt);
}

#[test]
fn operator_precedence() {
    let (result, diags) = parse_ok("1 + 2 * 3");
    assert_eq!(diags.len(), 0);
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let Node::ExprBinOp(add) = result.arena.get(root) else {
        panic!("expected bin op at the root");
    };
    assert_eq!(result.arena.get(add.op).src("1 + 2 * 3"), "+");
    let Node::ExprBinOp(mul) = result.arena.get(add.rhs) else {
        panic!("expected * on the rhs");
    };
    assert_eq!(result.arena.get(mul.op).src("1 + 2 * 3"), "*");
}

#[test]
fn update_is_right_associative() {
    let src = "a // b // c";
    let (result, _) = parse_ok(src);
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let Node::ExprBinOp(outer) = result.arena.get(root) else {
        panic!("expected bin op");
    };
    assert_eq!(result.arena.get(outer.lhs).src(src), "a");
    assert_eq!(result.arena.get(outer.rhs).src(src), "b // c");
}

#[test]
fn unary_negation_binds_tighter_than_addition() {
    let src = "-a + b";
    let (result, _) = parse_ok(src);
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let Node::ExprBinOp(add) = result.arena.get(root) else {
        panic!("expected + at the root");
    };
    assert_eq!(result.arena.get(add.lhs).kind(), NodeKind::ExprUnaryOp);
}

#[test]
fn string_interpolation_cooks_fragments() {
    let src = r#""a\n${x}b""#;
    let (result, diags) = parse_ok(src);
    assert_eq!(diags.len(), 0);
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let Node::ExprString(s) = result.arena.get(root) else { panic!("expected string") };
    let Node::InterpolatedParts(parts) = result.arena.get(s.parts) else {
        panic!("expected parts")
    };
    assert_eq!(parts.fragments.len(), 3);
    assert_eq!(parts.fragments[0], InterpolablePart::Literal("a\n".into()));
    assert!(matches!(parts.fragments[2], InterpolablePart::Literal(ref t) if t == "b"));
    assert!(!parts.is_literal());
}

#[test]
fn literal_string_is_merged() {
    let src = r#""a\tb""#;
    let (result, _) = parse_ok(src);
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let Node::ExprString(s) = result.arena.get(root) else { panic!("expected string") };
    let Node::InterpolatedParts(parts) = result.arena.get(s.parts) else {
        panic!("expected parts")
    };
    assert_eq!(parts.literal(), Some("a\tb"));
}

#[test]
fn unterminated_string_recovers_with_note_at_opener() {
    let (_, diags) = parse_ok("\"abc");
    let expected: Vec<&Diagnostic> =
        diags.iter().filter(|d| d.kind() == DiagnosticKind::Expected).collect();
    assert_eq!(expected.len(), 1);
    assert!(expected[0].format().contains('"'));
    assert_eq!(expected[0].notes().len(), 1);
    assert!(!expected[0].fixes().is_empty());
}

#[test]
fn missing_semicolon_in_binding() {
    let (result, diags) = parse_ok("{ a = 1 }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind(), DiagnosticKind::Expected);
    assert!(diags[0].format().contains(';'));
    assert!(result.root.is_some());
}

#[test]
fn parse_error_with_fix_keeps_symbols() {
    // A binding missing both `=` and the closing brace still keeps `a`.
    let (result, diags) = parse_ok("{ a = 1;\n  foo\n\n");
    assert!(diags.iter().any(|d| {
        d.kind() == DiagnosticKind::Expected
            && (d.format().contains(';') || d.format().contains('}') || d.format().contains('='))
            && !d.fixes().is_empty()
    }));
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let sema = result.sema.get(&root).unwrap_or_else(|| panic!("no sema"));
    let names: Vec<&str> = sema.static_attrs().keys().map(|k| k.as_str()).collect();
    assert_eq!(names, vec!["a"]);
}

#[test]
fn attr_path_extra_dot_offers_two_fixes() {
    let (_, diags) = parse_ok("{ a..b = 1; }");
    let extra: Vec<&Diagnostic> = diags
        .iter()
        .filter(|d| d.kind() == DiagnosticKind::AttrPathExtraDot)
        .collect();
    assert_eq!(extra.len(), 1);
    assert_eq!(extra[0].fixes().len(), 2);
}

#[test]
fn select_extra_dot() {
    let kinds = diag_kinds("a. ");
    assert!(kinds.contains(&DiagnosticKind::SelectExtraDot));
}

#[test]
fn empty_inherit_is_faded() {
    let (_, diags) = parse_ok("{ inherit; }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind(), DiagnosticKind::EmptyInherit);
    // The fix removes both the keyword and the semicolon.
    assert_eq!(diags[0].fixes()[0].edits().len(), 2);
}

#[test]
fn dynamic_inherit_is_rejected() {
    let kinds = diag_kinds("{ inherit ${a}; }");
    assert!(kinds.contains(&DiagnosticKind::DynamicInherit));
}

#[test]
fn or_as_identifier_warns() {
    let kinds = diag_kinds("{ or = 1; }");
    assert_eq!(kinds, vec![DiagnosticKind::OrIdentifier]);
}

#[test]
fn redundant_paren_is_faded() {
    let (_, diags) = parse_ok("(1)");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind(), DiagnosticKind::RedundantParen);
    assert_eq!(diags[0].fixes()[0].edits().len(), 2);
}

#[test]
fn lambda_arg_extra_at() {
    let kinds = diag_kinds("x @ : 1");
    assert!(kinds.contains(&DiagnosticKind::LambdaArgExtraAt));
}

#[test]
fn int_too_big() {
    let kinds = diag_kinds("92233720368547758080000");
    assert_eq!(kinds, vec![DiagnosticKind::IntTooBig]);
}

// ===== Lowering =====

fn static_names(result: &ParseResult, node: NodeId) -> Vec<String> {
    result
        .sema
        .get(&node)
        .map(|sa| sa.static_attrs().keys().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn attr_path_desugars_like_mkdir_p() {
    let (result, diags) = parse_ok("{ a.b.c = 1; a.b.d = 2; }");
    assert_eq!(diags.len(), 0);
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    assert_eq!(static_names(&result, root), vec!["a"]);
    let sema = result.sema.get(&root).unwrap_or_else(|| panic!("no sema"));
    let a = sema.static_attrs()["a"].value().unwrap_or_else(|| panic!("a has no value"));
    assert_eq!(static_names(&result, a), vec!["b"]);
    let ab = result.sema[&a].static_attrs()["b"]
        .value()
        .unwrap_or_else(|| panic!("b has no value"));
    assert_eq!(static_names(&result, ab), vec!["c", "d"]);
}

#[test]
fn nested_attrs_merge_without_duplicate_diagnostic() {
    let (result, diags) = parse_ok("{ a = { x = 1; }; a = { y = 2; }; }");
    assert_eq!(diags.len(), 0);
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let sema = result.sema.get(&root).unwrap_or_else(|| panic!("no sema"));
    let a = sema.static_attrs()["a"].value().unwrap_or_else(|| panic!("a has no value"));
    assert_eq!(static_names(&result, a), vec!["x", "y"]);
}

#[test]
fn duplicate_leaves_are_reported_with_note() {
    let (_, diags) = parse_ok("{ a = 1; a = 2; }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind(), DiagnosticKind::DuplicatedAttrName);
    assert_eq!(diags[0].format(), "duplicated attrname `a`");
    assert_eq!(diags[0].notes().len(), 1);
}

#[test]
fn duplicates_inside_merged_sets_are_still_reported() {
    let kinds = diag_kinds("{ a = { x = 1; }; a = { x = 2; }; }");
    assert_eq!(kinds, vec![DiagnosticKind::DuplicatedAttrName]);
}

#[test]
fn merge_with_different_rec_modifiers_warns() {
    let kinds = diag_kinds("{ a = rec { x = 1; }; a = { y = 2; }; }");
    assert!(kinds.contains(&DiagnosticKind::MergeDiffRec));
}

#[test]
fn inherit_from_desugars_to_select() {
    let (result, diags) = parse_ok("{ inherit (e) a; }");
    // `e` is undefined but that is variable lookup's business, not parsing's.
    assert_eq!(diags.len(), 0);
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let sema = result.sema.get(&root).unwrap_or_else(|| panic!("no sema"));
    let attr = &sema.static_attrs()["a"];
    assert!(attr.from_inherit());
    let value = attr.value().unwrap_or_else(|| panic!("no value"));
    assert_eq!(result.arena.get(value).kind(), NodeKind::ExprSelect);
}

#[test]
fn bare_inherit_desugars_to_var() {
    let (result, _) = parse_ok("{ inherit a; }");
    let root = result.root.unwrap_or_else(|| panic!("no root"));
    let sema = result.sema.get(&root).unwrap_or_else(|| panic!("no sema"));
    let value = sema.static_attrs()["a"].value().unwrap_or_else(|| panic!("no value"));
    assert_eq!(result.arena.get(value).kind(), NodeKind::ExprVar);
}

#[test]
fn formals_misplaced_ellipsis() {
    let (_, diags) = parse_ok("{ a, ..., b }: 1");
    let kinds: Vec<DiagnosticKind> = diags.iter().map(|d| d.kind()).collect();
    assert!(kinds.contains(&DiagnosticKind::FormalMisplacedEllipsis));
}

#[test]
fn formals_extra_ellipsis() {
    let kinds = diag_kinds("{ a, ..., b, ... }: 1");
    assert!(kinds.contains(&DiagnosticKind::FormalExtraEllipsis));
}

#[test]
fn formals_missing_comma() {
    let kinds = diag_kinds("{ a b }: 1");
    assert!(kinds.contains(&DiagnosticKind::FormalMissingComma));
}

#[test]
fn empty_formal() {
    let kinds = diag_kinds("{ a, , b }: 1");
    assert!(kinds.contains(&DiagnosticKind::EmptyFormal));
}

#[test]
fn duplicated_formal() {
    let kinds = diag_kinds("{ a, a }: 1");
    assert!(kinds.contains(&DiagnosticKind::DuplicatedFormal));
}

#[test]
fn duplicated_formal_to_arg() {
    let kinds = diag_kinds("a @ { a }: 1");
    assert!(kinds.contains(&DiagnosticKind::DuplicatedFormalToArg));
}

#[test]
fn comments_are_collected() {
    let src = "# leading\n{ a = 1; } /* trailing */";
    let (result, _) = parse_ok(src);
    let texts: Vec<&str> = result.comments.iter().map(|c| c.range.view(src)).collect();
    assert_eq!(texts, vec!["# leading", "/* trailing */"]);
}

// ===== Universal invariants =====

fn check_range_nesting(result: &ParseResult) {
    for id in result.arena.ids() {
        let node = result.arena.get(id);
        let range = node.range();
        for child in node.children().into_iter().flatten() {
            let child_range = result.arena.get(child).range();
            assert!(
                range.contains(&child_range),
                "child {:?} range {:?} escapes parent {:?} range {:?}",
                result.arena.get(child).kind(),
                child_range,
                node.kind(),
                range,
            );
        }
    }
}

#[test]
fn range_nesting_on_representative_sources() {
    for src in [
        "let a = 1; b = a; in a + b",
        "{ a.b.c = x: x // { y = 1; }; inherit (lib) mkDerivation; }",
        "with pkgs; [ hello world ]",
        "if a == b then { x = ./a/${b}.nix; } else ''txt${c}'' ",
        "{ a = 1;\n  foo\n\n",
        "rec { x = y; y = x; }",
    ] {
        let (result, _) = parse_ok(src);
        check_range_nesting(&result);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The parser accepts arbitrary garbage without panicking, every node
    /// stays inside its parent, and all ranges stay inside the source.
    #[test]
    fn parser_is_total(src in "[ -~\\n]{0,48}") {
        let mut diags = Vec::new();
        let result = parse(&src, &mut diags);
        check_range_nesting(&result);
        for id in result.arena.ids() {
            let range = result.arena.get(id).range();
            prop_assert!(range.begin.offset <= range.end.offset);
            prop_assert!(range.end.offset <= src.len());
        }
        for diag in &diags {
            prop_assert!(diag.range().end.offset <= src.len());
            let _ = diag.severity();
        }
    }
}
