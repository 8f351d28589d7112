#![allow(clippy::unwrap_used, clippy::panic)]

use super::*;
use nix_ast::NodeKind;
use nix_diagnostics::Diagnostic;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

struct Analyzed {
    result: nix_parser::ParseResult,
    root: NodeId,
    vla: VariableLookupAnalysis,
    diags: Vec<Diagnostic>,
}

fn analyze(src: &str) -> Analyzed {
    let mut diags = Vec::new();
    let result = nix_parser::parse(src, &mut diags);
    let root = result.root.unwrap_or_else(|| panic!("no root for {src:?}"));
    let vla = VariableLookupAnalysis::run(&result.arena, &result.sema, root, &mut diags);
    Analyzed { result, root, vla, diags }
}

fn vars_of(a: &Analyzed) -> Vec<NodeId> {
    let mut vars = Vec::new();
    let mut stack = vec![a.root];
    while let Some(id) = stack.pop() {
        if a.result.arena.get(id).kind() == NodeKind::ExprVar {
            vars.push(id);
        }
        for child in a.result.arena.get(id).children().into_iter().flatten() {
            stack.push(child);
        }
    }
    vars
}

fn diag_kinds(a: &Analyzed) -> Vec<DiagnosticKind> {
    a.diags.iter().map(|d| d.kind()).collect()
}

#[test]
fn let_binding_resolves() {
    let src = "let x = 1; in x";
    let a = analyze(src);
    let vars = vars_of(&a);
    assert_eq!(vars.len(), 1);
    let result = a.vla.query(vars[0]).unwrap();
    assert_eq!(result.kind, LookupResultKind::Defined);
    let def = a.vla.def(result.def.unwrap());
    assert_eq!(def.source(), DefinitionSource::Let);
    assert_eq!(def.uses(), &[vars[0]]);
    // The defining syntax is the attrname `x`.
    let syntax = def.syntax().unwrap();
    assert_eq!(a.result.arena.get(syntax).src(src), "x");
    assert_eq!(a.diags.len(), 0);
}

#[test]
fn builtins_resolve_without_syntax() {
    let a = analyze("map");
    let vars = vars_of(&a);
    let result = a.vla.query(vars[0]).unwrap();
    assert_eq!(result.kind, LookupResultKind::Defined);
    assert!(a.vla.def(result.def.unwrap()).is_builtin());
    assert_eq!(a.diags.len(), 0);
}

#[test]
fn undefined_variable_is_reported() {
    let a = analyze("[ nope ]");
    let vars = vars_of(&a);
    let result = a.vla.query(vars[0]).unwrap();
    assert_eq!(result.kind, LookupResultKind::Undefined);
    assert_eq!(diag_kinds(&a), vec![DiagnosticKind::UndefinedVariable]);
    assert_eq!(a.diags[0].format(), "undefined variable `nope`");
}

#[test]
fn with_scope_catches_unresolved_names() {
    let src = "with pkgs; [ hello ]";
    let a = analyze(src);
    let vars = vars_of(&a);
    // `pkgs` and `hello`.
    assert_eq!(vars.len(), 2);
    for var in &vars {
        let result = a.vla.query(*var).unwrap();
        match a.result.arena.get(*var).src(src) {
            "pkgs" => assert_eq!(result.kind, LookupResultKind::Undefined),
            "hello" => assert_eq!(result.kind, LookupResultKind::FromWith),
            other => panic!("unexpected var {other}"),
        }
    }
    // `pkgs` is undefined in this fragment; the with itself is used.
    assert_eq!(diag_kinds(&a), vec![DiagnosticKind::UndefinedVariable]);
}

#[test]
fn unused_with_scenario() {
    let a = analyze("with whatEverUndefined; [ ]");
    let kinds = diag_kinds(&a);
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&DiagnosticKind::UndefinedVariable));
    assert!(kinds.contains(&DiagnosticKind::ExtraWith));
    let extra = a
        .diags
        .iter()
        .find(|d| d.kind() == DiagnosticKind::ExtraWith)
        .unwrap();
    // The fix removes `with`, the scope expression, and the `;`.
    assert_eq!(extra.fixes()[0].edits().len(), 3);
}

#[test]
fn lambda_formals_and_arg() {
    let src = "args @ { x, y ? x, ... }: x + y";
    let a = analyze(src);
    for var in vars_of(&a) {
        let result = a.vla.query(var).unwrap();
        assert_eq!(result.kind, LookupResultKind::Defined);
        let def = a.vla.def(result.def.unwrap());
        assert_eq!(def.source(), DefinitionSource::LambdaFormal);
    }
    // `args` is unused but lambda args are exempt from liveness warnings.
    assert_eq!(a.diags.len(), 0);
}

#[test]
fn rec_attrs_allow_self_reference() {
    let src = "rec { a = b; b = 1; }";
    let a = analyze(src);
    assert_eq!(a.diags.len(), 0);
    let vars = vars_of(&a);
    assert_eq!(vars.len(), 1);
    let def = a.vla.def(a.vla.query(vars[0]).unwrap().def.unwrap());
    assert_eq!(def.source(), DefinitionSource::Rec);
}

#[test]
fn non_recursive_attrs_do_not_bind() {
    let a = analyze("{ a = 1; b = a; }");
    assert_eq!(diag_kinds(&a), vec![DiagnosticKind::UndefinedVariable]);
}

#[test]
fn inherit_in_rec_resolves_outside() {
    // The inherited `x` must come from the let, not from the rec set itself.
    let src = "let x = 1; in rec { inherit x; y = x; }";
    let a = analyze(src);
    assert_eq!(a.diags.len(), 0);
    let vars = vars_of(&a);
    let sources: Vec<DefinitionSource> = vars
        .iter()
        .map(|v| a.vla.def(a.vla.query(*v).unwrap().def.unwrap()).source())
        .collect();
    assert!(sources.contains(&DefinitionSource::Let));
    assert!(sources.contains(&DefinitionSource::Rec));
}

#[test]
fn definition_not_used_is_faded() {
    let a = analyze("let unused = 1; in 2");
    assert_eq!(diag_kinds(&a), vec![DiagnosticKind::DefinitionNotUsed]);
    assert_eq!(a.diags[0].format(), "definition `unused` is not used");
    assert_eq!(a.diags[0].tags(), &[DiagnosticTag::Faded]);
}

#[test]
fn extra_recursive_is_reported_with_removal_fix() {
    let src = "rec { a = 1; }";
    let a = analyze(src);
    assert_eq!(diag_kinds(&a), vec![DiagnosticKind::ExtraRecursive]);
    assert_eq!(a.diags[0].range().view(src), "rec");
    assert!(!a.diags[0].fixes().is_empty());
}

#[test]
fn escaping_with_warns_with_notes() {
    let src = "let a = 1; in with { }; a";
    let a = analyze(src);
    let kinds = diag_kinds(&a);
    assert!(kinds.contains(&DiagnosticKind::EscapingWith));
    let escaping = a
        .diags
        .iter()
        .find(|d| d.kind() == DiagnosticKind::EscapingWith)
        .unwrap();
    assert_eq!(escaping.range().view(src), "a");
    let note_kinds: Vec<NoteKind> = escaping.notes().iter().map(|n| n.kind()).collect();
    assert_eq!(note_kinds, vec![NoteKind::VarBindToThis, NoteKind::EscapingWith]);
}

#[test]
fn with_env_records_synthetic_definition() {
    let src = "with pkgs; [ hello hello ]";
    let a = analyze(src);
    let root = a.root;
    let Node::ExprWith(w) = a.result.arena.get(root) else { panic!("expected with") };
    let def = a.vla.with_def(root).unwrap();
    assert_eq!(a.vla.def(def).uses().len(), 2);
    assert_eq!(a.vla.to_def(w.kw_with), Some(def));
}

#[test]
fn completion_env_walk_collects_ancestors() {
    let src = "let alpha = 1; in x: alpha + x";
    let a = analyze(src);
    let vars = vars_of(&a);
    let alpha = vars
        .iter()
        .find(|v| a.result.arena.get(**v).src(src) == "alpha")
        .unwrap();
    let mut names = Vec::new();
    let mut env = a.vla.env_of(*alpha);
    while let Some(e) = env {
        names.extend(a.vla.env(e).defs().keys().cloned());
        env = a.vla.env(e).parent();
    }
    assert!(names.contains(&"alpha".to_string()));
    assert!(names.contains(&"x".to_string()));
    assert!(names.contains(&"builtins".to_string()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Lookup totality and definition consistency: every variable gets a
    /// result, and `Defined` results appear in their definition's use list.
    #[test]
    fn lookup_is_total_and_consistent(src in "[ a-z0-9(){};:=.\\[\\]]{0,40}") {
        let mut diags = Vec::new();
        let result = nix_parser::parse(&src, &mut diags);
        let Some(root) = result.root else { return Ok(()) };
        let vla = VariableLookupAnalysis::run(&result.arena, &result.sema, root, &mut diags);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if result.arena.get(id).kind() == NodeKind::ExprVar {
                let lookup = vla.query(id);
                prop_assert!(lookup.is_some(), "missing lookup for var {id:?}");
                let lookup = lookup.unwrap();
                if lookup.kind == LookupResultKind::Defined {
                    let def = vla.def(lookup.def.unwrap());
                    prop_assert!(def.uses().contains(&id));
                }
            }
            for child in result.arena.get(id).children().into_iter().flatten() {
                stack.push(child);
            }
        }
    }
}
