//! Variable lookup.
//!
//! Builds the scope tree and resolves every variable use to a definition,
//! the innermost enclosing `with`, or "undefined". Liveness is tracked on
//! the way: unused definitions, unused `with` expressions and unnecessary
//! `rec` modifiers are reported here.
//!
//! The analysis is designed to agree with the official interpreter's
//! scoping: lexical bindings always win over `with`, and `inherit`ed values
//! resolve in the scope *enclosing* the attribute set, even under `rec`.

use std::collections::BTreeMap;

use nix_ast::{Node, NodeArena, NodeId, SemaAttrs, SemaMap};
use nix_diagnostics::{Diagnostic, DiagnosticKind, DiagnosticTag, Fix, Note, NoteKind};
use nix_position_tracking::TextEdit;
use rustc_hash::FxHashMap;

use crate::builtins::BUILTINS;

/// Index of a [`Definition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(u32);

impl DefId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an [`EnvNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(u32);

impl EnvId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a definition comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionSource {
    /// Seeded into the root environment.
    Builtin,
    /// `x: ...`
    LambdaArg,
    /// `{ x, ... }: ...`
    LambdaFormal,
    /// `rec { x = ...; }`
    Rec,
    /// `let x = ...; in ...`
    Let,
    /// The synthetic definition of a `with` scope.
    With,
}

/// A named binding site and its recorded uses.
#[derive(Debug, Clone)]
pub struct Definition {
    syntax: Option<NodeId>,
    source: DefinitionSource,
    uses: Vec<NodeId>,
}

impl Definition {
    /// The defining syntax node; `None` for builtins.
    pub fn syntax(&self) -> Option<NodeId> {
        self.syntax
    }

    pub fn source(&self) -> DefinitionSource {
        self.source
    }

    /// Every `ExprVar` resolved to this definition, in visit order.
    pub fn uses(&self) -> &[NodeId] {
        &self.uses
    }

    pub fn is_builtin(&self) -> bool {
        self.syntax.is_none()
    }
}

/// One lexical scope.
#[derive(Debug)]
pub struct EnvNode {
    parent: Option<EnvId>,
    defs: BTreeMap<String, DefId>,
    /// The node that introduced the scope (`Lambda`, recursive `Attrs`,
    /// `Let`, `With`); `None` for the builtin root.
    syntax: Option<NodeId>,
    is_with: bool,
}

impl EnvNode {
    pub fn parent(&self) -> Option<EnvId> {
        self.parent
    }

    pub fn defs(&self) -> &BTreeMap<String, DefId> {
        &self.defs
    }

    pub fn syntax(&self) -> Option<NodeId> {
        self.syntax
    }

    pub fn is_with(&self) -> bool {
        self.is_with
    }
}

/// How a variable resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResultKind {
    Undefined,
    FromWith,
    Defined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupResult {
    pub kind: LookupResultKind,
    pub def: Option<DefId>,
}

/// The analysis result. Immutable once built.
#[derive(Debug)]
pub struct VariableLookupAnalysis {
    defs: Vec<Definition>,
    envs: Vec<EnvNode>,
    env_of: FxHashMap<NodeId, EnvId>,
    results: FxHashMap<NodeId, LookupResult>,
    with_defs: FxHashMap<NodeId, DefId>,
    to_def: FxHashMap<NodeId, DefId>,
}

impl VariableLookupAnalysis {
    pub fn run(
        arena: &NodeArena,
        sema: &SemaMap,
        root: NodeId,
        diags: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut walker = Walker {
            arena,
            sema,
            diags,
            out: VariableLookupAnalysis {
                defs: Vec::new(),
                envs: Vec::new(),
                env_of: FxHashMap::default(),
                results: FxHashMap::default(),
                with_defs: FxHashMap::default(),
                to_def: FxHashMap::default(),
            },
        };
        let mut builtin_defs = BTreeMap::new();
        for name in BUILTINS.iter() {
            let def = walker.out.add_def(None, DefinitionSource::Builtin);
            builtin_defs.insert((*name).to_string(), def);
        }
        let root_env = walker.out.add_env(EnvNode {
            parent: None,
            defs: builtin_defs,
            syntax: None,
            is_with: false,
        });
        walker.dfs(root, root_env);
        walker.out
    }

    fn add_def(&mut self, syntax: Option<NodeId>, source: DefinitionSource) -> DefId {
        let id = DefId(self.defs.len() as u32);
        self.defs.push(Definition { syntax, source, uses: Vec::new() });
        id
    }

    fn add_env(&mut self, env: EnvNode) -> EnvId {
        let id = EnvId(self.envs.len() as u32);
        self.envs.push(env);
        id
    }

    pub fn def(&self, id: DefId) -> &Definition {
        &self.defs[id.index()]
    }

    pub fn env(&self, id: EnvId) -> &EnvNode {
        &self.envs[id.index()]
    }

    /// Lookup result for an `ExprVar` node. Total over all variables
    /// reachable from the root.
    pub fn query(&self, var: NodeId) -> Option<LookupResult> {
        self.results.get(&var).copied()
    }

    /// The environment in effect at `node`.
    pub fn env_of(&self, node: NodeId) -> Option<EnvId> {
        self.env_of.get(&node).copied()
    }

    /// The definition introduced *by* a syntax node (attrname key, formal
    /// identifier, lambda argument, `with` keyword).
    pub fn to_def(&self, node: NodeId) -> Option<DefId> {
        self.to_def.get(&node).copied()
    }

    /// The synthetic definition of a `with` expression node.
    pub fn with_def(&self, with: NodeId) -> Option<DefId> {
        self.with_defs.get(&with).copied()
    }

    fn is_live(&self, env: EnvId) -> bool {
        self.env(env).defs.values().any(|d| !self.def(*d).uses.is_empty())
    }
}

struct Walker<'a> {
    arena: &'a NodeArena,
    sema: &'a SemaMap,
    diags: &'a mut Vec<Diagnostic>,
    out: VariableLookupAnalysis,
}

impl Walker<'_> {
    fn dfs(&mut self, node: NodeId, env: EnvId) {
        self.out.env_of.insert(node, env);
        match self.arena.get(node) {
            Node::ExprVar(_) => self.lookup_var(node, env),
            Node::ExprLambda(_) => self.dfs_lambda(node, env),
            Node::ExprAttrs(_) => self.dfs_expr_attrs(node, env),
            Node::ExprLet(_) => self.dfs_let(node, env),
            Node::ExprWith(_) => self.dfs_with(node, env),
            other => {
                for child in other.children().into_iter().flatten() {
                    self.dfs(child, env);
                }
            }
        }
    }

    /// Walk up from `env`. The innermost crossed `with` only applies when no
    /// lexical binding is found; a binding found *outside* a crossed `with`
    /// is suspicious and gets an `escaping-with` warning.
    fn lookup_var(&mut self, var: NodeId, env: EnvId) {
        let Node::ExprVar(v) = self.arena.get(var) else { return };
        let Node::Identifier(ident) = self.arena.get(v.id) else { return };
        let name = ident.name.clone();
        let var_range = self.arena.get(var).range();

        let mut with_env: Option<EnvId> = None;
        let mut found: Option<DefId> = None;
        let mut cur = Some(env);
        while let Some(e) = cur {
            if let Some(def) = self.out.env(e).defs.get(&name) {
                found = Some(*def);
                break;
            }
            if self.out.env(e).is_with && with_env.is_none() {
                with_env = Some(e);
            }
            cur = self.out.env(e).parent;
        }

        if let Some(def) = found {
            self.out.defs[def.index()].uses.push(var);
            self.out.results.insert(
                var,
                LookupResult { kind: LookupResultKind::Defined, def: Some(def) },
            );
            if let Some(with_env) = with_env {
                // Escaping from "with" to an outer scope.
                let mut diag = Diagnostic::new(DiagnosticKind::EscapingWith, var_range);
                if let Some(syntax) = self.out.def(def).syntax {
                    diag = diag.note(Note::new(
                        NoteKind::VarBindToThis,
                        self.arena.get(syntax).range(),
                    ));
                }
                if let Some(kw_range) = self.with_kw_range(with_env) {
                    diag = diag.note(Note::new(NoteKind::EscapingWith, kw_range));
                }
                self.diags.push(diag);
            }
            return;
        }

        if let Some(with_env) = with_env {
            let with_syntax = self.out.env(with_env).syntax;
            if let Some(def) = with_syntax.and_then(|s| self.out.with_defs.get(&s)).copied() {
                self.out.defs[def.index()].uses.push(var);
                self.out.results.insert(
                    var,
                    LookupResult { kind: LookupResultKind::FromWith, def: Some(def) },
                );
                return;
            }
        }

        self.out
            .results
            .insert(var, LookupResult { kind: LookupResultKind::Undefined, def: None });
        self.diags
            .push(Diagnostic::new(DiagnosticKind::UndefinedVariable, var_range).arg(name));
    }

    fn with_kw_range(&self, with_env: EnvId) -> Option<nix_position_tracking::LexerCursorRange> {
        let syntax = self.out.env(with_env).syntax?;
        match self.arena.get(syntax) {
            Node::ExprWith(w) => Some(self.arena.get(w.kw_with).range()),
            _ => None,
        }
    }

    fn dfs_lambda(&mut self, lambda: NodeId, env: EnvId) {
        let Node::ExprLambda(l) = self.arena.get(lambda) else { return };
        // Incomplete lambdas don't open a scope.
        let Some(body) = l.body else { return };
        let arg = l.arg;

        let mut defs: BTreeMap<String, DefId> = BTreeMap::new();
        let mut formal_defaults = Vec::new();
        if let Some(arg) = arg {
            let Node::LambdaArg(la) = self.arena.get(arg) else { return };
            let formals = la.formals;

            // { foo, bar, ... }: body
            //   ^~~~~~~~<------------- formal definitions
            if let Some(formals) = formals {
                if let Node::Formals(f) = self.arena.get(formals) {
                    for (name, formal) in &f.dedup {
                        let Node::Formal(fm) = self.arena.get(*formal) else { continue };
                        let Some(id) = fm.id else { continue };
                        if let Some(default) = fm.default {
                            formal_defaults.push(default);
                        }
                        let def = self.out.add_def(Some(id), DefinitionSource::LambdaFormal);
                        self.out.to_def.insert(id, def);
                        defs.insert(name.clone(), def);
                    }
                }
            }

            // foo: body
            // ^~~<------- the function argument. Skipped when it collides
            // with a formal; the formal wins.
            if let Some(id) = la.id {
                if let Node::Identifier(ident) = self.arena.get(id) {
                    if !defs.contains_key(&ident.name) {
                        let def = self.out.add_def(Some(id), DefinitionSource::LambdaArg);
                        self.out.to_def.insert(id, def);
                        defs.insert(ident.name.clone(), def);
                    }
                }
            }
        }

        let new_env = self.out.add_env(EnvNode {
            parent: Some(env),
            defs,
            syntax: Some(lambda),
            is_with: false,
        });

        for default in formal_defaults {
            self.dfs(default, new_env);
        }
        self.dfs(body, new_env);
        self.emit_env_liveness(new_env);
    }

    /// Walk an attribute set through its lowered annotation. Returns the
    /// environment the members were walked in (a fresh one iff recursive).
    fn dfs_attrs(
        &mut self,
        sema: &SemaAttrs,
        env: EnvId,
        syntax: NodeId,
        source: DefinitionSource,
    ) -> EnvId {
        if sema.is_recursive() {
            let mut defs = BTreeMap::new();
            for (name, attr) in sema.static_attrs() {
                let def = self.out.add_def(Some(attr.key()), source);
                self.out.to_def.insert(attr.key(), def);
                defs.insert(name.clone(), def);
            }
            let new_env = self.out.add_env(EnvNode {
                parent: Some(env),
                defs,
                syntax: Some(syntax),
                is_with: false,
            });
            for attr in sema.static_attrs().values() {
                let Some(value) = attr.value() else { continue };
                // `inherit` resolves in the enclosing scope, not in the
                // recursive set itself.
                let value_env = if attr.from_inherit() { env } else { new_env };
                self.dfs(value, value_env);
            }
            for attr in sema.dynamic_attrs() {
                self.dfs(attr.key(), new_env);
                if let Some(value) = attr.value() {
                    self.dfs(value, new_env);
                }
            }
            return new_env;
        }

        for attr in sema.static_attrs().values() {
            if let Some(value) = attr.value() {
                self.dfs(value, env);
            }
        }
        for attr in sema.dynamic_attrs() {
            self.dfs(attr.key(), env);
            if let Some(value) = attr.value() {
                self.dfs(value, env);
            }
        }
        env
    }

    fn dfs_expr_attrs(&mut self, attrs: NodeId, env: EnvId) {
        let Some(sema) = self.sema.get(&attrs) else { return };
        let sema = sema.clone();
        let new_env = self.dfs_attrs(&sema, env, attrs, DefinitionSource::Rec);
        if new_env != env && !self.out.is_live(new_env) {
            let Node::ExprAttrs(a) = self.arena.get(attrs) else { return };
            let Some(rec) = a.rec else { return };
            let rec_range = self.arena.get(rec).range();
            self.diags.push(
                Diagnostic::new(DiagnosticKind::ExtraRecursive, rec_range)
                    .fix(Fix::new("remove `rec` keyword").edit(TextEdit::removal(rec_range)))
                    .tag(DiagnosticTag::Faded),
            );
        }
    }

    fn dfs_let(&mut self, let_id: NodeId, env: EnvId) {
        let Node::ExprLet(l) = self.arena.get(let_id) else { return };
        let binds = l.binds;
        let expr = l.expr;

        // An empty `let in e` passes the environment through unchanged.
        let let_env = match (binds, self.sema.get(&let_id).cloned()) {
            (Some(_), Some(sema)) => self.dfs_attrs(&sema, env, let_id, DefinitionSource::Let),
            _ => env,
        };

        if let Some(expr) = expr {
            self.dfs(expr, let_env);
        }
        if let_env != env {
            self.emit_env_liveness(let_env);
        }
    }

    fn dfs_with(&mut self, with_id: NodeId, env: EnvId) {
        let Node::ExprWith(w) = self.arena.get(with_id) else { return };
        let kw_with = w.kw_with;
        let with_expr = w.with;
        let tok_semi = w.tok_semi;
        let body = w.expr;

        let new_env = self.out.add_env(EnvNode {
            parent: Some(env),
            defs: BTreeMap::new(),
            syntax: Some(with_id),
            is_with: true,
        });
        let def = match self.out.with_defs.get(&with_id) {
            Some(def) => *def,
            None => {
                let def = self.out.add_def(Some(kw_with), DefinitionSource::With);
                self.out.to_def.insert(kw_with, def);
                self.out.with_defs.insert(with_id, def);
                def
            }
        };

        if let Some(with_expr) = with_expr {
            self.dfs(with_expr, env);
        }
        if let Some(body) = body {
            self.dfs(body, new_env);
        }

        if self.out.def(def).uses.is_empty() {
            let kw_range = self.arena.get(kw_with).range();
            let mut fix =
                Fix::new("remove `with` expression").edit(TextEdit::removal(kw_range));
            if let Some(semi) = tok_semi {
                fix = fix.edit(TextEdit::removal(self.arena.get(semi).range()));
            }
            if let Some(with_expr) = with_expr {
                fix = fix.edit(TextEdit::removal(self.arena.get(with_expr).range()));
            }
            self.diags
                .push(Diagnostic::new(DiagnosticKind::ExtraWith, kw_range).fix(fix));
        }
    }

    /// Unused-definition warnings for a scope that just closed. Lambda
    /// arguments are exempt: removing one changes the function's signature.
    fn emit_env_liveness(&mut self, env: EnvId) {
        let defs: Vec<(String, DefId)> = self
            .out
            .env(env)
            .defs
            .iter()
            .map(|(name, def)| (name.clone(), *def))
            .collect();
        for (name, def) in defs {
            let definition = self.out.def(def);
            if definition.source == DefinitionSource::LambdaArg {
                continue;
            }
            if !definition.uses.is_empty() {
                continue;
            }
            let Some(syntax) = definition.syntax else { continue };
            let range = self.arena.get(syntax).range();
            self.diags.push(
                Diagnostic::new(DiagnosticKind::DefinitionNotUsed, range)
                    .arg(name)
                    .tag(DiagnosticTag::Faded),
            );
        }
    }
}

#[cfg(test)]
mod tests;
