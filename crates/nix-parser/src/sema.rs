//! Semantic actions invoked by the parser.
//!
//! Non-grammatical problems (duplicated attributes, misplaced ellipsis,
//! dynamic inherit) are detected here, while the attribute-set annotations
//! are built: attrpaths are walked with mkdir-p semantics, nested sets with
//! the same static key are merged, and `inherit` is desugared into variables
//! and selects.

use std::collections::BTreeMap;

use nix_ast::{
    AttrName, AttrNameForm, AttrPath, Attribute, AttributeKind, ExprAttrs, ExprSelect, ExprVar,
    Formals, Identifier, LambdaArg, Node, NodeId, NodeKind, SemaAttrs,
};
use nix_diagnostics::{Diagnostic, DiagnosticKind, DiagnosticTag, Fix, Note, NoteKind};
use nix_position_tracking::{LexerCursorRange, TextEdit};

use crate::parser::Parser;

impl Parser<'_, '_> {
    fn dup_attr(&mut self, name: &str, range: LexerCursorRange, prev: LexerCursorRange) {
        self.diags.push(
            Diagnostic::new(DiagnosticKind::DuplicatedAttrName, range)
                .arg(name)
                .note(Note::new(NoteKind::PrevDeclared, prev)),
        );
    }

    /// Lower an attribute set and attach its [`SemaAttrs`] annotation.
    pub(crate) fn on_expr_attrs(
        &mut self,
        range: LexerCursorRange,
        binds: Option<NodeId>,
        rec: Option<NodeId>,
    ) -> NodeId {
        let attrs_id = self.alloc(Node::ExprAttrs(ExprAttrs { range, binds, rec }));
        self.sema.insert(attrs_id, SemaAttrs::new(rec.is_some()));
        if let Some(binds) = binds {
            self.lower_binds(attrs_id, binds);
        }
        attrs_id
    }

    pub(crate) fn lower_binds(&mut self, target: NodeId, binds: NodeId) {
        let Node::Binds(b) = self.arena.get(binds) else { return };
        let bindings = b.bindings.clone();
        for bind in bindings {
            match self.arena.get(bind).kind() {
                NodeKind::Binding => {
                    let Node::Binding(b) = self.arena.get(bind) else { continue };
                    let value = b.value;
                    let Node::AttrPath(path) = self.arena.get(b.path) else { continue };
                    let names = path.names.clone();
                    self.add_attr(target, &names, value);
                }
                NodeKind::Inherit => self.lower_inherit(target, bind),
                _ => {}
            }
        }
    }

    /// Insert the binding `attrpath = value;` into the set at `target`.
    fn add_attr(&mut self, target: NodeId, path: &[NodeId], value: Option<NodeId>) {
        let Some(inner) = self.select_or_create(target, path) else { return };
        let Some(name) = path.last().copied() else { return };
        self.insert_attr(inner, name, value, AttributeKind::Plain);
    }

    /// Select (or create, mkdir-p style) nested attribute sets for every
    /// path segment but the last. Returns the inner-most set's node.
    fn select_or_create(&mut self, target: NodeId, path: &[NodeId]) -> Option<NodeId> {
        debug_assert!(!path.is_empty(), "attrpath has at least one name");
        let mut inner = target;
        for name in &path[..path.len().saturating_sub(1)] {
            let name = *name;
            let name_range = self.arena.get(name).range();
            match self.arena.attr_name_static(name).map(str::to_string) {
                Some(static_name) => {
                    let existing = self
                        .sema
                        .get(&inner)
                        .and_then(|sa| sa.static_attrs().get(&static_name))
                        .cloned();
                    if let Some(attr) = existing {
                        let nested_attrs = attr.value().filter(|v| {
                            self.arena.get(*v).kind() == NodeKind::ExprAttrs
                        });
                        match nested_attrs {
                            Some(v) if !attr.from_inherit() => inner = v,
                            _ => {
                                let prev = self.arena.get(attr.key()).range();
                                self.dup_attr(&static_name, name_range, prev);
                                return None;
                            }
                        }
                    } else {
                        // Implicitly created sets are non-recursive, matching
                        // the behavior of the official Nix interpreter.
                        let nested = self.alloc(Node::ExprAttrs(ExprAttrs {
                            range: name_range,
                            binds: None,
                            rec: None,
                        }));
                        self.sema.insert(nested, SemaAttrs::new(false));
                        if let Some(sa) = self.sema.get_mut(&inner) {
                            sa.static_attrs_mut().insert(
                                static_name,
                                Attribute::new(name, Some(nested), AttributeKind::Plain),
                            );
                        }
                        inner = nested;
                    }
                }
                None => {
                    let nested = self.alloc(Node::ExprAttrs(ExprAttrs {
                        range: name_range,
                        binds: None,
                        rec: None,
                    }));
                    self.sema.insert(nested, SemaAttrs::new(false));
                    if let Some(sa) = self.sema.get_mut(&inner) {
                        sa.push_dynamic(Attribute::new(
                            name,
                            Some(nested),
                            AttributeKind::Plain,
                        ));
                    }
                    inner = nested;
                }
            }
        }
        Some(inner)
    }

    /// Insert one attribute at its final level, merging nested attribute
    /// sets when both the existing and the new value are sets.
    fn insert_attr(
        &mut self,
        inner: NodeId,
        name: NodeId,
        value: Option<NodeId>,
        kind: AttributeKind,
    ) {
        let name_range = self.arena.get(name).range();
        let Some(static_name) = self.arena.attr_name_static(name).map(str::to_string) else {
            if let Some(v) = value {
                if let Some(sa) = self.sema.get_mut(&inner) {
                    sa.push_dynamic(Attribute::new(name, Some(v), kind));
                }
            }
            return;
        };
        let existing = self
            .sema
            .get(&inner)
            .and_then(|sa| sa.static_attrs().get(&static_name))
            .cloned();
        if let Some(attr) = existing {
            let existing_attrs = attr
                .value()
                .filter(|v| self.arena.get(*v).kind() == NodeKind::ExprAttrs);
            let new_attrs =
                value.filter(|v| self.arena.get(*v).kind() == NodeKind::ExprAttrs);
            if let (Some(x), Some(y)) = (existing_attrs, new_attrs) {
                if !attr.from_inherit() && !kind.from_inherit() {
                    // Both sides are attribute sets: merge instead of
                    // reporting a duplicate.
                    self.check_attr_recursive_for_merge(x, y);
                    self.merge_attr_sets(x, y);
                    return;
                }
            }
            let prev = self.arena.get(attr.key()).range();
            self.dup_attr(&static_name, name_range, prev);
            return;
        }
        // A binding without a value still participates in duplicate checking
        // above, but is not placed into the final annotation.
        let Some(value) = value else { return };
        if let Some(sa) = self.sema.get_mut(&inner) {
            sa.static_attrs_mut()
                .insert(static_name, Attribute::new(name, Some(value), kind));
        }
    }

    /// Both sides of a merge should carry the same `rec` modifier; the
    /// official implementation silently keeps the first one.
    fn check_attr_recursive_for_merge(&mut self, x: NodeId, y: NodeId) {
        let (x_rec, x_range) = match self.arena.get(x) {
            Node::ExprAttrs(a) => (a.rec, a.range),
            _ => return,
        };
        let (y_rec, y_range) = match self.arena.get(y) {
            Node::ExprAttrs(a) => (a.rec, a.range),
            _ => return,
        };
        if x_rec.is_some() == y_rec.is_some() {
            return;
        }
        let Some(pointer) = x_rec.or(y_rec) else { return };
        let pointer_range = self.arena.get(pointer).range();
        let x_note_range = x_rec.map_or(x_range, |r| self.arena.get(r).range());
        let y_note_range = y_rec.map_or(y_range, |r| self.arena.get(r).range());
        let non = |is_rec: bool| if is_rec { "" } else { "non-" };
        self.diags.push(
            Diagnostic::new(DiagnosticKind::MergeDiffRec, pointer_range)
                .note(Note::new(NoteKind::ThisRecursive, x_note_range).arg(non(x_rec.is_some())))
                .note(
                    Note::new(NoteKind::RecConsider, y_note_range)
                        .arg(non(y_rec.is_some()))
                        .arg(non(x_rec.is_some())),
                ),
        );
    }

    /// Merge `y`'s attributes into `x`'s annotation. Duplicate leaves are
    /// reported, not merged recursively.
    fn merge_attr_sets(&mut self, x: NodeId, y: NodeId) {
        let y_sa = self.sema.get(&y).cloned().unwrap_or_default();
        for (name, attr) in y_sa.static_attrs() {
            let existing = self
                .sema
                .get(&x)
                .and_then(|sa| sa.static_attrs().get(name))
                .cloned();
            if let Some(prev) = existing {
                let range = self.arena.get(attr.key()).range();
                let prev_range = self.arena.get(prev.key()).range();
                self.dup_attr(name, range, prev_range);
                continue;
            }
            if let Some(sa) = self.sema.get_mut(&x) {
                sa.static_attrs_mut().insert(name.clone(), attr.clone());
            }
        }
        for attr in y_sa.dynamic_attrs() {
            if let Some(sa) = self.sema.get_mut(&x) {
                sa.push_dynamic(attr.clone());
            }
        }
    }

    /// Desugar `inherit x` / `inherit (e) x` into a variable or select, and
    /// insert the resulting attributes.
    fn lower_inherit(&mut self, target: NodeId, inherit: NodeId) {
        let Node::Inherit(i) = self.arena.get(inherit) else { return };
        let names = i.names.clone();
        let from_expr = i.expr;
        for name in names {
            let name_range = self.arena.get(name).range();
            if !self.arena.attr_name_is_static(name) {
                // Dynamic attrnames are not allowed in inherit.
                self.diags.push(
                    Diagnostic::new(DiagnosticKind::DynamicInherit, name_range)
                        .fix(Fix::new("remove dynamic attrname")
                            .edit(TextEdit::removal(name_range)))
                        .tag(DiagnosticTag::Striked),
                );
                continue;
            }
            let (desugared, kind) = self.desugar_inherit_expr(name, from_expr);
            self.lower_inherit_name(target, name, Some(desugared), kind);
        }
    }

    fn lower_inherit_name(
        &mut self,
        target: NodeId,
        name: NodeId,
        value: Option<NodeId>,
        kind: AttributeKind,
    ) {
        let Some(static_name) = self.arena.attr_name_static(name).map(str::to_string) else {
            return;
        };
        let name_range = self.arena.get(name).range();
        let existing = self
            .sema
            .get(&target)
            .and_then(|sa| sa.static_attrs().get(&static_name))
            .cloned();
        if let Some(attr) = existing {
            let prev = self.arena.get(attr.key()).range();
            self.dup_attr(&static_name, name_range, prev);
            return;
        }
        if let Some(sa) = self.sema.get_mut(&target) {
            sa.static_attrs_mut()
                .insert(static_name, Attribute::new(name, value, kind));
        }
    }

    /// `inherit (expr) a` → `Select(expr, a)`; `inherit a` → `Var(a)`.
    fn desugar_inherit_expr(
        &mut self,
        name: NodeId,
        from: Option<NodeId>,
    ) -> (NodeId, AttributeKind) {
        let range = self.arena.get(name).range();
        match from {
            None => {
                let ident = match self.arena.get(name) {
                    Node::AttrName(AttrName { form: AttrNameForm::Id(id), .. }) => *id,
                    _ => {
                        // A static string name; synthesize the identifier.
                        let text = self
                            .arena
                            .attr_name_static(name)
                            .unwrap_or_default()
                            .to_string();
                        self.alloc(Node::Identifier(Identifier { range, name: text }))
                    }
                };
                let var = self.alloc(Node::ExprVar(ExprVar { range, id: ident }));
                (var, AttributeKind::Inherit)
            }
            Some(e) => {
                let path = self.alloc(Node::AttrPath(AttrPath {
                    range,
                    names: vec![name],
                    dots: Vec::new(),
                }));
                let select = self.alloc(Node::ExprSelect(ExprSelect {
                    range,
                    expr: e,
                    path: Some(path),
                    default: None,
                }));
                (select, AttributeKind::InheritFrom)
            }
        }
    }

    // ===== Formals =====

    /// Build text edits that remove a formal, fixing up the next comma when
    /// the first formal is removed.
    fn remove_formal_edits(&self, fix: Fix, index: usize, members: &[NodeId]) -> Fix {
        let range = self.arena.get(members[index]).range();
        let mut fix = fix.edit(TextEdit::removal(range));
        // { ..., foo } -> { foo, ... }
        if index == 0 && members.len() > 1 {
            if let Node::Formal(second) = self.arena.get(members[1]) {
                if let Some(comma) = second.comma {
                    fix = fix.edit(TextEdit::removal(self.arena.get(comma).range()));
                }
            }
        }
        fix
    }

    /// All formals but the first must be preceded by a comma.
    fn check_formal_sep(&mut self, members: &[NodeId]) {
        for (index, member) in members.iter().enumerate() {
            let Node::Formal(formal) = self.arena.get(*member) else { continue };
            if index != 0 && formal.comma.is_none() {
                let range = formal.range;
                self.diags.push(
                    Diagnostic::new(DiagnosticKind::FormalMissingComma, range).fix(
                        Fix::new("insert ,").edit(TextEdit::insertion(range.begin, ",")),
                    ),
                );
            }
        }
    }

    /// `...` may only appear once, as the last formal.
    fn check_formal_ellipsis(&mut self, members: &[NodeId]) {
        let Some(last) = members.last() else { return };
        let last_is_ellipsis = matches!(
            self.arena.get(*last),
            Node::Formal(f) if f.is_ellipsis()
        );
        let last_r_cur = self.arena.get(*last).range().end;
        for index in 0..members.len().saturating_sub(1) {
            let Node::Formal(formal) = self.arena.get(members[index]) else { continue };
            if !formal.is_ellipsis() {
                continue;
            }
            let range = formal.range;
            let has_comma = formal.comma.is_some();
            if last_is_ellipsis {
                // Extra "...", suggest removing it.
                let fix = self.remove_formal_edits(Fix::new("remove `...`"), index, members);
                self.diags.push(
                    Diagnostic::new(DiagnosticKind::FormalExtraEllipsis, range).fix(fix),
                );
            } else {
                let mut text = self.arena.get(members[index]).src(self.src).to_string();
                if !has_comma {
                    text = format!(", {text}");
                }
                let fix = self
                    .remove_formal_edits(Fix::new("move ellipsis to the tail"), index, members)
                    .edit(TextEdit::insertion(last_r_cur, text));
                self.diags.push(
                    Diagnostic::new(DiagnosticKind::FormalMisplacedEllipsis, range).fix(fix),
                );
            }
        }
    }

    /// A formal that is just a comma, e.g. `{ , }: 1`.
    fn check_formal_empty(&mut self, members: &[NodeId]) {
        for member in members {
            let Node::Formal(formal) = self.arena.get(*member) else { continue };
            if formal.comma.is_some() && formal.id.is_none() && !formal.is_ellipsis() {
                let range = formal.range;
                self.diags.push(
                    Diagnostic::new(DiagnosticKind::EmptyFormal, range)
                        .fix(Fix::new("remove empty formal").edit(TextEdit::removal(range)))
                        .tag(DiagnosticTag::Faded),
                );
            }
        }
    }

    /// Deduplicate formals by name; the diagnostic ranges sit on the
    /// identifiers.
    fn dedup_formal(&mut self, members: &[NodeId]) -> BTreeMap<String, NodeId> {
        let mut dedup: BTreeMap<String, NodeId> = BTreeMap::new();
        for member in members {
            let Node::Formal(formal) = self.arena.get(*member) else { continue };
            let Some(id) = formal.id else { continue };
            let Node::Identifier(ident) = self.arena.get(id) else { continue };
            let name = ident.name.clone();
            let id_range = ident.range;
            if let Some(dup) = dedup.get(&name) {
                let dup_id_range = match self.arena.get(*dup) {
                    Node::Formal(f) => f
                        .id
                        .map(|i| self.arena.get(i).range())
                        .unwrap_or_else(|| self.arena.get(*dup).range()),
                    _ => self.arena.get(*dup).range(),
                };
                self.diags.push(
                    Diagnostic::new(DiagnosticKind::DuplicatedFormal, id_range)
                        .arg(&name)
                        .note(Note::new(NoteKind::DuplicateFormal, dup_id_range)),
                );
            } else {
                dedup.insert(name, *member);
            }
        }
        dedup
    }

    /// Check formals and build the deduplicated lookup map.
    pub(crate) fn on_formals(
        &mut self,
        range: LexerCursorRange,
        members: Vec<NodeId>,
    ) -> NodeId {
        self.check_formal_sep(&members);
        self.check_formal_ellipsis(&members);
        self.check_formal_empty(&members);
        let dedup = self.dedup_formal(&members);
        self.alloc(Node::Formals(Formals { range, members, dedup }))
    }

    /// An `@`-bound identifier must not collide with a formal name.
    pub(crate) fn on_lambda_arg(
        &mut self,
        range: LexerCursorRange,
        id: Option<NodeId>,
        formals: Option<NodeId>,
    ) -> NodeId {
        if let (Some(id), Some(formals)) = (id, formals) {
            let name = self.arena.get(id).as_identifier().map(|i| i.name.clone());
            if let Some(name) = name {
                let dup = self
                    .arena
                    .get(formals)
                    .as_formals()
                    .and_then(|f| f.dedup.get(&name))
                    .copied();
                if let Some(dup) = dup {
                    let id_range = self.arena.get(id).range();
                    let dup_range = self.arena.get(dup).range();
                    self.diags.push(
                        Diagnostic::new(DiagnosticKind::DuplicatedFormalToArg, id_range)
                            .note(Note::new(NoteKind::DuplicateFormal, dup_range)),
                    );
                }
            }
        }
        self.alloc(Node::LambdaArg(LambdaArg { range, id, formals }))
    }
}
