//! Attribute sets: attrnames, attrpaths, bindings, inherit, binds.

use nix_ast::{
    AttrName, AttrNameForm, AttrPath, Binding, Binds, Dot, Identifier, Inherit, Misc, Node,
    NodeId,
};
use nix_diagnostics::{Diagnostic, DiagnosticKind, DiagnosticTag, Fix, Note, NoteKind};
use nix_position_tracking::{LexerCursorRange, TextEdit};
use nix_token::TokenKind;

use crate::parser::{ExpectResult, Parser};

impl Parser<'_, '_> {
    /// ```text
    /// attrname : ID | string | interpolation
    /// ```
    ///
    /// The keyword `or` is accepted as an attribute name with a warning.
    pub(crate) fn parse_attr_name(&mut self) -> Option<NodeId> {
        let tok = self.peek_n(0).clone();
        match tok.kind {
            TokenKind::KwOr | TokenKind::Identifier => {
                if tok.kind == TokenKind::KwOr {
                    self.diags
                        .push(Diagnostic::new(DiagnosticKind::OrIdentifier, tok.range));
                }
                self.consume();
                let name = tok.view(self.src).to_string();
                let id = self.alloc(Node::Identifier(Identifier { range: tok.range, name }));
                Some(self.alloc(Node::AttrName(AttrName {
                    range: tok.range,
                    form: AttrNameForm::Id(id),
                })))
            }
            TokenKind::DQuote => {
                let string = self.parse_string(false);
                let range = self.arena.get(string).range();
                Some(self.alloc(Node::AttrName(AttrName {
                    range,
                    form: AttrNameForm::String(string),
                })))
            }
            TokenKind::DollarCurly => {
                let interp = self.parse_interpolation();
                let range = self.arena.get(interp).range();
                Some(self.alloc(Node::AttrName(AttrName {
                    range,
                    form: AttrNameForm::Interpolation(interp),
                })))
            }
            _ => None,
        }
    }

    /// ```text
    /// attrpath : attrname ('.' attrname)*
    /// ```
    pub(crate) fn parse_attr_path(&mut self) -> Option<NodeId> {
        let first = self.parse_attr_name()?;
        let begin = self.arena.get(first).range().begin;
        let mut names = vec![first];
        let mut dots = Vec::new();
        let mut prev_name = first;
        self.with_sync(&[TokenKind::Dot], |p| {
            loop {
                let tok = p.peek_n(0).clone();
                if tok.kind != TokenKind::Dot {
                    break;
                }
                p.consume(); // .
                let next = p.parse_attr_name();
                let dot = p.alloc(Node::Dot(Dot {
                    range: tok.range,
                    prev: prev_name,
                    next,
                }));
                dots.push(dot);
                match next {
                    Some(name) => {
                        prev_name = name;
                        names.push(name);
                    }
                    None => {
                        // Extra ".", consider removing it.
                        p.diags.push(
                            Diagnostic::new(DiagnosticKind::AttrPathExtraDot, tok.range)
                                .fix(Fix::new("remove extra .")
                                    .edit(TextEdit::removal(tok.range)))
                                .fix(Fix::new("insert dummy attrname").edit(
                                    TextEdit::insertion(tok.r_cur(), "\"dummy\""),
                                )),
                        );
                    }
                }
            }
        });
        let range = LexerCursorRange::new(begin, self.last_r_cur());
        Some(self.alloc(Node::AttrPath(AttrPath { range, names, dots })))
    }

    /// ```text
    /// binding : attrpath '=' expr ';'
    /// ```
    pub(crate) fn parse_binding(&mut self) -> Option<NodeId> {
        let path = self.parse_attr_path()?;
        let begin = self.arena.get(path).range().begin;
        Some(self.with_sync(&[TokenKind::Assign, TokenKind::Semicolon], |p| {
            let eq_tok = match p.expect(TokenKind::Assign) {
                ExpectResult::Ok(tok) => tok,
                ExpectResult::Missing(_) => {
                    let range = LexerCursorRange::new(begin, p.last_r_cur());
                    return p.alloc(Node::Binding(Binding {
                        range,
                        path,
                        eq: None,
                        value: None,
                    }));
                }
            };
            p.consume(); // =
            let eq = p.alloc(Node::Misc(Misc { range: eq_tok.range }));
            let value = p.parse_expr();
            if value.is_none() {
                let loc = p.last_r_cur();
                p.diag_null_expr(loc, "binding");
            }
            if p.peek_kind() == TokenKind::Semicolon {
                p.consume();
            } else {
                let insert = p.last_r_cur();
                p.diags.push(
                    Diagnostic::new(
                        DiagnosticKind::Expected,
                        LexerCursorRange::empty(insert),
                    )
                    .arg(TokenKind::Semicolon.spelling())
                    .fix(Fix::new("insert ;").edit(TextEdit::insertion(insert, ";"))),
                );
            }
            let range = LexerCursorRange::new(begin, p.last_r_cur());
            p.alloc(Node::Binding(Binding { range, path, eq: Some(eq), value }))
        }))
    }

    /// ```text
    /// inherit : 'inherit' '(' expr ')' inherited_attrs ';'
    ///         | 'inherit' inherited_attrs ';'
    /// inherited_attrs : attrname*
    /// ```
    pub(crate) fn parse_inherit(&mut self) -> Option<NodeId> {
        let tok_inherit = self.peek_n(0).clone();
        if tok_inherit.kind != TokenKind::KwInherit {
            return None;
        }
        self.consume();
        let sync = [
            TokenKind::Semicolon,
            // These tokens might be consumed as inherited_attrs.
            TokenKind::Identifier,
            TokenKind::DQuote,
            TokenKind::DollarCurly,
        ];
        Some(self.with_sync(&sync, |p| {
            let mut expr = None;
            if p.peek_kind() == TokenKind::LParen {
                let l_paren = p.peek_n(0).clone();
                p.consume();
                expr = p.parse_expr();
                if expr.is_none() {
                    let loc = p.last_r_cur();
                    p.diag_null_expr(loc, "inherit");
                }
                match p.expect(TokenKind::RParen) {
                    ExpectResult::Ok(_) => {
                        p.consume();
                    }
                    ExpectResult::Missing(idx) => {
                        p.diags[idx].notes_mut().push(
                            Note::new(NoteKind::ToMatchThis, l_paren.range)
                                .arg(TokenKind::LParen.spelling()),
                        );
                    }
                }
            }
            let mut names = Vec::new();
            while let Some(name) = p.parse_attr_name() {
                names.push(name);
            }
            let semi = p.expect(TokenKind::Semicolon);
            let semi_tok = match &semi {
                ExpectResult::Ok(tok) => {
                    let tok = tok.clone();
                    p.consume();
                    Some(tok)
                }
                ExpectResult::Missing(idx) => {
                    p.diags[*idx].notes_mut().push(
                        Note::new(NoteKind::ToMatchThis, tok_inherit.range)
                            .arg(TokenKind::KwInherit.spelling()),
                    );
                    None
                }
            };
            if names.is_empty() {
                let mut fix = Fix::new("remove `inherit` keyword")
                    .edit(TextEdit::removal(tok_inherit.range));
                if let Some(semi_tok) = &semi_tok {
                    fix = fix.edit(TextEdit::removal(semi_tok.range));
                }
                p.diags.push(
                    Diagnostic::new(DiagnosticKind::EmptyInherit, tok_inherit.range)
                        .tag(DiagnosticTag::Faded)
                        .fix(fix),
                );
            }
            let range = LexerCursorRange::new(tok_inherit.l_cur(), p.last_r_cur());
            p.alloc(Node::Inherit(Inherit { range, names, expr }))
        }))
    }

    /// ```text
    /// binds : ( binding | inherit )*
    /// ```
    pub(crate) fn parse_binds(&mut self) -> Option<NodeId> {
        let begin = self.l_cur();
        let sync = [
            // attrpath
            TokenKind::Identifier,
            TokenKind::DQuote,
            TokenKind::DollarCurly,
            // inherit
            TokenKind::KwInherit,
        ];
        self.with_sync(&sync, |p| {
            let mut bindings = Vec::new();
            loop {
                if let Some(binding) = p.parse_binding() {
                    bindings.push(binding);
                    continue;
                }
                if let Some(inherit) = p.parse_inherit() {
                    bindings.push(inherit);
                    continue;
                }
                // Neither a binding nor an inherit: drop an unexpected-text
                // region and retry.
                if p.remove_unexpected() {
                    continue;
                }
                break;
            }
            if bindings.is_empty() {
                return None;
            }
            let range = LexerCursorRange::new(begin, p.last_r_cur());
            Some(p.alloc(Node::Binds(Binds { range, bindings })))
        })
    }

    /// ```text
    /// attrset_expr : REC? '{' binds '}'
    /// ```
    ///
    /// The caller peeks `rec` or `{` before calling this.
    pub(crate) fn parse_expr_attrs(&mut self) -> NodeId {
        self.with_sync(&[TokenKind::RBrace], |p| {
            // "to match this ...": if "{" is missing, point at "rec".
            let mut matcher = p.peek_n(0).clone();
            let begin = matcher.l_cur();
            let mut rec = None;
            if p.peek_kind() == TokenKind::KwRec {
                let tok = p.consume();
                rec = Some(p.alloc(Node::Misc(Misc { range: tok.range })));
            }
            if let ExpectResult::Ok(tok) = p.expect(TokenKind::LBrace) {
                matcher = tok;
                p.consume();
            }
            let binds = p.parse_binds();
            match p.expect(TokenKind::RBrace) {
                ExpectResult::Ok(_) => {
                    p.consume();
                }
                ExpectResult::Missing(idx) => {
                    p.diags[idx].notes_mut().push(
                        Note::new(NoteKind::ToMatchThis, matcher.range)
                            .arg(matcher.kind.spelling()),
                    );
                }
            }
            let range = LexerCursorRange::new(begin, p.last_r_cur());
            p.on_expr_attrs(range, binds, rec)
        })
    }
}
