//! Expression-level parsing: select, application, keyword forms, and the
//! Pratt layer for operators.

use nix_ast::{
    ExprAssert, ExprBinOp, ExprCall, ExprIf, ExprLet, ExprOpHasAttr, ExprSelect, ExprUnaryOp,
    ExprWith, Misc, Node, NodeId, SemaAttrs,
};
use nix_diagnostics::{Diagnostic, DiagnosticKind, Fix, Note, NoteKind};
use nix_position_tracking::{LexerCursorRange, TextEdit};
use nix_token::TokenKind;

use crate::parser::{ExpectResult, Parser};

/// Binding powers of the binary operators:
///
/// ```text
/// %right ->
/// %left ||
/// %left &&
/// %nonassoc == !=
/// %nonassoc < > <= >=
/// %right //
/// %left NOT
/// %left + -
/// %left * /
/// %right ++
/// %nonassoc '?'
/// %nonassoc NEGATE
/// ```
fn binary_bp(kind: TokenKind) -> (u8, u8) {
    use TokenKind::*;
    match kind {
        Implies => (2, 1),
        Or => (3, 4),
        And => (5, 6),
        Equal | NotEqual => (7, 7),
        Less | LessEqual | Greater | GreaterEqual => (8, 8),
        Update => (10, 9),
        Plus | Minus => (12, 13),
        Star | Slash => (14, 15),
        Concat => (17, 16),
        _ => (0, 0),
    }
}

fn unary_bp(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Not => 11,
        TokenKind::Minus => 100,
        _ => 0,
    }
}

impl Parser<'_, '_> {
    /// ```text
    /// expr_select : expr_simple '.' attrpath
    ///             | expr_simple '.' attrpath 'or' expr_select
    ///             | expr_simple
    /// ```
    pub(crate) fn parse_expr_select(&mut self) -> Option<NodeId> {
        let expr = self.parse_expr_simple()?;
        let begin = self.arena.get(expr).range().begin;

        let tok = self.peek_n(0).clone();
        if tok.kind != TokenKind::Dot {
            return Some(expr);
        }
        self.consume(); // .
        let path = self.parse_attr_path();
        if path.is_none() {
            // Extra ".", consider removing it.
            self.diags.push(
                Diagnostic::new(DiagnosticKind::SelectExtraDot, tok.range)
                    .fix(Fix::new("remove extra .").edit(TextEdit::removal(tok.range)))
                    .fix(
                        Fix::new("insert dummy attrpath")
                            .edit(TextEdit::insertion(tok.r_cur(), "\"dummy\"")),
                    ),
            );
        }

        let tok_or = self.peek_n(0).clone();
        if tok_or.kind != TokenKind::KwOr {
            let range = LexerCursorRange::new(begin, self.last_r_cur());
            return Some(self.alloc(Node::ExprSelect(ExprSelect {
                range,
                expr,
                path,
                default: None,
            })));
        }
        self.consume(); // or
        let default = self.parse_expr_select();
        if default.is_none() {
            let loc = self.last_r_cur();
            let idx = self.diag_null_expr(loc, "default");
            self.diags[idx]
                .fixes_mut()
                .push(Fix::new("remove `or` keyword").edit(TextEdit::removal(tok_or.range)));
        }
        let range = LexerCursorRange::new(begin, self.last_r_cur());
        Some(self.alloc(Node::ExprSelect(ExprSelect { range, expr, path, default })))
    }

    /// ```text
    /// expr_app : expr_app expr_select | expr_select
    /// ```
    pub(crate) fn parse_expr_app(&mut self) -> Option<NodeId> {
        let func = self.parse_expr_select()?;
        // If the head cannot evaluate to a lambda, stop consuming arguments.
        if !self.arena.get(func).kind().maybe_lambda() {
            return Some(func);
        }
        let mut args = Vec::new();
        while let Some(arg) = self.parse_expr_select() {
            args.push(arg);
        }
        if args.is_empty() {
            return Some(func);
        }
        let last = *args.last()?;
        let range =
            LexerCursorRange::new(self.arena.get(func).range().begin, self.arena.get(last).range().end);
        Some(self.alloc(Node::ExprCall(ExprCall { range, func, args })))
    }

    /// Top-level expression dispatch, with up to three tokens of lookahead
    /// to separate lambdas from attribute sets.
    pub(crate) fn parse_expr(&mut self) -> Option<NodeId> {
        match self.peek_kind() {
            TokenKind::Identifier => {
                if matches!(self.peek_n(1).kind, TokenKind::At | TokenKind::Colon) {
                    return self.parse_expr_lambda();
                }
            }
            TokenKind::LBrace => {
                if self.peek_n(1).kind == TokenKind::Identifier
                    && matches!(
                        self.peek_n(2).kind,
                        TokenKind::Colon
                            | TokenKind::At
                            | TokenKind::Question
                            | TokenKind::Comma
                            | TokenKind::Identifier
                            | TokenKind::Ellipsis
                            | TokenKind::RBrace
                    )
                {
                    return self.parse_expr_lambda();
                }
            }
            TokenKind::KwIf => return self.parse_expr_if(),
            TokenKind::KwAssert => return self.parse_expr_assert(),
            TokenKind::KwLet => {
                if self.peek_n(1).kind != TokenKind::LBrace {
                    return self.parse_expr_let();
                }
            }
            TokenKind::KwWith => return self.parse_expr_with(),
            _ => {}
        }
        self.parse_expr_op()
    }

    pub(crate) fn parse_expr_op(&mut self) -> Option<NodeId> {
        self.parse_expr_op_bp(0)
    }

    /// Pratt parser for binary and unary operators.
    fn parse_expr_op_bp(&mut self, left_rbp: u8) -> Option<NodeId> {
        let begin = self.l_cur();
        let mut prefix = match self.peek_kind() {
            kind @ (TokenKind::Not | TokenKind::Minus) => {
                let tok = self.consume();
                let op = self.alloc(Node::Op(nix_ast::Op { range: tok.range, op: kind }));
                let expr = self.parse_expr_op_bp(unary_bp(kind));
                if expr.is_none() {
                    let loc = self.last_r_cur();
                    self.diag_null_expr(loc, &format!("unary operator {}", kind.spelling()));
                }
                let range = LexerCursorRange::new(begin, self.last_r_cur());
                self.alloc(Node::ExprUnaryOp(ExprUnaryOp { range, op, expr }))
            }
            _ => self.parse_expr_app()?,
        };

        loop {
            let kind = self.peek_kind();
            if kind.is_binary_op() {
                // expr_op OP           expr_op   OP expr_op
                //            ^left_rbp           ^ lbp (we are here)
                let (lbp, rbp) = binary_bp(kind);
                if left_rbp > lbp {
                    return Some(prefix);
                }
                let tok = self.consume();
                let op = self.alloc(Node::Op(nix_ast::Op { range: tok.range, op: kind }));
                let rhs = match self.parse_expr_op_bp(rbp) {
                    Some(rhs) => rhs,
                    None => {
                        let loc = self.last_r_cur();
                        self.diag_null_expr(loc, "binary op RHS");
                        continue;
                    }
                };
                let range = LexerCursorRange::new(
                    self.arena.get(prefix).range().begin,
                    self.arena.get(rhs).range().end,
                );
                prefix =
                    self.alloc(Node::ExprBinOp(ExprBinOp { range, op, lhs: prefix, rhs }));
            } else if kind == TokenKind::Question {
                // expr_op '?' attrpath
                let tok = self.consume();
                let op = self.alloc(Node::Op(nix_ast::Op { range: tok.range, op: kind }));
                let path = self.parse_attr_path();
                if path.is_none() {
                    self.diags.push(
                        Diagnostic::new(DiagnosticKind::SelectExtraDot, tok.range)
                            .fix(Fix::new("insert dummy attrpath")
                                .edit(TextEdit::insertion(tok.r_cur(), "\"dummy\""))),
                    );
                }
                let range = LexerCursorRange::new(
                    self.arena.get(prefix).range().begin,
                    self.last_r_cur(),
                );
                prefix = self.alloc(Node::ExprOpHasAttr(ExprOpHasAttr {
                    range,
                    op,
                    expr: prefix,
                    path,
                }));
            } else {
                return Some(prefix);
            }
        }
    }

    /// ```text
    /// expr_if : 'if' expr 'then' expr 'else' expr
    /// ```
    fn parse_expr_if(&mut self) -> Option<NodeId> {
        let tok_if = self.peek_n(0).clone();
        debug_assert_eq!(tok_if.kind, TokenKind::KwIf);
        let begin = tok_if.l_cur();
        self.consume(); // if

        self.with_sync(&[TokenKind::KwThen, TokenKind::KwElse], |p| {
            let cond = p.parse_expr();
            if cond.is_none() {
                let loc = p.last_r_cur();
                let idx = p.diag_null_expr(loc, "condition");
                p.diags[idx]
                    .fixes_mut()
                    .push(Fix::new("remove `if` keyword").edit(TextEdit::removal(tok_if.range)));
                p.diags[idx].fixes_mut().push(
                    Fix::new("insert dummy condition")
                        .edit(TextEdit::insertion(tok_if.r_cur(), "true")),
                );
                if p.peek_kind() != TokenKind::KwThen {
                    let range = LexerCursorRange::new(begin, p.last_r_cur());
                    return Some(p.alloc(Node::ExprIf(ExprIf {
                        range,
                        cond,
                        then: None,
                        else_: None,
                    })));
                }
            }

            match p.expect(TokenKind::KwThen) {
                ExpectResult::Ok(_) => {
                    p.consume(); // then
                }
                ExpectResult::Missing(idx) => {
                    p.diags[idx].notes_mut().push(
                        Note::new(NoteKind::ToMatchThis, tok_if.range)
                            .arg(TokenKind::KwIf.spelling()),
                    );
                    let range = LexerCursorRange::new(begin, p.last_r_cur());
                    return Some(p.alloc(Node::ExprIf(ExprIf {
                        range,
                        cond,
                        then: None,
                        else_: None,
                    })));
                }
            }

            let then = p.parse_expr();
            if then.is_none() {
                let loc = p.last_r_cur();
                let idx = p.diag_null_expr(loc, "then");
                p.diags[idx].notes_mut().push(
                    Note::new(NoteKind::ToMatchThis, tok_if.range)
                        .arg(TokenKind::KwIf.spelling()),
                );
                if p.peek_kind() != TokenKind::KwElse {
                    let range = LexerCursorRange::new(begin, p.last_r_cur());
                    return Some(p.alloc(Node::ExprIf(ExprIf {
                        range,
                        cond,
                        then,
                        else_: None,
                    })));
                }
            }

            match p.expect(TokenKind::KwElse) {
                ExpectResult::Ok(_) => {
                    p.consume(); // else
                }
                ExpectResult::Missing(_) => {
                    let range = LexerCursorRange::new(begin, p.last_r_cur());
                    return Some(p.alloc(Node::ExprIf(ExprIf {
                        range,
                        cond,
                        then,
                        else_: None,
                    })));
                }
            }

            let else_ = p.parse_expr();
            if else_.is_none() {
                let loc = p.last_r_cur();
                let idx = p.diag_null_expr(loc, "else");
                p.diags[idx].notes_mut().push(
                    Note::new(NoteKind::ToMatchThis, tok_if.range)
                        .arg(TokenKind::KwIf.spelling()),
                );
            }
            let range = LexerCursorRange::new(begin, p.last_r_cur());
            Some(p.alloc(Node::ExprIf(ExprIf { range, cond, then, else_ })))
        })
    }

    /// ```text
    /// expr_assert : 'assert' expr ';' expr
    /// ```
    fn parse_expr_assert(&mut self) -> Option<NodeId> {
        let tok_assert = self.peek_n(0).clone();
        debug_assert_eq!(tok_assert.kind, TokenKind::KwAssert);
        let begin = tok_assert.l_cur();
        self.consume(); // assert

        self.with_sync(&[TokenKind::Semicolon], |p| {
            let cond = p.parse_expr();
            if cond.is_none() {
                let loc = p.last_r_cur();
                let idx = p.diag_null_expr(loc, "condition");
                p.diags[idx].fixes_mut().push(
                    Fix::new("remove `assert` keyword")
                        .edit(TextEdit::removal(tok_assert.range)),
                );
            }

            match p.expect(TokenKind::Semicolon) {
                ExpectResult::Ok(_) => {
                    p.consume(); // ;
                }
                ExpectResult::Missing(idx) => {
                    p.diags[idx].notes_mut().push(
                        Note::new(NoteKind::ToMatchThis, tok_assert.range)
                            .arg(TokenKind::KwAssert.spelling()),
                    );
                    let range = LexerCursorRange::new(begin, p.last_r_cur());
                    return Some(p.alloc(Node::ExprAssert(ExprAssert {
                        range,
                        cond,
                        value: None,
                    })));
                }
            }

            let value = p.parse_expr();
            if value.is_none() {
                let loc = p.last_r_cur();
                p.diag_null_expr(loc, "assert value");
            }
            let range = LexerCursorRange::new(begin, p.last_r_cur());
            Some(p.alloc(Node::ExprAssert(ExprAssert { range, cond, value })))
        })
    }

    /// ```text
    /// expr_let : 'let' binds 'in' expr
    /// ```
    fn parse_expr_let(&mut self) -> Option<NodeId> {
        let tok_let = self.peek_n(0).clone();
        debug_assert_eq!(tok_let.kind, TokenKind::KwLet);
        let begin = tok_let.l_cur();
        let kw_let = self.alloc(Node::Misc(Misc { range: tok_let.range }));
        self.consume(); // let

        self.with_sync(&[TokenKind::KwIn], |p| {
            let binds = p.parse_binds();

            let kw_in = match p.expect(TokenKind::KwIn) {
                ExpectResult::Ok(tok) => {
                    let kw_in = p.alloc(Node::Misc(Misc { range: tok.range }));
                    p.consume(); // in
                    Some(kw_in)
                }
                ExpectResult::Missing(_) => None,
            };

            let expr = if kw_in.is_some() {
                let expr = p.parse_expr();
                if expr.is_none() {
                    let loc = p.last_r_cur();
                    p.diag_null_expr(loc, "let ... in");
                }
                expr
            } else {
                None
            };

            let range = LexerCursorRange::new(begin, p.last_r_cur());
            let let_id = p.alloc(Node::ExprLet(ExprLet { range, kw_let, binds, kw_in, expr }));
            // Let-bindings lower like a recursive attribute set.
            p.sema.insert(let_id, SemaAttrs::new(true));
            if let Some(binds) = binds {
                p.lower_binds(let_id, binds);
            }
            Some(let_id)
        })
    }

    /// ```text
    /// expr_with : 'with' expr ';' expr
    /// ```
    fn parse_expr_with(&mut self) -> Option<NodeId> {
        let tok_with = self.peek_n(0).clone();
        debug_assert_eq!(tok_with.kind, TokenKind::KwWith);
        let begin = tok_with.l_cur();
        let kw_with = self.alloc(Node::Misc(Misc { range: tok_with.range }));
        self.consume(); // with

        self.with_sync(&[TokenKind::Semicolon], |p| {
            let with = p.parse_expr();
            if with.is_none() {
                let loc = p.last_r_cur();
                p.diag_null_expr(loc, "with expression");
            }

            let tok_semi = match p.expect(TokenKind::Semicolon) {
                ExpectResult::Ok(tok) => {
                    let semi = p.alloc(Node::Misc(Misc { range: tok.range }));
                    p.consume(); // ;
                    Some(semi)
                }
                ExpectResult::Missing(idx) => {
                    p.diags[idx].notes_mut().push(
                        Note::new(NoteKind::ToMatchThis, tok_with.range)
                            .arg(TokenKind::KwWith.spelling()),
                    );
                    let range = LexerCursorRange::new(begin, p.last_r_cur());
                    return Some(p.alloc(Node::ExprWith(ExprWith {
                        range,
                        kw_with,
                        with,
                        tok_semi: None,
                        expr: None,
                    })));
                }
            };

            let expr = p.parse_expr();
            if expr.is_none() {
                let loc = p.last_r_cur();
                p.diag_null_expr(loc, "with body");
            }
            let range = LexerCursorRange::new(begin, p.last_r_cur());
            Some(p.alloc(Node::ExprWith(ExprWith { range, kw_with, with, tok_semi, expr })))
        })
    }
}
