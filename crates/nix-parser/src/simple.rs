//! Simple expressions: literals, variables, parens and lists.

use nix_ast::{
    ExprFloat, ExprInt, ExprList, ExprParen, ExprSPath, ExprString, ExprVar, Identifier,
    InterpolablePart, InterpolatedParts, Misc, Node, NodeId, NodeKind,
};
use nix_diagnostics::{Diagnostic, DiagnosticKind, DiagnosticTag, Fix, Note, NoteKind};
use nix_position_tracking::{LexerCursorRange, TextEdit};
use nix_token::TokenKind;

use crate::parser::{ExpectResult, Parser};

/// Whether the node could be produced by the `expr_simple` non-terminal,
/// i.e. parenthesizing it is redundant.
fn may_produced_by_simple(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ExprVar
            | NodeKind::ExprInt
            | NodeKind::ExprFloat
            | NodeKind::ExprSPath
            | NodeKind::ExprString
            | NodeKind::ExprPath
            | NodeKind::ExprParen
            | NodeKind::ExprAttrs
            | NodeKind::ExprList
    )
}

impl Parser<'_, '_> {
    /// ```text
    /// '(' expr ')'
    /// ```
    pub(crate) fn parse_expr_paren(&mut self) -> NodeId {
        let l = self.peek_n(0).clone();
        debug_assert_eq!(l.kind, TokenKind::LParen);
        let l_paren = self.alloc(Node::Misc(Misc { range: l.range }));
        self.consume(); // (
        self.with_sync(&[TokenKind::RParen], |p| {
            let expr = p.parse_expr();
            if expr.is_none() {
                let loc = p.last_r_cur();
                p.diag_null_expr(loc, "parenthesized");
            }
            let inner_simple =
                expr.is_some_and(|e| may_produced_by_simple(p.arena.get(e).kind()));
            match p.expect(TokenKind::RParen) {
                ExpectResult::Ok(tok) => {
                    let end = tok.r_cur();
                    p.consume(); // )
                    let r_paren = p.alloc(Node::Misc(Misc { range: tok.range }));
                    if inner_simple {
                        p.diags.push(
                            Diagnostic::new(DiagnosticKind::RedundantParen, l.range)
                                .tag(DiagnosticTag::Faded)
                                .fix(
                                    Fix::new("remove ( and )")
                                        .edit(TextEdit::removal(l.range))
                                        .edit(TextEdit::removal(tok.range)),
                                ),
                        );
                    }
                    p.alloc(Node::ExprParen(ExprParen {
                        range: LexerCursorRange::new(l.l_cur(), end),
                        expr,
                        l_paren,
                        r_paren: Some(r_paren),
                    }))
                }
                ExpectResult::Missing(idx) => {
                    p.diags[idx].notes_mut().push(
                        Note::new(NoteKind::ToMatchThis, l.range)
                            .arg(TokenKind::LParen.spelling()),
                    );
                    if inner_simple {
                        p.diags.push(
                            Diagnostic::new(DiagnosticKind::RedundantParen, l.range)
                                .tag(DiagnosticTag::Faded)
                                .fix(Fix::new("remove (").edit(TextEdit::removal(l.range))),
                        );
                    }
                    let range = LexerCursorRange::new(l.l_cur(), p.last_r_cur());
                    p.alloc(Node::ExprParen(ExprParen { range, expr, l_paren, r_paren: None }))
                }
            }
        })
    }

    /// ```text
    /// expr_list : '[' expr_select* ']'
    /// ```
    pub(crate) fn parse_expr_list(&mut self) -> Option<NodeId> {
        let tok = self.peek_n(0).clone();
        if tok.kind != TokenKind::LBracket {
            return None;
        }
        self.consume(); // [
        Some(self.with_sync(&[TokenKind::RBracket], |p| {
            let mut elements = Vec::new();
            loop {
                if p.peek_kind() == TokenKind::RBracket {
                    break;
                }
                match p.parse_expr_select() {
                    Some(e) => elements.push(e),
                    None => break,
                }
            }
            match p.expect(TokenKind::RBracket) {
                ExpectResult::Ok(_) => {
                    p.consume();
                }
                ExpectResult::Missing(idx) => {
                    p.diags[idx].notes_mut().push(
                        Note::new(NoteKind::ToMatchThis, tok.range)
                            .arg(TokenKind::LBracket.spelling()),
                    );
                }
            }
            let range = LexerCursorRange::new(tok.l_cur(), p.last_r_cur());
            p.alloc(Node::ExprList(ExprList { range, elements }))
        }))
    }

    /// ```text
    /// expr_simple : INT | FLOAT | ID | string | indented_string | path
    ///             | spath | uri | '(' expr ')' | attrset_expr | list
    /// ```
    pub(crate) fn parse_expr_simple(&mut self) -> Option<NodeId> {
        let tok = self.peek_n(0).clone();
        match tok.kind {
            TokenKind::Identifier => {
                self.consume();
                let name = tok.view(self.src).to_string();
                let id = self.alloc(Node::Identifier(Identifier { range: tok.range, name }));
                Some(self.alloc(Node::ExprVar(ExprVar { range: tok.range, id })))
            }
            TokenKind::Int => {
                self.consume();
                let value = match tok.view(self.src).parse::<i64>() {
                    Ok(v) => v,
                    Err(_) => {
                        self.diags
                            .push(Diagnostic::new(DiagnosticKind::IntTooBig, tok.range));
                        0
                    }
                };
                Some(self.alloc(Node::ExprInt(ExprInt { range: tok.range, value })))
            }
            TokenKind::Float => {
                self.consume();
                let value = tok.view(self.src).parse::<f64>().unwrap_or(0.0);
                Some(self.alloc(Node::ExprFloat(ExprFloat { range: tok.range, value })))
            }
            TokenKind::SearchPath => {
                self.consume();
                let view = tok.view(self.src);
                let text = view[1..view.len() - 1].to_string();
                Some(self.alloc(Node::ExprSPath(ExprSPath { range: tok.range, text })))
            }
            TokenKind::Uri => {
                // URIs are sugar for literal strings.
                self.consume();
                let text = tok.view(self.src).to_string();
                let parts = self.alloc(Node::InterpolatedParts(InterpolatedParts {
                    range: tok.range,
                    fragments: vec![InterpolablePart::Literal(text)],
                }));
                Some(self.alloc(Node::ExprString(ExprString { range: tok.range, parts })))
            }
            TokenKind::DQuote => Some(self.parse_string(false)),
            TokenKind::Quote2 => Some(self.parse_string(true)),
            TokenKind::PathFragment => Some(self.parse_expr_path()),
            TokenKind::LParen => Some(self.parse_expr_paren()),
            TokenKind::KwRec | TokenKind::LBrace => Some(self.parse_expr_attrs()),
            TokenKind::LBracket => self.parse_expr_list(),
            _ => None,
        }
    }
}
