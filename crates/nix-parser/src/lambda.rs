//! Lambdas: formals, lambda arguments, lambda expressions.

use nix_ast::{ExprLambda, Formal, Identifier, Misc, Node, NodeId};
use nix_diagnostics::{Diagnostic, DiagnosticKind, Fix};
use nix_position_tracking::{LexerCursorRange, TextEdit};
use nix_token::TokenKind;

use crate::parser::{ExpectResult, Parser};

impl Parser<'_, '_> {
    /// ```text
    /// formal : ,? ID
    ///        | ,? ID '?' expr
    ///        | ,? ...
    /// ```
    pub(crate) fn parse_formal(&mut self) -> Option<NodeId> {
        let begin = self.l_cur();
        let mut comma = None;
        if self.peek_kind() == TokenKind::Comma {
            let tok = self.consume();
            comma = Some(self.alloc(Node::Misc(Misc { range: tok.range })));
        }
        if self.peek_kind() == TokenKind::Identifier {
            let tok = self.consume();
            let name = tok.view(self.src).to_string();
            let id = self.alloc(Node::Identifier(Identifier { range: tok.range, name }));
            if self.peek_kind() != TokenKind::Question {
                let range = LexerCursorRange::new(begin, self.last_r_cur());
                return Some(self.alloc(Node::Formal(Formal {
                    range,
                    comma,
                    id: Some(id),
                    default: None,
                    ellipsis: None,
                })));
            }
            self.consume(); // ?
            let default = self.parse_expr();
            if default.is_none() {
                let loc = self.last_r_cur();
                self.diag_null_expr(loc, "default value");
            }
            let range = LexerCursorRange::new(begin, self.last_r_cur());
            return Some(self.alloc(Node::Formal(Formal {
                range,
                comma,
                id: Some(id),
                default,
                ellipsis: None,
            })));
        }
        if self.peek_kind() == TokenKind::Ellipsis {
            let tok = self.consume();
            let ellipsis = Some(self.alloc(Node::Misc(Misc { range: tok.range })));
            let range = LexerCursorRange::new(begin, self.last_r_cur());
            return Some(self.alloc(Node::Formal(Formal {
                range,
                comma,
                id: None,
                default: None,
                ellipsis,
            })));
        }
        if comma.is_some() {
            // A stray comma is an (empty) formal of its own; lowering will
            // report it.
            let range = LexerCursorRange::new(begin, self.last_r_cur());
            return Some(self.alloc(Node::Formal(Formal {
                range,
                comma,
                id: None,
                default: None,
                ellipsis: None,
            })));
        }
        None
    }

    /// ```text
    /// formals : '{' formal* '}'
    /// ```
    pub(crate) fn parse_formals(&mut self) -> Option<NodeId> {
        let l_curly = match self.expect(TokenKind::LBrace) {
            ExpectResult::Ok(tok) => tok,
            ExpectResult::Missing(_) => return None,
        };
        self.consume(); // {
        let begin = l_curly.l_cur();
        let sync = [
            TokenKind::RBrace,
            TokenKind::Comma,
            TokenKind::Question,
            TokenKind::Identifier,
        ];
        Some(self.with_sync(&sync, |p| {
            let mut members = Vec::new();
            loop {
                if p.peek_kind() == TokenKind::RBrace {
                    break;
                }
                if let Some(formal) = p.parse_formal() {
                    members.push(formal);
                    continue;
                }
                if p.remove_unexpected() {
                    continue;
                }
                break;
            }
            match p.expect(TokenKind::RBrace) {
                ExpectResult::Ok(_) => {
                    p.consume();
                }
                ExpectResult::Missing(idx) => {
                    p.diags[idx].notes_mut().push(
                        nix_diagnostics::Note::new(
                            nix_diagnostics::NoteKind::ToMatchThis,
                            l_curly.range,
                        )
                        .arg(TokenKind::LBrace.spelling()),
                    );
                }
            }
            let range = LexerCursorRange::new(begin, p.last_r_cur());
            p.on_formals(range, members)
        }))
    }

    /// ```text
    /// lambda_arg : ID
    ///            | ID '@' '{' formals '}'
    ///            | '{' formals '}'
    ///            | '{' formals '}' '@' ID
    /// ```
    pub(crate) fn parse_lambda_arg(&mut self) -> Option<NodeId> {
        let begin = self.l_cur();
        if self.peek_kind() == TokenKind::Identifier {
            let tok_id = self.consume();
            let name = tok_id.view(self.src).to_string();
            let id = self.alloc(Node::Identifier(Identifier { range: tok_id.range, name }));
            if self.peek_kind() != TokenKind::At {
                let range = LexerCursorRange::new(begin, self.last_r_cur());
                return Some(self.on_lambda_arg(range, Some(id), None));
            }
            let tok_at = self.consume(); // @
            let formals = self.parse_formals();
            if formals.is_none() {
                // Extra "@", consider removing it.
                self.diags.push(
                    Diagnostic::new(DiagnosticKind::LambdaArgExtraAt, tok_at.range)
                        .fix(Fix::new("remove extra @").edit(TextEdit::removal(tok_at.range)))
                        .fix(
                            Fix::new("insert dummy formals")
                                .edit(TextEdit::insertion(tok_at.r_cur(), "{}")),
                        ),
                );
            }
            let range = LexerCursorRange::new(begin, self.last_r_cur());
            return Some(self.on_lambda_arg(range, Some(id), formals));
        }

        let formals = self.parse_formals()?;
        if self.peek_kind() != TokenKind::At {
            let range = LexerCursorRange::new(begin, self.last_r_cur());
            return Some(self.on_lambda_arg(range, None, Some(formals)));
        }
        let tok_at = self.peek_n(0).clone();
        self.consume(); // @
        let id = match self.expect(TokenKind::Identifier) {
            ExpectResult::Ok(tok) => {
                self.consume();
                let name = tok.view(self.src).to_string();
                Some(self.alloc(Node::Identifier(Identifier { range: tok.range, name })))
            }
            ExpectResult::Missing(idx) => {
                self.diags[idx].notes_mut().push(
                    nix_diagnostics::Note::new(
                        nix_diagnostics::NoteKind::ToMatchThis,
                        tok_at.range,
                    )
                    .arg(TokenKind::At.spelling()),
                );
                None
            }
        };
        let range = LexerCursorRange::new(begin, self.last_r_cur());
        Some(self.on_lambda_arg(range, id, Some(formals)))
    }

    /// ```text
    /// expr_lambda : lambda_arg ':' expr
    /// ```
    pub(crate) fn parse_expr_lambda(&mut self) -> Option<NodeId> {
        let begin = self.l_cur();
        let arg = self.parse_lambda_arg()?;
        if let ExpectResult::Ok(_) = self.expect(TokenKind::Colon) {
            self.consume();
        }
        let body = self.parse_expr();
        if body.is_none() {
            let loc = self.last_r_cur();
            self.diag_null_expr(loc, "lambda body");
        }
        let range = LexerCursorRange::new(begin, self.last_r_cur());
        Some(self.alloc(Node::ExprLambda(ExprLambda { range, arg: Some(arg), body })))
    }
}
