//! Parsing of interpolations, strings, indented strings and paths.
//!
//! These productions drive the sub-lexer modes: the opening token is lexed
//! in expression mode, then the parser pushes the matching mode, and the
//! closer pops it again.

use nix_ast::{
    ExprPath, ExprString, Interpolation, InterpolablePart, InterpolatedParts, Node, NodeId,
};
use nix_diagnostics::{Note, NoteKind};
use nix_position_tracking::LexerCursorRange;
use nix_token::TokenKind;

use crate::parser::{ExpectResult, Parser, ParserState};

/// Cook one escape token into its literal value.
///
/// `\n`/`\r`/`\t` map to control characters, any other escaped character maps
/// to itself. Indented-string escapes `''$`, `'''` and `''\x` unwrap to `$`,
/// `''` and the cooked `x`.
fn cook_escape(text: &str) -> String {
    if let Some(rest) = text.strip_prefix("''") {
        return match rest {
            "$" => "$".to_string(),
            "'" => "''".to_string(),
            _ => rest.strip_prefix('\\').map_or_else(|| rest.to_string(), cook_simple_escape),
        };
    }
    text.strip_prefix('\\').map_or_else(|| text.to_string(), cook_simple_escape)
}

fn cook_simple_escape(ch: &str) -> String {
    match ch {
        "n" => "\n".to_string(),
        "r" => "\r".to_string(),
        "t" => "\t".to_string(),
        other => other.to_string(),
    }
}

impl Parser<'_, '_> {
    /// ```text
    /// interpolation : "${" expr "}"
    /// ```
    pub(crate) fn parse_interpolation(&mut self) -> NodeId {
        let tok_dollar_curly = self.peek_n(0).clone();
        debug_assert_eq!(tok_dollar_curly.kind, TokenKind::DollarCurly);
        self.consume(); // ${
        self.with_sync(&[TokenKind::RBrace], |p| {
            p.with_state(ParserState::Expr, |p| {
                let expr = p.parse_expr();
                if expr.is_none() {
                    let loc = p.last_r_cur();
                    p.diag_null_expr(loc, "interpolation");
                }
                match p.expect(TokenKind::RBrace) {
                    ExpectResult::Ok(_) => {
                        p.consume(); // }
                    }
                    ExpectResult::Missing(idx) => {
                        p.diags[idx].notes_mut().push(
                            Note::new(NoteKind::ToMatchThis, tok_dollar_curly.range)
                                .arg(TokenKind::DollarCurly.spelling()),
                        );
                    }
                }
                let range = LexerCursorRange::new(tok_dollar_curly.l_cur(), p.last_r_cur());
                p.alloc(Node::Interpolation(Interpolation { range, expr }))
            })
        })
    }

    /// ```text
    /// path : path_fragment (path_fragment | interpolation)* path_end
    /// ```
    ///
    /// The first fragment is lexed in expression mode; the rest comes from
    /// the path sub-lexer. The `path_end` marker is dropped together with
    /// the mode switch.
    pub(crate) fn parse_expr_path(&mut self) -> NodeId {
        let begin = self.peek_n(0).l_cur();
        debug_assert_eq!(self.peek_kind(), TokenKind::PathFragment);
        let (fragments, end) = self.with_state(ParserState::Path, |p| {
            let mut fragments: Vec<InterpolablePart> = Vec::new();
            let mut pending = String::new();
            loop {
                match p.peek_kind() {
                    TokenKind::PathFragment => {
                        let tok = p.consume();
                        pending.push_str(tok.view(p.src));
                    }
                    TokenKind::DollarCurly => {
                        if !pending.is_empty() {
                            fragments.push(InterpolablePart::Literal(std::mem::take(&mut pending)));
                        }
                        let interp = p.parse_interpolation();
                        fragments.push(InterpolablePart::Interpolation(interp));
                    }
                    _ => break,
                }
            }
            if !pending.is_empty() {
                fragments.push(InterpolablePart::Literal(pending));
            }
            (fragments, p.last_r_cur())
        });
        let range = LexerCursorRange::new(begin, end);
        let parts = self.alloc(Node::InterpolatedParts(InterpolatedParts { range, fragments }));
        self.alloc(Node::ExprPath(ExprPath { range, parts }))
    }

    /// ```text
    /// string_part : interpolation | STRING_PART | STRING_ESCAPE
    /// ```
    ///
    /// Adjacent literal parts and escapes are merged into a single cooked
    /// fragment, so a string is "literal" iff it contains no interpolation.
    fn parse_string_parts(&mut self) -> NodeId {
        let begin = self.peek_n(0).l_cur();
        let mut fragments: Vec<InterpolablePart> = Vec::new();
        let mut pending = String::new();
        loop {
            match self.peek_kind() {
                TokenKind::StringPart => {
                    let tok = self.consume();
                    pending.push_str(tok.view(self.src));
                }
                TokenKind::StringEscape => {
                    let tok = self.consume();
                    pending.push_str(&cook_escape(tok.view(self.src)));
                }
                TokenKind::DollarCurly => {
                    if !pending.is_empty() {
                        fragments.push(InterpolablePart::Literal(std::mem::take(&mut pending)));
                    }
                    let interp = self.parse_interpolation();
                    fragments.push(InterpolablePart::Interpolation(interp));
                }
                _ => break,
            }
        }
        if !pending.is_empty() {
            fragments.push(InterpolablePart::Literal(pending));
        }
        let range = LexerCursorRange::new(begin, self.last_r_cur());
        self.alloc(Node::InterpolatedParts(InterpolatedParts { range, fragments }))
    }

    /// ```text
    /// string : '"' string_part* '"'
    ///        | "''" string_part* "''"
    /// ```
    pub(crate) fn parse_string(&mut self, is_indented: bool) -> NodeId {
        let quote = self.peek_n(0).clone();
        let quote_kind = if is_indented { TokenKind::Quote2 } else { TokenKind::DQuote };
        debug_assert_eq!(quote.kind, quote_kind);
        self.consume();
        self.with_sync(&[quote_kind], |p| {
            let state = if is_indented { ParserState::IndString } else { ParserState::String };
            p.with_state(state, |p| {
                let parts = p.parse_string_parts();
                let range = match p.expect(quote_kind) {
                    ExpectResult::Ok(tok) => {
                        let end = tok.r_cur();
                        p.consume();
                        LexerCursorRange::new(quote.l_cur(), end)
                    }
                    ExpectResult::Missing(idx) => {
                        p.diags[idx].notes_mut().push(
                            Note::new(NoteKind::ToMatchThis, quote.range)
                                .arg(quote_kind.spelling()),
                        );
                        LexerCursorRange::new(quote.l_cur(), p.arena.get(parts).range().end)
                    }
                };
                p.alloc(Node::ExprString(ExprString { range, parts }))
            })
        })
    }
}
