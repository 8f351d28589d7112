//! Core parser state: lookahead, sub-lexer modes, sync tokens and the
//! `expect` recovery protocol.

use std::collections::VecDeque;

use nix_ast::{Node, NodeArena, NodeId, SemaMap};
use nix_diagnostics::{Diagnostic, DiagnosticKind, DiagnosticTag, Fix};
use nix_lexer::Lexer;
use nix_position_tracking::{LexerCursor, LexerCursorRange, TextEdit};
use nix_token::{Comment, Token, TokenKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ParseResult;

/// Which sub-lexer feeds the lookahead buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Expr,
    String,
    IndString,
    Path,
}

/// Outcome of [`Parser::expect`].
///
/// `Missing` carries the index of the `expected` diagnostic that was pushed,
/// so the caller can attach a "to match this" note. Recovery is a value, not
/// control flow.
pub enum ExpectResult {
    Ok(Token),
    Missing(usize),
}

impl ExpectResult {
    pub fn ok(&self) -> Option<&Token> {
        match self {
            ExpectResult::Ok(tok) => Some(tok),
            ExpectResult::Missing(_) => None,
        }
    }
}

pub struct Parser<'src, 'diag> {
    pub(crate) src: &'src str,
    lexer: Lexer<'src>,
    pub(crate) diags: &'diag mut Vec<Diagnostic>,
    look_ahead: VecDeque<Token>,
    pub(crate) last_token: Option<Token>,
    states: Vec<ParserState>,
    /// Multiset of token kinds bounding `unexpected-text` regions.
    sync_tokens: FxHashMap<TokenKind, u32>,
    pub(crate) arena: NodeArena,
    pub(crate) sema: SemaMap,
    comments: Vec<Comment>,
    seen_comments: FxHashSet<usize>,
}

impl<'src, 'diag> Parser<'src, 'diag> {
    pub fn new(src: &'src str, diags: &'diag mut Vec<Diagnostic>) -> Self {
        Parser {
            src,
            lexer: Lexer::new(src),
            diags,
            look_ahead: VecDeque::new(),
            last_token: None,
            states: vec![ParserState::Expr],
            sync_tokens: FxHashMap::default(),
            arena: NodeArena::new(),
            sema: SemaMap::default(),
            comments: Vec::new(),
            seen_comments: FxHashSet::default(),
        }
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.arena.alloc(node)
    }

    // ===== Lookahead & modes =====

    /// Peek the `n`-th unconsumed token, lexing in the current mode.
    pub(crate) fn peek_n(&mut self, n: usize) -> &Token {
        while n >= self.look_ahead.len() {
            let tok = match self.states.last().copied().unwrap_or(ParserState::Expr) {
                ParserState::Expr => self.lexer.lex(self.diags),
                ParserState::String => self.lexer.lex_string(self.diags),
                ParserState::IndString => self.lexer.lex_ind_string(self.diags),
                ParserState::Path => self.lexer.lex_path(self.diags),
            };
            self.harvest_comments(&tok);
            self.look_ahead.push_back(tok);
        }
        &self.look_ahead[n]
    }

    pub(crate) fn peek_kind(&mut self) -> TokenKind {
        self.peek_n(0).kind
    }

    /// Cursor of the next unconsumed token.
    pub(crate) fn l_cur(&mut self) -> LexerCursor {
        self.peek_n(0).l_cur()
    }

    /// End cursor of the last consumed token. Falls back to the next token's
    /// begin when nothing was consumed yet.
    pub(crate) fn last_r_cur(&mut self) -> LexerCursor {
        match &self.last_token {
            Some(tok) => tok.r_cur(),
            None => self.l_cur(),
        }
    }

    pub(crate) fn consume(&mut self) -> Token {
        if self.look_ahead.is_empty() {
            self.peek_n(0);
        }
        let tok = match self.look_ahead.pop_front() {
            Some(tok) => tok,
            // peek_n(0) always fills the buffer; Eof repeats forever.
            None => Token::new(TokenKind::Eof, LexerCursorRange::empty(self.lexer.cur())),
        };
        self.last_token = Some(tok.clone());
        tok
    }

    /// Flush the lookahead buffer and rewind the lexer to the start of the
    /// first unconsumed token, so a new mode re-lexes those bytes.
    fn reset_look_ahead(&mut self) {
        if let Some(front) = self.look_ahead.front() {
            self.lexer.set_cur(front.l_cur());
            self.look_ahead.clear();
        }
    }

    /// Run `f` with a sub-lexer mode pushed for its dynamic extent.
    pub(crate) fn with_state<T>(
        &mut self,
        state: ParserState,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.reset_look_ahead();
        self.states.push(state);
        let result = f(self);
        self.reset_look_ahead();
        self.states.pop();
        result
    }

    /// Run `f` with extra sync tokens registered for its dynamic extent.
    pub(crate) fn with_sync<T>(
        &mut self,
        kinds: &[TokenKind],
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        for kind in kinds {
            *self.sync_tokens.entry(*kind).or_insert(0) += 1;
        }
        let result = f(self);
        for kind in kinds {
            if let Some(count) = self.sync_tokens.get_mut(kind) {
                *count -= 1;
                if *count == 0 {
                    self.sync_tokens.remove(kind);
                }
            }
        }
        result
    }

    fn is_sync(&self, kind: TokenKind) -> bool {
        self.sync_tokens.contains_key(&kind)
    }

    // ===== Recovery =====

    /// Consume tokens until the next sync token. Returns the consumed range,
    /// or `None` if nothing was consumed.
    fn consume_as_unknown(&mut self) -> Option<LexerCursorRange> {
        let begin = self.l_cur();
        let mut consumed = false;
        loop {
            let kind = self.peek_kind();
            if kind == TokenKind::Eof || self.is_sync(kind) {
                break;
            }
            self.consume();
            consumed = true;
        }
        consumed.then(|| LexerCursorRange::new(begin, self.last_r_cur()))
    }

    /// Discard unexpected text in front of the cursor, reporting it as a
    /// removable `unexpected-text` region.
    pub(crate) fn remove_unexpected(&mut self) -> bool {
        if let Some(range) = self.consume_as_unknown() {
            self.diags.push(
                Diagnostic::new(DiagnosticKind::UnexpectedText, range)
                    .fix(Fix::new("remove unexpected text").edit(TextEdit::removal(range)))
                    .tag(DiagnosticTag::Striked),
            );
            true
        } else {
            false
        }
    }

    /// Expect the next token to be `kind`.
    ///
    /// On mismatch, first try to skip an unexpected-text region and retry;
    /// if the token is still missing, emit `expected` with an insertion
    /// fix-it and return [`ExpectResult::Missing`] without consuming.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> ExpectResult {
        self.with_sync(&[kind], |p| {
            if p.peek_kind() == kind {
                return ExpectResult::Ok(p.peek_n(0).clone());
            }
            if p.remove_unexpected() && p.peek_kind() == kind {
                return ExpectResult::Ok(p.peek_n(0).clone());
            }
            let insert = p.last_r_cur();
            p.diags.push(
                Diagnostic::new(DiagnosticKind::Expected, LexerCursorRange::empty(insert))
                    .arg(kind.spelling())
                    .fix(
                        Fix::new(format!("insert {}", kind.spelling()))
                            .edit(TextEdit::insertion(insert, kind.spelling())),
                    ),
            );
            ExpectResult::Missing(p.diags.len() - 1)
        })
    }

    /// `expected <what> expression` with a dummy-insertion fix. Returns the
    /// diagnostic index for note attachment.
    pub(crate) fn diag_null_expr(&mut self, loc: LexerCursor, what: &str) -> usize {
        self.diags.push(
            Diagnostic::new(DiagnosticKind::Expected, LexerCursorRange::empty(loc))
                .arg(format!("{what} expression"))
                .fix(Fix::new("insert dummy expression").edit(TextEdit::insertion(loc, " expr"))),
        );
        self.diags.len() - 1
    }

    // ===== Comments =====

    fn harvest_comments(&mut self, tok: &Token) {
        for piece in &tok.leading {
            if piece.is_comment() && self.seen_comments.insert(piece.range.begin.offset) {
                self.comments.push(Comment { kind: piece.kind, range: piece.range });
            }
        }
    }

    /// Report anything after the root expression.
    pub(crate) fn consume_trailing(&mut self) {
        if self.peek_kind() != TokenKind::Eof {
            self.remove_unexpected();
        }
    }

    pub(crate) fn finish(mut self, root: Option<NodeId>) -> ParseResult {
        // Make sure trailing trivia (e.g. a comment after the expression) is
        // collected even when the Eof token was never peeked.
        let _ = self.peek_n(0);
        self.comments.sort_by_key(|c| c.range.begin.offset);
        ParseResult { arena: self.arena, root, sema: self.sema, comments: self.comments }
    }
}
