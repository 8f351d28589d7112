//! Context-aware Nix lexer with mode-based tokenization
//!
//! Nix literals are context-sensitive: strings, indented strings and paths
//! each have their own token alphabet, and interpolation (`${ ... }`) nests
//! expression lexing back inside them. Instead of one scanner with hidden
//! state, this lexer exposes one entry point per mode and leaves mode
//! selection to the parser:
//!
//! - [`Lexer::lex`] — expression mode
//! - [`Lexer::lex_string`] — between `"` delimiters
//! - [`Lexer::lex_ind_string`] — between `''` delimiters
//! - [`Lexer::lex_path`] — inside a path literal
//!
//! The parser may rewind the lexer with [`Lexer::set_cur`] to re-lex bytes
//! under a different mode; rewinding is only valid to a position at or before
//! the current one.
//!
//! Lexical errors never abort: they are reported as diagnostics with
//! recovered tokens (leading-zero floats), or as an explicit
//! [`TokenKind::Unknown`] range.

use nix_diagnostics::{Diagnostic, DiagnosticKind, Note, NoteKind};
use nix_position_tracking::{LexerCursor, LexerCursorRange};
use nix_token::{Token, TokenKind, TriviaKind, TriviaPiece};

mod classes;

use classes::{is_ident_continue, is_ident_start, is_path_char, is_uri_char, is_uri_scheme_char};

/// The stateful lexer. One instance scans one source buffer.
pub struct Lexer<'src> {
    src: &'src str,
    bytes: &'src [u8],
    cur: LexerCursor,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Lexer { src, bytes: src.as_bytes(), cur: LexerCursor::default() }
    }

    /// Current cursor.
    pub fn cur(&self) -> LexerCursor {
        self.cur
    }

    /// Reset the cursor. Only rewinding (or staying put) is valid; the parser
    /// uses this to abandon lookahead when switching sub-lexer modes.
    pub fn set_cur(&mut self, cur: LexerCursor) {
        debug_assert!(cur.offset <= self.cur.offset);
        debug_assert!(cur.offset <= self.src.len());
        self.cur = cur;
    }

    // ===== Cursor helpers =====

    fn eof(&self) -> bool {
        self.cur.offset >= self.bytes.len()
    }

    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.cur.offset + offset).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.cur.offset..].chars().next()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.src[self.cur.offset..].starts_with(prefix)
    }

    /// Advance over one character.
    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.cur.step(ch);
        }
    }

    /// Advance to a byte offset at or after the cursor. The offset must lie
    /// on a character boundary.
    fn advance_to(&mut self, offset: usize) {
        while self.cur.offset < offset {
            self.advance();
        }
    }

    /// Advance over `prefix` if the remaining input starts with it.
    fn consume_prefix(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            for ch in prefix.chars() {
                self.cur.step(ch);
            }
            true
        } else {
            false
        }
    }

    fn finish(&self, kind: TokenKind, start: LexerCursor) -> Token {
        Token::new(kind, LexerCursorRange::new(start, self.cur))
    }

    // ===== Trivia =====

    /// Consume whitespace and comments in front of a token. An unterminated
    /// block comment is recovered as trivia running to end of file, with a
    /// diagnostic pointing back at the opener.
    fn consume_trivia(&mut self, diags: &mut Vec<Diagnostic>) -> Vec<TriviaPiece> {
        let mut pieces = Vec::new();
        loop {
            let start = self.cur;
            match self.peek_byte(0) {
                Some(b) if b.is_ascii_whitespace() => {
                    while self.peek_byte(0).is_some_and(|b| b.is_ascii_whitespace()) {
                        self.advance();
                    }
                    pieces.push(TriviaPiece {
                        kind: TriviaKind::Whitespace,
                        range: LexerCursorRange::new(start, self.cur),
                    });
                }
                Some(b'#') => {
                    // Line comment, up to (and excluding) the newline.
                    let rest = &self.bytes[self.cur.offset..];
                    let end = memchr::memchr2(b'\n', b'\r', rest)
                        .map_or(self.bytes.len(), |i| self.cur.offset + i);
                    self.advance_to(end);
                    pieces.push(TriviaPiece {
                        kind: TriviaKind::LineComment,
                        range: LexerCursorRange::new(start, self.cur),
                    });
                }
                Some(b'/') if self.starts_with("/*") => {
                    let opener = LexerCursorRange::new(
                        start,
                        LexerCursor::at(start.line, start.column + 2, start.offset + 2),
                    );
                    self.consume_prefix("/*");
                    loop {
                        if self.eof() {
                            diags.push(
                                Diagnostic::new(
                                    DiagnosticKind::UnterminatedBComment,
                                    LexerCursorRange::empty(self.cur),
                                )
                                .note(Note::new(NoteKind::BCommentBegin, opener)),
                            );
                            break;
                        }
                        if self.consume_prefix("*/") {
                            break;
                        }
                        self.advance();
                    }
                    pieces.push(TriviaPiece {
                        kind: TriviaKind::BlockComment,
                        range: LexerCursorRange::new(start, self.cur),
                    });
                }
                _ => return pieces,
            }
        }
    }

    // ===== Numbers =====

    /// Accept `([eE][+-]?[0-9]+)?`. Returns false when an `e`/`E` is present
    /// without exponent digits.
    fn lex_float_exp(&mut self, diags: &mut Vec<Diagnostic>) -> bool {
        if let Some(e @ (b'e' | b'E')) = self.peek_byte(0) {
            let e_start = self.cur;
            self.advance();
            if matches!(self.peek_byte(0), Some(b'+' | b'-')) {
                self.advance();
            }
            if self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
                while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                diags.push(
                    Diagnostic::new(
                        DiagnosticKind::FloatNoExp,
                        LexerCursorRange::new(e_start, self.cur),
                    )
                    .arg((e as char).to_string()),
                );
                return false;
            }
        }
        true
    }

    /// Numbers. `[0-9]+` is an integer; `[0-9]*\.[0-9]*([eE][+-]?[0-9]+)?`
    /// is a float. Leading-zero floats (`00.33`) are accepted with a warning,
    /// never normalized.
    fn lex_numbers(&mut self, start: LexerCursor, diags: &mut Vec<Diagnostic>) -> TokenKind {
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let kind = if self.peek_byte(0) == Some(b'.') {
            self.advance();
            while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
                self.advance();
            }
            if self.lex_float_exp(diags) { TokenKind::Float } else { TokenKind::Unknown }
        } else {
            TokenKind::Int
        };
        let text = &self.src[start.offset..self.cur.offset];
        if kind == TokenKind::Float && text.starts_with("00") {
            diags.push(
                Diagnostic::new(
                    DiagnosticKind::FloatLeadingZero,
                    LexerCursorRange::new(
                        start,
                        LexerCursor::at(start.line, start.column + 2, start.offset + 2),
                    ),
                )
                .arg(text.to_string()),
            );
        }
        kind
    }

    // ===== Lookahead classifiers =====

    /// Unquoted URI: `scheme ':' uri-char+` where scheme is
    /// `[a-zA-Z][a-zA-Z0-9+.-]*`. Consumes and returns true on match.
    fn try_uri(&mut self) -> bool {
        let saved = self.cur;
        if !self.peek_byte(0).is_some_and(|b| b.is_ascii_alphabetic()) {
            return false;
        }
        self.advance();
        while self.peek_byte(0).is_some_and(is_uri_scheme_char) {
            self.advance();
        }
        if self.peek_byte(0) != Some(b':') || !self.peek_byte(1).is_some_and(is_uri_char) {
            self.cur = saved;
            return false;
        }
        self.advance(); // :
        while self.peek_byte(0).is_some_and(is_uri_char) {
            self.advance();
        }
        true
    }

    /// Path start: `{path-char}*('/'{path-char}+)+` or `~/...`. A path may
    /// continue with an interpolation, so a fragment also ends before `${`.
    /// Consumes the first fragment and returns true on match.
    fn try_path_start(&mut self) -> bool {
        let saved = self.cur;
        if self.peek_byte(0) == Some(b'~') {
            self.advance();
            if self.peek_byte(0) != Some(b'/') {
                self.cur = saved;
                return false;
            }
        } else {
            while self.peek_byte(0).is_some_and(is_path_char) {
                self.advance();
            }
            let continues = self.peek_byte(0) == Some(b'/')
                && (self.peek_byte(1).is_some_and(is_path_char) || {
                    self.bytes.get(self.cur.offset + 1) == Some(&b'$')
                        && self.bytes.get(self.cur.offset + 2) == Some(&b'{')
                });
            if !continues {
                self.cur = saved;
                return false;
            }
        }
        // Consume the rest of this fragment: path chars and slashes, stopping
        // in front of an interpolation.
        while !self.starts_with("${")
            && self.peek_byte(0).is_some_and(|b| is_path_char(b) || b == b'/')
        {
            self.advance();
        }
        true
    }

    /// Search path: `<` path-chars (`/` path-chars)* `>`.
    fn try_spath(&mut self) -> bool {
        let saved = self.cur;
        if self.peek_byte(0) != Some(b'<') {
            return false;
        }
        self.advance();
        let mut seen = false;
        while self.peek_byte(0).is_some_and(|b| is_path_char(b) || b == b'/') {
            seen = true;
            self.advance();
        }
        if seen && self.peek_byte(0) == Some(b'>') {
            self.advance();
            true
        } else {
            self.cur = saved;
            false
        }
    }

    fn lex_identifier(&mut self) {
        // ID = [a-zA-Z_][a-zA-Z0-9_'-]*
        while self.peek_byte(0).is_some_and(is_ident_continue) {
            self.advance();
        }
    }

    // ===== Mode entry points =====

    /// Expression mode.
    pub fn lex(&mut self, diags: &mut Vec<Diagnostic>) -> Token {
        let leading = self.consume_trivia(diags);
        let start = self.cur;
        let tok = |lexer: &Lexer<'src>, kind| {
            let mut t = lexer.finish(kind, start);
            t.leading = leading.clone();
            t
        };

        if self.eof() {
            return tok(self, TokenKind::Eof);
        }

        // URIs and paths take precedence over identifiers and numbers, like
        // the longest-match rule in the official grammar.
        if self.try_uri() {
            return tok(self, TokenKind::Uri);
        }
        if self.try_path_start() {
            return tok(self, TokenKind::PathFragment);
        }
        if self.try_spath() {
            return tok(self, TokenKind::SearchPath);
        }

        let b = self.bytes[self.cur.offset];
        if b.is_ascii_digit()
            || (b == b'.' && self.peek_byte(1).is_some_and(|n| n.is_ascii_digit()))
        {
            let kind = self.lex_numbers(start, diags);
            return tok(self, kind);
        }

        if is_ident_start(b) {
            self.lex_identifier();
            let text = &self.src[start.offset..self.cur.offset];
            let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Identifier);
            return tok(self, kind);
        }

        // Multi-character operators and punctuation first.
        for (spelling, kind) in [
            ("...", TokenKind::Ellipsis),
            ("${", TokenKind::DollarCurly),
            ("''", TokenKind::Quote2),
            ("->", TokenKind::Implies),
            ("//", TokenKind::Update),
            ("++", TokenKind::Concat),
            ("==", TokenKind::Equal),
            ("!=", TokenKind::NotEqual),
            ("<=", TokenKind::LessEqual),
            (">=", TokenKind::GreaterEqual),
            ("&&", TokenKind::And),
            ("||", TokenKind::Or),
        ] {
            if self.consume_prefix(spelling) {
                return tok(self, kind);
            }
        }

        let single = match b {
            b'{' => Some(TokenKind::LBrace),
            b'}' => Some(TokenKind::RBrace),
            b'[' => Some(TokenKind::LBracket),
            b']' => Some(TokenKind::RBracket),
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b';' => Some(TokenKind::Semicolon),
            b',' => Some(TokenKind::Comma),
            b'.' => Some(TokenKind::Dot),
            b':' => Some(TokenKind::Colon),
            b'@' => Some(TokenKind::At),
            b'?' => Some(TokenKind::Question),
            b'=' => Some(TokenKind::Assign),
            b'+' => Some(TokenKind::Plus),
            b'-' => Some(TokenKind::Minus),
            b'*' => Some(TokenKind::Star),
            b'/' => Some(TokenKind::Slash),
            b'<' => Some(TokenKind::Less),
            b'>' => Some(TokenKind::Greater),
            b'!' => Some(TokenKind::Not),
            b'"' => Some(TokenKind::DQuote),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return tok(self, kind);
        }

        self.advance();
        tok(self, TokenKind::Unknown)
    }

    /// String mode, between `"` delimiters.
    ///
    /// Emits `StringPart`, `StringEscape` (a backslash and the escaped
    /// character), `DollarCurly`, or the closing `DQuote`. `$$` and `$${`
    /// are absorbed as part content.
    pub fn lex_string(&mut self, _diags: &mut Vec<Diagnostic>) -> Token {
        let start = self.cur;
        if self.eof() {
            return self.finish(TokenKind::Eof, start);
        }
        match self.bytes[self.cur.offset] {
            b'"' => {
                self.advance();
                self.finish(TokenKind::DQuote, start)
            }
            b'\\' => {
                // Two characters, for escaping. An escape cut off by EOF is
                // still one token.
                self.advance();
                self.advance();
                self.finish(TokenKind::StringEscape, start)
            }
            b'$' if self.starts_with("${") => {
                self.consume_prefix("${");
                self.finish(TokenKind::DollarCurly, start)
            }
            _ => {
                while !self.eof() {
                    match self.bytes[self.cur.offset] {
                        b'\\' | b'"' => break,
                        b'$' => {
                            // Double-$ escapes the interpolation.
                            if self.consume_prefix("$${") {
                                continue;
                            }
                            if self.starts_with("${") {
                                break;
                            }
                            self.advance();
                        }
                        _ => self.advance(),
                    }
                }
                self.finish(TokenKind::StringPart, start)
            }
        }
    }

    /// Indented-string mode, between `''` delimiters. `'''`, `''$` and
    /// `''\x` are in-content escapes; `$${` is absorbed as content.
    pub fn lex_ind_string(&mut self, _diags: &mut Vec<Diagnostic>) -> Token {
        let start = self.cur;
        if self.eof() {
            return self.finish(TokenKind::Eof, start);
        }
        if self.starts_with("''") {
            if self.consume_prefix("''$") || self.consume_prefix("'''") {
                return self.finish(TokenKind::StringEscape, start);
            }
            if self.starts_with("''\\") {
                self.consume_prefix("''\\");
                self.advance();
                return self.finish(TokenKind::StringEscape, start);
            }
            self.consume_prefix("''");
            return self.finish(TokenKind::Quote2, start);
        }
        if self.starts_with("${") {
            self.consume_prefix("${");
            return self.finish(TokenKind::DollarCurly, start);
        }
        while !self.eof() {
            if self.starts_with("''") {
                break;
            }
            if self.bytes[self.cur.offset] == b'$' {
                if self.consume_prefix("$${") {
                    continue;
                }
                if self.starts_with("${") {
                    break;
                }
                self.advance();
                continue;
            }
            self.advance();
        }
        self.finish(TokenKind::StringPart, start)
    }

    /// Path mode. Emits further `PathFragment`s and `DollarCurly`s until the
    /// path ends, then a zero-width `PathEnd`.
    ///
    /// `~` is accepted as fragment content so home-relative paths re-lex
    /// cleanly after a mode switch.
    pub fn lex_path(&mut self, _diags: &mut Vec<Diagnostic>) -> Token {
        let start = self.cur;
        if self.starts_with("${") {
            self.consume_prefix("${");
            return self.finish(TokenKind::DollarCurly, start);
        }
        let mut seen = false;
        while !self.starts_with("${")
            && self.peek_byte(0).is_some_and(|b| is_path_char(b) || b == b'/' || b == b'~')
        {
            seen = true;
            self.advance();
        }
        if seen {
            self.finish(TokenKind::PathFragment, start)
        } else {
            self.finish(TokenKind::PathEnd, start)
        }
    }
}

#[cfg(test)]
mod tests;
