//! Nix Token Definitions
//!
//! This crate provides the shared token definitions used by the Nix lexer,
//! parser and related tools, together with the trivia (whitespace/comment)
//! model that attaches to tokens.

use nix_position_tracking::{LexerCursor, LexerCursorRange};

/// Token classification for Nix parsing.
///
/// The set is closed and mirrors the grammar of the Nix expression language:
/// keywords, punctuation, operators, literal pieces produced by the string,
/// indented-string and path sub-lexers, plus `Unknown` and `Eof`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ===== Keywords =====
    /// Conditional: `if`
    KwIf,
    /// Then branch: `then`
    KwThen,
    /// Else branch: `else`
    KwElse,
    /// Assertion: `assert cond; body`
    KwAssert,
    /// Scope import: `with e; body`
    KwWith,
    /// Bindings: `let ... in ...`
    KwLet,
    /// Body separator of `let`
    KwIn,
    /// Recursive attribute set modifier: `rec { }`
    KwRec,
    /// Binding without repetition: `inherit (e) a b;`
    KwInherit,
    /// Select default / pseudo identifier: `e.a or d`
    KwOr,

    // ===== Punctuation =====
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `@`
    At,
    /// `?` (formal default marker and has-attr operator)
    Question,
    /// `=`
    Assign,
    /// `...`
    Ellipsis,

    // ===== Operators =====
    /// Addition: `+`
    Plus,
    /// Subtraction and unary negation: `-`
    Minus,
    /// Multiplication: `*`
    Star,
    /// Division: `/`
    Slash,
    /// List concatenation: `++`
    Concat,
    /// Attribute set update: `//`
    Update,
    /// Equality: `==`
    Equal,
    /// Inequality: `!=`
    NotEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// Logical AND: `&&`
    And,
    /// Logical OR: `||`
    Or,
    /// Implication: `->`
    Implies,
    /// Logical NOT: `!`
    Not,

    // ===== Literals and sub-lexer pieces =====
    /// Integer literal: `42`
    Int,
    /// Float literal: `3.14`, `2.5e-3`
    Float,
    /// Identifier: `foo`, `foo-bar'`
    Identifier,
    /// Literal chunk inside a string or indented string
    StringPart,
    /// Escape sequence inside a string (`\n`, `'''`, `''$`, ...)
    StringEscape,
    /// Double quote `"` opening or closing a string
    DQuote,
    /// Two single quotes `''` opening or closing an indented string
    Quote2,
    /// Interpolation opener `${`
    DollarCurly,
    /// A chunk of a path literal: `./foo`, `bar/baz`
    PathFragment,
    /// Zero-width marker closing a path context
    PathEnd,
    /// Search path: `<nixpkgs/lib>`
    SearchPath,
    /// Unquoted URI: `https://example.org/x`
    Uri,

    // ===== Special =====
    /// Unrecognized byte sequence
    Unknown,
    /// End of file/input
    Eof,
}

impl TokenKind {
    /// Canonical spelling of the token, for insertion fix-its and messages.
    ///
    /// Kinds without a fixed spelling (identifiers, literals, string parts)
    /// return a human-readable placeholder.
    pub fn spelling(self) -> &'static str {
        use TokenKind::*;
        match self {
            KwIf => "if",
            KwThen => "then",
            KwElse => "else",
            KwAssert => "assert",
            KwWith => "with",
            KwLet => "let",
            KwIn => "in",
            KwRec => "rec",
            KwInherit => "inherit",
            KwOr => "or",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            LParen => "(",
            RParen => ")",
            Semicolon => ";",
            Comma => ",",
            Dot => ".",
            Colon => ":",
            At => "@",
            Question => "?",
            Assign => "=",
            Ellipsis => "...",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Concat => "++",
            Update => "//",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            And => "&&",
            Or => "||",
            Implies => "->",
            Not => "!",
            Int => "integer",
            Float => "float",
            Identifier => "identifier",
            StringPart => "string",
            StringEscape => "escape sequence",
            DQuote => "\"",
            Quote2 => "''",
            DollarCurly => "${",
            PathFragment => "path",
            PathEnd => "path end",
            SearchPath => "search path",
            Uri => "URI",
            Unknown => "unknown",
            Eof => "eof",
        }
    }

    /// Whether this kind is a binary operator handled by the Pratt layer.
    pub fn is_binary_op(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Implies
                | Or
                | And
                | Equal
                | NotEqual
                | Less
                | Greater
                | LessEqual
                | GreaterEqual
                | Update
                | Plus
                | Minus
                | Star
                | Slash
                | Concat
        )
    }

    /// Map a raw identifier to its keyword kind, if it is one.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match ident {
            "if" => KwIf,
            "then" => KwThen,
            "else" => KwElse,
            "assert" => KwAssert,
            "with" => KwWith,
            "let" => KwLet,
            "in" => KwIn,
            "rec" => KwRec,
            "inherit" => KwInherit,
            "or" => KwOr,
            _ => return None,
        })
    }
}

/// Kind of a single trivia piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    /// Spaces, tabs, newlines
    Whitespace,
    /// `# ...` until end of line
    LineComment,
    /// `/* ... */`
    BlockComment,
}

/// A run of whitespace or one comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriviaPiece {
    pub kind: TriviaKind,
    pub range: LexerCursorRange,
}

impl TriviaPiece {
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TriviaKind::LineComment | TriviaKind::BlockComment)
    }
}

/// Directive carried by a comment, recognized by the diagnostic publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentDirective {
    /// `nixf-ignore:<sname>` — suppress the diagnostic on the next line.
    Ignore(String),
    /// `nixf-disable:<sname>` — suppress the diagnostic kind document-wide.
    Disable(String),
}

/// A retained comment with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub kind: TriviaKind,
    pub range: LexerCursorRange,
}

impl Comment {
    /// Parse a directive out of the comment text, if any.
    ///
    /// The directive payload runs to the next whitespace (or `*/` for block
    /// comments).
    pub fn directive(&self, src: &str) -> Option<CommentDirective> {
        let text = self.range.view(src);
        for (marker, mk) in [
            ("nixf-ignore:", CommentDirective::Ignore as fn(String) -> CommentDirective),
            ("nixf-disable:", CommentDirective::Disable as fn(String) -> CommentDirective),
        ] {
            if let Some(idx) = text.find(marker) {
                let rest = &text[idx + marker.len()..];
                let name: String = rest
                    .chars()
                    .take_while(|c| !c.is_whitespace() && *c != '*')
                    .collect();
                if !name.is_empty() {
                    return Some(mk(name));
                }
            }
        }
        None
    }
}

/// Token produced by the lexer and consumed by the parser.
///
/// Stores the kind, the source range, and the trivia attached in front of the
/// token. The source text of the token is recovered by slicing; tokens stay
/// cheap to clone for the parser's lookahead buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: LexerCursorRange,
    /// Whitespace and comments between the previous token and this one.
    pub leading: Vec<TriviaPiece>,
}

impl Token {
    pub fn new(kind: TokenKind, range: LexerCursorRange) -> Self {
        Token { kind, range, leading: Vec::new() }
    }

    /// Begin cursor of the token itself (leading trivia excluded).
    pub fn l_cur(&self) -> LexerCursor {
        self.range.begin
    }

    /// End cursor of the token.
    pub fn r_cur(&self) -> LexerCursor {
        self.range.end
    }

    /// Source slice of the token.
    pub fn view<'a>(&self, src: &'a str) -> &'a str {
        self.range.view(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix_position_tracking::LexerCursor;
    use pretty_assertions::assert_eq;

    #[test]
    fn keyword_lookup() {
        assert_eq!(TokenKind::keyword("let"), Some(TokenKind::KwLet));
        assert_eq!(TokenKind::keyword("lets"), None);
        assert_eq!(TokenKind::keyword("or"), Some(TokenKind::KwOr));
    }

    #[test]
    fn spelling_of_punctuation() {
        assert_eq!(TokenKind::Semicolon.spelling(), ";");
        assert_eq!(TokenKind::Ellipsis.spelling(), "...");
        assert_eq!(TokenKind::DollarCurly.spelling(), "${");
    }

    #[test]
    fn comment_directives() {
        let src = "# nixf-ignore:undefined-variable\nfoo";
        let comment = Comment {
            kind: TriviaKind::LineComment,
            range: LexerCursorRange::new(
                LexerCursor::at(0, 0, 0),
                LexerCursor::at(0, 32, 32),
            ),
        };
        assert_eq!(
            comment.directive(src),
            Some(CommentDirective::Ignore("undefined-variable".into()))
        );

        let src = "/* nixf-disable:extra-with */";
        let comment = Comment {
            kind: TriviaKind::BlockComment,
            range: LexerCursorRange::new(
                LexerCursor::at(0, 0, 0),
                LexerCursor::at(0, 29, 29),
            ),
        };
        assert_eq!(
            comment.directive(src),
            Some(CommentDirective::Disable("extra-with".into()))
        );
    }
}
