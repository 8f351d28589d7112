//! Position tracking for Nix source text.
//!
//! This crate provides the shared position vocabulary used by the lexer,
//! parser, analyses and the LSP layer:
//!
//! - [`LexerCursor`] / [`LexerCursorRange`]: zero-based `(line, column,
//!   byte-offset)` source positions as produced by the lexer. Offsets measure
//!   bytes in the UTF-8 source.
//! - [`LineStartsCache`]: conversion between byte offsets and LSP positions
//!   (zero-based line, UTF-16 code-unit column).
//! - [`TextEdit`] and [`apply_edits`]: plain `(range, new text)` edits, the
//!   currency of fix-its and refactoring actions.

pub mod cursor;
pub mod edit;
pub mod line_index;

pub use cursor::{LexerCursor, LexerCursorRange};
pub use edit::{TextEdit, apply_edits};
pub use line_index::LineStartsCache;
