//! Parser for the Nix expression language.
//!
//! Hand-written recursive descent with a Pratt layer for operator
//! precedence, producing a diagnostic-carrying CST ([`nix_ast`]) plus the
//! lowered attribute-set annotations computed by semantic actions during
//! parsing.
//!
//! # Error recovery
//!
//! The parser never gives up on a document. Recovery is explicit:
//!
//! - a multiset of *sync tokens* bounds regions of unexpected input, which
//!   are consumed and reported as `unexpected-text`;
//! - [`parser::ExpectResult`] models a missing token as a value (carrying
//!   the emitted diagnostic) instead of unwinding, so every parse function
//!   continues with `None` children where needed;
//! - before every sub-lexer mode switch the lookahead buffer is flushed and
//!   the lexer rewound, so the new mode re-lexes those bytes.

pub mod parser;

mod attrs;
mod expr;
mod lambda;
mod sema;
mod simple;
mod strings;

use nix_ast::{NodeArena, NodeId, SemaMap};
use nix_diagnostics::Diagnostic;
use nix_token::Comment;

/// Everything one parse produces.
#[derive(Debug)]
pub struct ParseResult {
    pub arena: NodeArena,
    /// Root expression; `None` for an empty (or all-trivia) document.
    pub root: Option<NodeId>,
    /// Lowered attribute sets, keyed by `Attrs`/`Let` node.
    pub sema: SemaMap,
    /// All comments of the document, in source order.
    pub comments: Vec<Comment>,
}

/// Parse `src`, accumulating diagnostics into `diags`.
pub fn parse(src: &str, diags: &mut Vec<Diagnostic>) -> ParseResult {
    let mut parser = parser::Parser::new(src, diags);
    let root = parser.parse_expr();
    parser.consume_trailing();
    parser.finish(root)
}

#[cfg(test)]
mod tests;
