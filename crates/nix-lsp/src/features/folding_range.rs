//! Folding ranges.

use lsp_types as lsp;
use nix_ast::{Node, NodeId};

use crate::convert::tu_range;
use crate::state::NixTU;

/// Bound on AST recursion so pathological nesting cannot overflow the
/// stack.
const MAX_RECURSION_DEPTH: usize = 256;

pub fn folding_range(tu: &NixTU) -> Vec<lsp::FoldingRange> {
    let mut ranges = Vec::new();
    if let Some(root) = tu.root() {
        collect(tu, root, &mut ranges, 0);
    }
    ranges
}

fn add(tu: &NixTU, node: NodeId, ranges: &mut Vec<lsp::FoldingRange>) {
    let range = tu_range(tu, tu.parse().arena.get(node).range());
    // Folding needs at least two lines.
    if range.start.line >= range.end.line {
        return;
    }
    ranges.push(lsp::FoldingRange {
        start_line: range.start.line,
        start_character: Some(range.start.character),
        end_line: range.end.line,
        end_character: Some(range.end.character),
        kind: Some(lsp::FoldingRangeKind::Region),
        collapsed_text: None,
    });
}

fn collect(tu: &NixTU, node: NodeId, ranges: &mut Vec<lsp::FoldingRange>, depth: usize) {
    if depth >= MAX_RECURSION_DEPTH {
        return;
    }
    let arena = &tu.parse().arena;
    match arena.get(node) {
        Node::ExprAttrs(_)
        | Node::ExprList(_)
        | Node::ExprLambda(_)
        | Node::ExprLet(_)
        | Node::ExprWith(_)
        | Node::ExprIf(_) => {
            add(tu, node, ranges);
            for child in arena.get(node).children().into_iter().flatten() {
                collect(tu, child, ranges, depth + 1);
            }
        }
        Node::ExprString(_) => {
            // Multiline strings fold as well.
            add(tu, node, ranges);
        }
        other => {
            for child in other.children().into_iter().flatten() {
                collect(tu, child, ranges, depth + 1);
            }
        }
    }
}
