//! ParentMap analysis.
//!
//! Records each node's direct parent so handlers can walk upwards (the tree
//! itself only stores downward edges). Kept as a dense side table keyed by
//! node index; desugared nodes that are not reachable from the root simply
//! have no entry.

use nix_ast::{NodeArena, NodeId, NodeKind};

#[derive(Debug)]
pub struct ParentMapAnalysis {
    parents: Vec<Option<NodeId>>,
    root: NodeId,
}

impl ParentMapAnalysis {
    /// Single depth-first pass over the tree. The root's parent is itself.
    pub fn run(arena: &NodeArena, root: NodeId) -> Self {
        let mut parents: Vec<Option<NodeId>> = vec![None; arena.len()];
        parents[root.index()] = Some(root);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for child in arena.get(id).children().into_iter().flatten() {
                parents[child.index()] = Some(id);
                stack.push(child);
            }
        }
        ParentMapAnalysis { parents, root }
    }

    /// The unique parent of `id`; the root maps to itself.
    pub fn query(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id.index()).copied().flatten()
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Ascend from `id` (inclusive) until a node of `kind` is reached.
    pub fn up_to(&self, arena: &NodeArena, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut cur = id;
        loop {
            if arena.get(cur).kind() == kind {
                return Some(cur);
            }
            if self.is_root(cur) {
                return None;
            }
            cur = self.query(cur)?;
        }
    }

    /// Ascend from `id` (inclusive) until a concrete expression is reached.
    ///
    /// ```text
    /// a
    /// ^<----- Identifier -> ExprVar
    /// ```
    pub fn up_expr(&self, arena: &NodeArena, id: NodeId) -> Option<NodeId> {
        let mut cur = id;
        loop {
            if arena.get(cur).kind().is_expr() {
                return Some(cur);
            }
            if self.is_root(cur) {
                return None;
            }
            cur = self.query(cur)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> (nix_parser::ParseResult, ParentMapAnalysis) {
        let mut diags = Vec::new();
        let result = nix_parser::parse(src, &mut diags);
        let root = result.root.unwrap_or_else(|| unreachable!("no root"));
        let pm = ParentMapAnalysis::run(&result.arena, root);
        (result, pm)
    }

    #[test]
    fn root_is_its_own_parent() {
        let (result, pm) = parse("[ 1 ]");
        let root = result.root.unwrap_or_else(|| unreachable!());
        assert_eq!(pm.query(root), Some(root));
        assert!(pm.is_root(root));
    }

    #[test]
    fn identifier_ascends_to_var() {
        let src = "[ foo ]";
        let (result, pm) = parse(src);
        let root = result.root.unwrap_or_else(|| unreachable!());
        let ident = result
            .arena
            .descend(root, 2, 3)
            .unwrap_or_else(|| unreachable!());
        assert_eq!(result.arena.get(ident).kind(), NodeKind::Identifier);
        let var = pm
            .up_expr(&result.arena, ident)
            .unwrap_or_else(|| unreachable!());
        assert_eq!(result.arena.get(var).kind(), NodeKind::ExprVar);
        assert_eq!(
            pm.up_to(&result.arena, ident, NodeKind::ExprList),
            Some(root)
        );
        assert_eq!(pm.up_to(&result.arena, ident, NodeKind::ExprAttrs), None);
    }

    #[test]
    fn every_reachable_node_has_a_parent_inside_its_range() {
        let src = "let a = { b = x: [ x ]; }; in a.b 1";
        let (result, pm) = parse(src);
        let root = result.root.unwrap_or_else(|| unreachable!());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for child in result.arena.get(id).children().into_iter().flatten() {
                assert_eq!(pm.query(child), Some(id));
                stack.push(child);
            }
        }
    }
}
