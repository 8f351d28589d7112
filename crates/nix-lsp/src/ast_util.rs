//! Shared tree walks used by several feature handlers.

use nix_ast::{Node, NodeId, NodeKind};
use nix_sema::{DefId, EnvId, LookupResultKind, ParentMapAnalysis, VariableLookupAnalysis};

use crate::state::NixTU;

/// Well-known identifiers with dedicated handling.
pub mod idioms {
    /// The conventional nixpkgs scope: `with pkgs; ...`.
    pub const PKGS: &str = "pkgs";
    /// The nixpkgs library; excluded from package inlay hints.
    pub const LIB: &str = "lib";
}

/// Search up from `node` until a node with an associated environment is
/// found.
pub fn up_env(tu: &NixTU, node: NodeId) -> Option<EnvId> {
    let pm = tu.parent_map()?;
    let vla = tu.variable_lookup()?;
    let mut cur = node;
    loop {
        if let Some(env) = vla.env_of(cur) {
            return Some(env);
        }
        if pm.is_root(cur) {
            return None;
        }
        cur = pm.query(cur)?;
    }
}

/// Whether `node` sits inside a `with pkgs; ...` scope.
///
/// This is a heuristic: only the literal identifier `pkgs` counts, which is
/// the dominant convention and keeps the check evaluation-free.
pub fn have_package_scope(tu: &NixTU, node: NodeId) -> bool {
    let Some(vla) = tu.variable_lookup() else { return false };
    let arena = &tu.parse().arena;
    let mut env = up_env(tu, node);
    while let Some(e) = env {
        let env_node = vla.env(e);
        env = env_node.parent();
        if !env_node.is_with() {
            continue;
        }
        let Some(syntax) = env_node.syntax() else { continue };
        let Node::ExprWith(with) = arena.get(syntax) else { continue };
        let Some(with_expr) = with.with else { continue };
        let Node::ExprVar(var) = arena.get(with_expr) else { continue };
        if let Node::Identifier(ident) = arena.get(var.id) {
            if ident.name == idioms::PKGS {
                return true;
            }
        }
    }
    false
}

/// The scope and prefix for package queries at `node`: currently the bare
/// identifier text, with no pre-selected scope.
pub fn get_scope_and_prefix(tu: &NixTU, node: NodeId) -> (Vec<String>, String) {
    let arena = &tu.parse().arena;
    match arena.get(node) {
        Node::Identifier(ident) => (Vec::new(), ident.name.clone()),
        _ => (Vec::new(), String::new()),
    }
}

/// Find the definition behind `node`, ascending through wrapper nodes.
///
/// Fails for undefined variables and builtins so navigation features can
/// report "not found".
pub fn find_definition(tu: &NixTU, node: NodeId) -> Result<DefId, &'static str> {
    let pm = tu.parent_map().ok_or("no parent map for this document")?;
    let vla = tu.variable_lookup().ok_or("no variable analysis for this document")?;
    let arena = &tu.parse().arena;

    let Some(var) = pm.up_to(arena, node, NodeKind::ExprVar) else {
        return find_self_definition(pm, vla, arena, node);
    };
    let result = vla.query(var).ok_or("variable is not analyzed")?;
    if result.kind == LookupResultKind::Undefined {
        return Err("this variable is undefined");
    }
    let def = result.def.ok_or("variable has no definition")?;
    if vla.def(def).is_builtin() {
        return Err("this is a builtin variable");
    }
    Ok(def)
}

/// If `node` (or its enclosing attrname) is a definition site itself,
/// return that definition.
fn find_self_definition(
    pm: &ParentMapAnalysis,
    vla: &VariableLookupAnalysis,
    arena: &nix_ast::NodeArena,
    node: NodeId,
) -> Result<DefId, &'static str> {
    if let Some(def) = vla.to_def(node) {
        return Ok(def);
    }
    if let Some(parent) = pm.query(node) {
        if arena.get(parent).kind() == NodeKind::AttrName {
            if let Some(def) = vla.to_def(parent) {
                return Ok(def);
            }
        }
    }
    Err("cannot find a variable at the given position")
}

/// The node under an LSP position, or `None` outside the tree.
pub fn descend_position(tu: &NixTU, position: lsp_types::Position) -> Option<NodeId> {
    let offset = crate::convert::to_offset(tu, position)?;
    tu.parse().arena.descend(tu.root()?, offset, offset)
}
