//! Concrete syntax tree for the Nix expression language.
//!
//! Nodes are allocated in a [`NodeArena`] and addressed by compact
//! [`NodeId`] indices; all child links are optional indices so the tree can
//! represent partially parsed source (missing children keep their position).
//! Analyses attach data in side tables keyed by `NodeId` instead of mutating
//! the tree: see [`sema::SemaAttrs`] for the lowered attribute-set
//! annotation.

pub mod arena;
pub mod nodes;
pub mod sema;

pub use arena::{NodeArena, NodeId};
pub use nodes::*;
pub use sema::{Attribute, AttributeKind, SemaAttrs, SemaMap};
