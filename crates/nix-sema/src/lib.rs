//! Semantic analyses over the Nix CST.
//!
//! Two passes run after parsing, both producing immutable side tables keyed
//! by node index:
//!
//! - [`ParentMapAnalysis`] — child → parent edges for up-traversal;
//! - [`VariableLookupAnalysis`] — scope tree construction and resolution of
//!   every variable use to a definition, a `with` scope, a builtin, or
//!   "undefined", with liveness diagnostics.

pub mod builtins;
pub mod parent_map;
pub mod variable_lookup;

pub use parent_map::ParentMapAnalysis;
pub use variable_lookup::{
    DefId, Definition, DefinitionSource, EnvId, EnvNode, LookupResult, LookupResultKind,
    VariableLookupAnalysis,
};
