//! Lowered attribute-set annotations.
//!
//! Attribute paths are desugared into nested key/value form, e.g.
//! `{ a.b.c = 1; }` becomes `{ a = { b = { c = 1; }; }; }`. The result is a
//! [`SemaAttrs`] per `Attrs`/`Let` node, stored in a [`SemaMap`] side table
//! keyed by node index; the syntax tree itself is never rewritten.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::arena::NodeId;

/// How an attribute entered the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// `a = e;`
    Plain,
    /// `inherit a;`
    Inherit,
    /// `inherit (e) a;`
    InheritFrom,
}

impl AttributeKind {
    pub fn from_inherit(self) -> bool {
        matches!(self, AttributeKind::Inherit | AttributeKind::InheritFrom)
    }
}

/// A single lowered attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The key syntax node (`AttrName`).
    key: NodeId,
    /// The value expression. Null for an incompletely parsed binding or a
    /// bare `inherit x;`.
    value: Option<NodeId>,
    kind: AttributeKind,
}

impl Attribute {
    pub fn new(key: NodeId, value: Option<NodeId>, kind: AttributeKind) -> Self {
        Attribute { key, value, kind }
    }

    pub fn key(&self) -> NodeId {
        self.key
    }

    pub fn value(&self) -> Option<NodeId> {
        self.value
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn from_inherit(&self) -> bool {
        self.kind.from_inherit()
    }
}

/// The attribute set after lowering, suitable for variable lookup and the
/// document-symbol tree. Static names are insertion-ordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemaAttrs {
    static_attrs: IndexMap<String, Attribute>,
    dynamic_attrs: Vec<Attribute>,
    recursive: bool,
}

impl SemaAttrs {
    pub fn new(recursive: bool) -> Self {
        SemaAttrs { static_attrs: IndexMap::new(), dynamic_attrs: Vec::new(), recursive }
    }

    /// Static attributes: the key is known without evaluation.
    pub fn static_attrs(&self) -> &IndexMap<String, Attribute> {
        &self.static_attrs
    }

    pub fn static_attrs_mut(&mut self) -> &mut IndexMap<String, Attribute> {
        &mut self.static_attrs
    }

    /// Dynamic attributes: interpolated keys, e.g. `${k} = v;`.
    pub fn dynamic_attrs(&self) -> &[Attribute] {
        &self.dynamic_attrs
    }

    pub fn push_dynamic(&mut self, attr: Attribute) {
        self.dynamic_attrs.push(attr);
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn is_empty(&self) -> bool {
        self.static_attrs.is_empty() && self.dynamic_attrs.is_empty()
    }
}

/// Side table: `Attrs`/`Let` node → its lowered attribute set.
pub type SemaMap = FxHashMap<NodeId, SemaAttrs>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::NodeArena;
    use crate::nodes::{Misc, Node};
    use nix_position_tracking::LexerCursorRange;
    use pretty_assertions::assert_eq;

    #[test]
    fn static_attrs_preserve_insertion_order() {
        let mut arena = NodeArena::new();
        let key = arena.alloc(Node::Misc(Misc { range: LexerCursorRange::default() }));
        let mut sa = SemaAttrs::new(false);
        for name in ["z", "a", "m"] {
            sa.static_attrs_mut()
                .insert(name.to_string(), Attribute::new(key, None, AttributeKind::Plain));
        }
        let order: Vec<&str> = sa.static_attrs().keys().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["z", "a", "m"]);
    }

    #[test]
    fn attribute_kind_classification() {
        assert!(AttributeKind::Inherit.from_inherit());
        assert!(AttributeKind::InheritFrom.from_inherit());
        assert!(!AttributeKind::Plain.from_inherit());
    }
}
