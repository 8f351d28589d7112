//! Typed CST nodes.
//!
//! Every node carries its kind tag, source range and order-significant
//! children. Children that failed to parse are preserved as `None` so
//! positions keep their meaning. The kind union is closed; `NodeKind` is the
//! tag used by analyses and feature handlers.

use nix_position_tracking::LexerCursorRange;
use nix_token::TokenKind;

use crate::arena::{NodeArena, NodeId};

/// Kind tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Expressions
    ExprInt,
    ExprFloat,
    ExprString,
    ExprPath,
    ExprSPath,
    ExprVar,
    ExprParen,
    ExprList,
    ExprAttrs,
    ExprLambda,
    ExprCall,
    ExprSelect,
    ExprOpHasAttr,
    ExprBinOp,
    ExprUnaryOp,
    ExprIf,
    ExprAssert,
    ExprLet,
    ExprWith,
    // Structural
    AttrName,
    AttrPath,
    Binding,
    Inherit,
    Binds,
    Formal,
    Formals,
    LambdaArg,
    Interpolation,
    InterpolatedParts,
    Misc,
    Identifier,
    Dot,
    Op,
}

impl NodeKind {
    /// Human-readable node name, used by hover and logging.
    pub fn name(self) -> &'static str {
        use NodeKind::*;
        match self {
            ExprInt => "ExprInt",
            ExprFloat => "ExprFloat",
            ExprString => "ExprString",
            ExprPath => "ExprPath",
            ExprSPath => "ExprSPath",
            ExprVar => "ExprVar",
            ExprParen => "ExprParen",
            ExprList => "ExprList",
            ExprAttrs => "ExprAttrs",
            ExprLambda => "ExprLambda",
            ExprCall => "ExprCall",
            ExprSelect => "ExprSelect",
            ExprOpHasAttr => "ExprOpHasAttr",
            ExprBinOp => "ExprBinOp",
            ExprUnaryOp => "ExprUnaryOp",
            ExprIf => "ExprIf",
            ExprAssert => "ExprAssert",
            ExprLet => "ExprLet",
            ExprWith => "ExprWith",
            AttrName => "AttrName",
            AttrPath => "AttrPath",
            Binding => "Binding",
            Inherit => "Inherit",
            Binds => "Binds",
            Formal => "Formal",
            Formals => "Formals",
            LambdaArg => "LambdaArg",
            Interpolation => "Interpolation",
            InterpolatedParts => "InterpolatedParts",
            Misc => "Misc",
            Identifier => "Identifier",
            Dot => "Dot",
            Op => "Op",
        }
    }

    /// Whether the kind is an expression.
    pub fn is_expr(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            ExprInt
                | ExprFloat
                | ExprString
                | ExprPath
                | ExprSPath
                | ExprVar
                | ExprParen
                | ExprList
                | ExprAttrs
                | ExprLambda
                | ExprCall
                | ExprSelect
                | ExprOpHasAttr
                | ExprBinOp
                | ExprUnaryOp
                | ExprIf
                | ExprAssert
                | ExprLet
                | ExprWith
        )
    }

    /// Whether an expression of this kind might evaluate to a lambda.
    ///
    /// Used by the parser to stop consuming call arguments after literals.
    pub fn maybe_lambda(self) -> bool {
        use NodeKind::*;
        if !self.is_expr() {
            return false;
        }
        !matches!(self, ExprInt | ExprFloat | ExprAttrs | ExprString | ExprPath)
    }
}

/// `${expr}` construct.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    pub range: LexerCursorRange,
    pub expr: Option<NodeId>,
}

/// One fragment of an interpolable literal: either cooked literal text or an
/// interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolablePart {
    /// Escape sequences already applied.
    Literal(String),
    /// Index of an [`Interpolation`] node.
    Interpolation(NodeId),
}

/// Ordered fragments of a string or path.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedParts {
    pub range: LexerCursorRange,
    pub fragments: Vec<InterpolablePart>,
}

impl InterpolatedParts {
    /// A parts list is "literal" iff it consists of exactly one literal
    /// fragment.
    pub fn is_literal(&self) -> bool {
        matches!(self.fragments.as_slice(), [InterpolablePart::Literal(_)])
    }

    pub fn literal(&self) -> Option<&str> {
        match self.fragments.as_slice() {
            [InterpolablePart::Literal(s)] => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprInt {
    pub range: LexerCursorRange,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprFloat {
    pub range: LexerCursorRange,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprString {
    pub range: LexerCursorRange,
    pub parts: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprPath {
    pub range: LexerCursorRange,
    pub parts: NodeId,
}

/// Search path literal, e.g. `<nixpkgs/lib>`. `text` is the inner text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprSPath {
    pub range: LexerCursorRange,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprVar {
    pub range: LexerCursorRange,
    pub id: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprParen {
    pub range: LexerCursorRange,
    pub expr: Option<NodeId>,
    pub l_paren: NodeId,
    pub r_paren: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprList {
    pub range: LexerCursorRange,
    pub elements: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprAttrs {
    pub range: LexerCursorRange,
    pub binds: Option<NodeId>,
    /// `rec` keyword marker, if present.
    pub rec: Option<NodeId>,
}

impl ExprAttrs {
    pub fn is_recursive(&self) -> bool {
        self.rec.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprLambda {
    pub range: LexerCursorRange,
    pub arg: Option<NodeId>,
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprCall {
    pub range: LexerCursorRange,
    pub func: NodeId,
    pub args: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprSelect {
    pub range: LexerCursorRange,
    pub expr: NodeId,
    pub path: Option<NodeId>,
    /// `or` default expression.
    pub default: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprOpHasAttr {
    pub range: LexerCursorRange,
    pub op: NodeId,
    pub expr: NodeId,
    pub path: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprBinOp {
    pub range: LexerCursorRange,
    pub op: NodeId,
    pub lhs: NodeId,
    pub rhs: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprUnaryOp {
    pub range: LexerCursorRange,
    pub op: NodeId,
    pub expr: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprIf {
    pub range: LexerCursorRange,
    pub cond: Option<NodeId>,
    pub then: Option<NodeId>,
    pub else_: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprAssert {
    pub range: LexerCursorRange,
    pub cond: Option<NodeId>,
    pub value: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprLet {
    pub range: LexerCursorRange,
    pub kw_let: NodeId,
    pub binds: Option<NodeId>,
    pub kw_in: Option<NodeId>,
    pub expr: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprWith {
    pub range: LexerCursorRange,
    pub kw_with: NodeId,
    pub with: Option<NodeId>,
    pub tok_semi: Option<NodeId>,
    pub expr: Option<NodeId>,
}

/// Attribute name: identifier, static string, or interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrNameForm {
    Id(NodeId),
    String(NodeId),
    Interpolation(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrName {
    pub range: LexerCursorRange,
    pub form: AttrNameForm,
}

/// Dotted attribute path. `names` is non-empty for any parsed attrpath.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrPath {
    pub range: LexerCursorRange,
    pub names: Vec<NodeId>,
    pub dots: Vec<NodeId>,
}

/// `attrpath = expr ;`
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub range: LexerCursorRange,
    pub path: NodeId,
    pub eq: Option<NodeId>,
    /// May be missing for an incompletely parsed binding.
    pub value: Option<NodeId>,
}

/// `inherit x;` / `inherit (e) x y;`
#[derive(Debug, Clone, PartialEq)]
pub struct Inherit {
    pub range: LexerCursorRange,
    pub names: Vec<NodeId>,
    pub expr: Option<NodeId>,
}

/// Sequence of bindings and inherits.
#[derive(Debug, Clone, PartialEq)]
pub struct Binds {
    pub range: LexerCursorRange,
    pub bindings: Vec<NodeId>,
}

/// One lambda formal: `,? ID (? default)?` or `,? ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Formal {
    pub range: LexerCursorRange,
    pub comma: Option<NodeId>,
    pub id: Option<NodeId>,
    pub default: Option<NodeId>,
    pub ellipsis: Option<NodeId>,
}

impl Formal {
    pub fn is_ellipsis(&self) -> bool {
        self.ellipsis.is_some()
    }
}

/// `{ formal* }`, plus the deduplicated name → formal map built by
/// lowering (deterministically ordered).
#[derive(Debug, Clone, PartialEq)]
pub struct Formals {
    pub range: LexerCursorRange,
    pub members: Vec<NodeId>,
    pub dedup: std::collections::BTreeMap<String, NodeId>,
}

/// Lambda argument: `x`, `{...}`, `x @ {...}` or `{...} @ x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaArg {
    pub range: LexerCursorRange,
    pub id: Option<NodeId>,
    pub formals: Option<NodeId>,
}

/// Location-only marker for keywords, braces and other punctuation.
#[derive(Debug, Clone, PartialEq)]
pub struct Misc {
    pub range: LexerCursorRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub range: LexerCursorRange,
    pub name: String,
}

/// Holds a `.` in an attrpath, linking its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct Dot {
    pub range: LexerCursorRange,
    pub prev: NodeId,
    pub next: Option<NodeId>,
}

/// Operator token carrier.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub range: LexerCursorRange,
    pub op: TokenKind,
}

/// The closed node union.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    ExprInt(ExprInt),
    ExprFloat(ExprFloat),
    ExprString(ExprString),
    ExprPath(ExprPath),
    ExprSPath(ExprSPath),
    ExprVar(ExprVar),
    ExprParen(ExprParen),
    ExprList(ExprList),
    ExprAttrs(ExprAttrs),
    ExprLambda(ExprLambda),
    ExprCall(ExprCall),
    ExprSelect(ExprSelect),
    ExprOpHasAttr(ExprOpHasAttr),
    ExprBinOp(ExprBinOp),
    ExprUnaryOp(ExprUnaryOp),
    ExprIf(ExprIf),
    ExprAssert(ExprAssert),
    ExprLet(ExprLet),
    ExprWith(ExprWith),
    AttrName(AttrName),
    AttrPath(AttrPath),
    Binding(Binding),
    Inherit(Inherit),
    Binds(Binds),
    Formal(Formal),
    Formals(Formals),
    LambdaArg(LambdaArg),
    Interpolation(Interpolation),
    InterpolatedParts(InterpolatedParts),
    Misc(Misc),
    Identifier(Identifier),
    Dot(Dot),
    Op(Op),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::ExprInt(_) => NodeKind::ExprInt,
            Node::ExprFloat(_) => NodeKind::ExprFloat,
            Node::ExprString(_) => NodeKind::ExprString,
            Node::ExprPath(_) => NodeKind::ExprPath,
            Node::ExprSPath(_) => NodeKind::ExprSPath,
            Node::ExprVar(_) => NodeKind::ExprVar,
            Node::ExprParen(_) => NodeKind::ExprParen,
            Node::ExprList(_) => NodeKind::ExprList,
            Node::ExprAttrs(_) => NodeKind::ExprAttrs,
            Node::ExprLambda(_) => NodeKind::ExprLambda,
            Node::ExprCall(_) => NodeKind::ExprCall,
            Node::ExprSelect(_) => NodeKind::ExprSelect,
            Node::ExprOpHasAttr(_) => NodeKind::ExprOpHasAttr,
            Node::ExprBinOp(_) => NodeKind::ExprBinOp,
            Node::ExprUnaryOp(_) => NodeKind::ExprUnaryOp,
            Node::ExprIf(_) => NodeKind::ExprIf,
            Node::ExprAssert(_) => NodeKind::ExprAssert,
            Node::ExprLet(_) => NodeKind::ExprLet,
            Node::ExprWith(_) => NodeKind::ExprWith,
            Node::AttrName(_) => NodeKind::AttrName,
            Node::AttrPath(_) => NodeKind::AttrPath,
            Node::Binding(_) => NodeKind::Binding,
            Node::Inherit(_) => NodeKind::Inherit,
            Node::Binds(_) => NodeKind::Binds,
            Node::Formal(_) => NodeKind::Formal,
            Node::Formals(_) => NodeKind::Formals,
            Node::LambdaArg(_) => NodeKind::LambdaArg,
            Node::Interpolation(_) => NodeKind::Interpolation,
            Node::InterpolatedParts(_) => NodeKind::InterpolatedParts,
            Node::Misc(_) => NodeKind::Misc,
            Node::Identifier(_) => NodeKind::Identifier,
            Node::Dot(_) => NodeKind::Dot,
            Node::Op(_) => NodeKind::Op,
        }
    }

    pub fn range(&self) -> LexerCursorRange {
        match self {
            Node::ExprInt(n) => n.range,
            Node::ExprFloat(n) => n.range,
            Node::ExprString(n) => n.range,
            Node::ExprPath(n) => n.range,
            Node::ExprSPath(n) => n.range,
            Node::ExprVar(n) => n.range,
            Node::ExprParen(n) => n.range,
            Node::ExprList(n) => n.range,
            Node::ExprAttrs(n) => n.range,
            Node::ExprLambda(n) => n.range,
            Node::ExprCall(n) => n.range,
            Node::ExprSelect(n) => n.range,
            Node::ExprOpHasAttr(n) => n.range,
            Node::ExprBinOp(n) => n.range,
            Node::ExprUnaryOp(n) => n.range,
            Node::ExprIf(n) => n.range,
            Node::ExprAssert(n) => n.range,
            Node::ExprLet(n) => n.range,
            Node::ExprWith(n) => n.range,
            Node::AttrName(n) => n.range,
            Node::AttrPath(n) => n.range,
            Node::Binding(n) => n.range,
            Node::Inherit(n) => n.range,
            Node::Binds(n) => n.range,
            Node::Formal(n) => n.range,
            Node::Formals(n) => n.range,
            Node::LambdaArg(n) => n.range,
            Node::Interpolation(n) => n.range,
            Node::InterpolatedParts(n) => n.range,
            Node::Misc(n) => n.range,
            Node::Identifier(n) => n.range,
            Node::Dot(n) => n.range,
            Node::Op(n) => n.range,
        }
    }

    /// Human-readable node name, e.g. `"ExprVar"`.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// The exact slice of source bytes for the node.
    pub fn src<'a>(&self, src: &'a str) -> &'a str {
        self.range().view(src)
    }

    /// Direct children, in source order. Missing children are preserved as
    /// `None` so positions remain meaningful.
    pub fn children(&self) -> Vec<Option<NodeId>> {
        match self {
            Node::ExprInt(_)
            | Node::ExprFloat(_)
            | Node::ExprSPath(_)
            | Node::Misc(_)
            | Node::Identifier(_)
            | Node::Dot(_)
            | Node::Op(_) => Vec::new(),
            Node::ExprString(n) => vec![Some(n.parts)],
            Node::ExprPath(n) => vec![Some(n.parts)],
            Node::ExprVar(n) => vec![Some(n.id)],
            Node::ExprParen(n) => vec![Some(n.l_paren), n.expr, n.r_paren],
            Node::ExprList(n) => n.elements.iter().map(|e| Some(*e)).collect(),
            Node::ExprAttrs(n) => vec![n.rec, n.binds],
            Node::ExprLambda(n) => vec![n.arg, n.body],
            Node::ExprCall(n) => {
                let mut out = Vec::with_capacity(n.args.len() + 1);
                out.push(Some(n.func));
                out.extend(n.args.iter().map(|a| Some(*a)));
                out
            }
            Node::ExprSelect(n) => vec![Some(n.expr), n.path, n.default],
            Node::ExprOpHasAttr(n) => vec![Some(n.expr), Some(n.op), n.path],
            Node::ExprBinOp(n) => vec![Some(n.lhs), Some(n.op), Some(n.rhs)],
            Node::ExprUnaryOp(n) => vec![Some(n.op), n.expr],
            Node::ExprIf(n) => vec![n.cond, n.then, n.else_],
            Node::ExprAssert(n) => vec![n.cond, n.value],
            Node::ExprLet(n) => vec![Some(n.kw_let), n.binds, n.kw_in, n.expr],
            Node::ExprWith(n) => vec![Some(n.kw_with), n.with, n.tok_semi, n.expr],
            Node::AttrName(n) => match n.form {
                AttrNameForm::Id(id)
                | AttrNameForm::String(id)
                | AttrNameForm::Interpolation(id) => vec![Some(id)],
            },
            Node::AttrPath(n) => {
                let mut out: Vec<Option<NodeId>> = n.names.iter().map(|x| Some(*x)).collect();
                out.extend(n.dots.iter().map(|d| Some(*d)));
                out
            }
            Node::Binding(n) => vec![Some(n.path), n.eq, n.value],
            Node::Inherit(n) => {
                let mut out: Vec<Option<NodeId>> = n.names.iter().map(|x| Some(*x)).collect();
                out.push(n.expr);
                out
            }
            Node::Binds(n) => n.bindings.iter().map(|b| Some(*b)).collect(),
            Node::Formal(n) => {
                if n.is_ellipsis() {
                    vec![n.comma, n.ellipsis]
                } else {
                    vec![n.comma, n.id, n.default]
                }
            }
            Node::Formals(n) => n.members.iter().map(|m| Some(*m)).collect(),
            Node::LambdaArg(n) => vec![n.id, n.formals],
            Node::Interpolation(n) => vec![n.expr],
            Node::InterpolatedParts(n) => n
                .fragments
                .iter()
                .filter_map(|f| match f {
                    InterpolablePart::Literal(_) => None,
                    InterpolablePart::Interpolation(id) => Some(Some(*id)),
                })
                .collect(),
        }
    }
}

macro_rules! node_accessors {
    ($( $fn_name:ident : $variant:ident => $ty:ty, )*) => {
        impl Node {
            $(
                pub fn $fn_name(&self) -> Option<&$ty> {
                    match self {
                        Node::$variant(n) => Some(n),
                        _ => None,
                    }
                }
            )*
        }
    };
}

node_accessors! {
    as_expr_int: ExprInt => ExprInt,
    as_expr_float: ExprFloat => ExprFloat,
    as_expr_string: ExprString => ExprString,
    as_expr_path: ExprPath => ExprPath,
    as_expr_var: ExprVar => ExprVar,
    as_expr_paren: ExprParen => ExprParen,
    as_expr_list: ExprList => ExprList,
    as_expr_attrs: ExprAttrs => ExprAttrs,
    as_expr_lambda: ExprLambda => ExprLambda,
    as_expr_select: ExprSelect => ExprSelect,
    as_expr_with: ExprWith => ExprWith,
    as_expr_let: ExprLet => ExprLet,
    as_attr_name: AttrName => AttrName,
    as_attr_path: AttrPath => AttrPath,
    as_binding: Binding => Binding,
    as_inherit: Inherit => Inherit,
    as_binds: Binds => Binds,
    as_formal: Formal => Formal,
    as_formals: Formals => Formals,
    as_lambda_arg: LambdaArg => LambdaArg,
    as_interpolation: Interpolation => Interpolation,
    as_interpolated_parts: InterpolatedParts => InterpolatedParts,
    as_identifier: Identifier => Identifier,
    as_dot: Dot => Dot,
}

impl NodeArena {
    /// Whether the attrname can be resolved without evaluation: an identifier
    /// or a string with one literal fragment.
    pub fn attr_name_is_static(&self, name: NodeId) -> bool {
        self.attr_name_static(name).is_some()
    }

    /// The static name, if [`Self::attr_name_is_static`].
    pub fn attr_name_static(&self, name: NodeId) -> Option<&str> {
        let an = self.get(name).as_attr_name()?;
        match an.form {
            AttrNameForm::Id(id) => self.get(id).as_identifier().map(|i| i.name.as_str()),
            AttrNameForm::String(s) => {
                let string = self.get(s).as_expr_string()?;
                self.get(string.parts).as_interpolated_parts()?.literal()
            }
            AttrNameForm::Interpolation(_) => None,
        }
    }
}
