//! The diagnostic kind table.
//!
//! Every diagnostic and note kind is declared here, in one place, together
//! with its severity, its short switch name and its message template.
//! Message templates use `{}` placeholders filled from the argument list.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic kind.
///
/// `Fatal` means the expression cannot be evaluated at all (parse errors),
/// `Error` would fail evaluation but analysis can continue, the rest are
/// advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Info,
    Hint,
}

macro_rules! diagnostic_kinds {
    ($( $variant:ident => ($sname:literal, $severity:ident, $message:literal), )*) => {
        /// Closed set of diagnostic kinds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum DiagnosticKind {
            $( $variant, )*
        }

        impl DiagnosticKind {
            /// Short switch name, e.g. for `-W`-style suppression lists.
            pub fn sname(self) -> &'static str {
                match self {
                    $( DiagnosticKind::$variant => $sname, )*
                }
            }

            /// Static severity of this kind.
            pub fn severity(self) -> Severity {
                match self {
                    $( DiagnosticKind::$variant => Severity::$severity, )*
                }
            }

            /// Message template with `{}` placeholders.
            pub fn message(self) -> &'static str {
                match self {
                    $( DiagnosticKind::$variant => $message, )*
                }
            }

            /// Reverse lookup from sname, used by the suppression set.
            pub fn from_sname(sname: &str) -> Option<Self> {
                match sname {
                    $( $sname => Some(DiagnosticKind::$variant), )*
                    _ => None,
                }
            }

            /// All declared kinds, in declaration order.
            pub fn all() -> &'static [DiagnosticKind] {
                &[ $( DiagnosticKind::$variant, )* ]
            }
        }
    };
}

diagnostic_kinds! {
    // ===== Lexer =====
    UnterminatedBComment => ("unterminated-bcomment", Error, "unterminated /* comment"),
    FloatNoExp => ("float-no-exp", Fatal, "float point has trailing `{}` but has no exponential part"),
    FloatLeadingZero => ("float-leading-zero", Warning, "float begins with extra zeros `{}` is nixf extension"),

    // ===== Parser =====
    Expected => ("expected", Fatal, "expected {}"),
    UnexpectedText => ("unexpected-text", Error, "unexpected text"),
    IntTooBig => ("int-too-big", Error, "this integer is too big for nix interpreter"),
    RedundantParen => ("redundant-paren", Warning, "redundant parentheses"),
    AttrPathExtraDot => ("attrpath-extra-dot", Error, "extra `.` at the end of attrpath"),
    SelectExtraDot => ("select-extra-dot", Error, "extra `.` after expression, but missing attrpath"),
    EmptyInherit => ("empty-inherit", Warning, "empty inherit expression"),
    OrIdentifier => ("or-identifier", Warning, "keyword `or` used as an identifier"),
    LambdaArgExtraAt => ("lambda-arg-extra-at", Error, "extra `@` for lambda arg"),

    // ===== Lowering =====
    DuplicatedAttrName => ("duplicated-attrname", Error, "duplicated attrname `{}`"),
    DynamicInherit => ("dynamic-inherit", Error, "dynamic attributes are not allowed in inherit"),
    MergeDiffRec => ("merge-diff-rec", Warning, "merging two attributes with different `rec` modifiers, the latter will be implicitly ignored"),
    FormalMisplacedEllipsis => ("formal-misplaced-ellipsis", Error, "misplaced `...`, it must be the last formal"),
    FormalExtraEllipsis => ("formal-extra-ellipsis", Error, "extra `...`"),
    FormalMissingComma => ("formal-missing-comma", Error, "missing seperator `,` between two lambda formals"),
    EmptyFormal => ("empty-formal", Error, "empty formal"),
    DuplicatedFormal => ("duplicated-formal", Error, "duplicated function formal `{}`"),
    DuplicatedFormalToArg => ("duplicated-formal-to-arg", Error, "function argument duplicated to a function formal"),

    // ===== Variable lookup =====
    UndefinedVariable => ("undefined-variable", Error, "undefined variable `{}`"),
    EscapingWith => ("escaping-with", Warning, "this variable comes from the scope outside of the `with` expression"),
    DefinitionNotUsed => ("definition-not-used", Warning, "definition `{}` is not used"),
    ExtraRecursive => ("extra-recursive", Warning, "attrset is not necessarily `rec`ursive"),
    ExtraWith => ("extra-with", Warning, "unused `with` expression"),
}

macro_rules! note_kinds {
    ($( $variant:ident => ($sname:literal, $message:literal), )*) => {
        /// Closed set of note kinds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum NoteKind {
            $( $variant, )*
        }

        impl NoteKind {
            pub fn sname(self) -> &'static str {
                match self {
                    $( NoteKind::$variant => $sname, )*
                }
            }

            pub fn message(self) -> &'static str {
                match self {
                    $( NoteKind::$variant => $message, )*
                }
            }
        }
    };
}

note_kinds! {
    ToMatchThis => ("to-match-this", "to match this {}"),
    PrevDeclared => ("prev-declared", "previously declared here"),
    DuplicateFormal => ("duplicate-formal", "duplicated to this formal"),
    BCommentBegin => ("bcomment-begin", "/* comment begins at here"),
    ThisRecursive => ("this-recursive", "this attribute set is {}recursive"),
    RecConsider => ("rec-consider", "while this attribute set is marked as {}recursive, it will be considered as {}recursive"),
    VarBindToThis => ("var-bind-to-this", "this variable is binded to here"),
    EscapingWith => ("escaping-with", "the `with` expression"),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sname_round_trip() {
        for kind in DiagnosticKind::all() {
            assert_eq!(DiagnosticKind::from_sname(kind.sname()), Some(*kind));
        }
    }

    #[test]
    fn snames_are_unique() {
        let mut seen = std::collections::BTreeSet::new();
        for kind in DiagnosticKind::all() {
            assert!(seen.insert(kind.sname()), "duplicate sname {}", kind.sname());
        }
    }

    #[test]
    fn severities() {
        assert_eq!(DiagnosticKind::Expected.severity(), Severity::Fatal);
        assert_eq!(DiagnosticKind::UndefinedVariable.severity(), Severity::Error);
        assert_eq!(DiagnosticKind::ExtraWith.severity(), Severity::Warning);
    }
}
