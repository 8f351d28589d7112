//! Structured diagnostics for the Nix toolkit.
//!
//! Diagnostics never abort processing: every phase (lexer, parser, lowering,
//! variable lookup) runs to completion and accumulates [`Diagnostic`] values.
//! A diagnostic has a closed [`DiagnosticKind`] with a static severity, a
//! short switch name (`sname`) used for suppression, a message template with
//! positional arguments, ordered [`Note`]s, [`Fix`]es and presentation tags.

pub mod kinds;

use nix_position_tracking::{LexerCursorRange, TextEdit};
use serde::{Deserialize, Serialize};

pub use kinds::{DiagnosticKind, NoteKind, Severity};

/// Presentation tags carried by a diagnostic.
///
/// `Faded` marks unnecessary code, `Striked` marks text that should be
/// deleted; the LSP layer maps these onto `Unnecessary`/`Deprecated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticTag {
    Faded,
    Striked,
}

/// Fix-it hint: a human message plus one or more text edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    message: String,
    edits: Vec<TextEdit>,
}

impl Fix {
    pub fn new(message: impl Into<String>) -> Self {
        Fix { message: message.into(), edits: Vec::new() }
    }

    pub fn edit(mut self, edit: TextEdit) -> Self {
        self.edits.push(edit);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }
}

/// Additional information attached to a diagnostic, with its own location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    kind: NoteKind,
    range: LexerCursorRange,
    args: Vec<String>,
}

impl Note {
    pub fn new(kind: NoteKind, range: LexerCursorRange) -> Self {
        Note { kind, range, args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn kind(&self) -> NoteKind {
        self.kind
    }

    pub fn range(&self) -> LexerCursorRange {
        self.range
    }

    pub fn sname(&self) -> &'static str {
        self.kind.sname()
    }

    /// Format the note message, substituting `{}` placeholders in order.
    pub fn format(&self) -> String {
        format_message(self.kind.message(), &self.args)
    }
}

/// A single diagnostic produced by the lexer, parser or an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    kind: DiagnosticKind,
    range: LexerCursorRange,
    args: Vec<String>,
    notes: Vec<Note>,
    fixes: Vec<Fix>,
    tags: Vec<DiagnosticTag>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, range: LexerCursorRange) -> Self {
        Diagnostic { kind, range, args: Vec::new(), notes: Vec::new(), fixes: Vec::new(), tags: Vec::new() }
    }

    /// Append a message argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Attach a note.
    pub fn note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }

    /// Attach a fix.
    pub fn fix(mut self, fix: Fix) -> Self {
        self.fixes.push(fix);
        self
    }

    /// Attach a presentation tag.
    pub fn tag(mut self, tag: DiagnosticTag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    pub fn range(&self) -> LexerCursorRange {
        self.range
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Short switch name; used for suppression lists and LSP codes.
    pub fn sname(&self) -> &'static str {
        self.kind.sname()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut Vec<Note> {
        &mut self.notes
    }

    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    pub fn fixes_mut(&mut self) -> &mut Vec<Fix> {
        &mut self.fixes
    }

    pub fn tags(&self) -> &[DiagnosticTag] {
        &self.tags
    }

    /// Format the diagnostic message, substituting `{}` placeholders in
    /// order.
    pub fn format(&self) -> String {
        format_message(self.kind.message(), &self.args)
    }
}

/// Substitute `{}` placeholders with arguments, in order. Extra placeholders
/// stay verbatim so a malformed table entry never hides the message.
fn format_message(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut args = args.iter();
    while let Some(idx) = rest.find("{}") {
        out.push_str(&rest[..idx]);
        match args.next() {
            Some(a) => out.push_str(a),
            None => out.push_str("{}"),
        }
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix_position_tracking::LexerCursor;
    use pretty_assertions::assert_eq;

    fn some_range() -> LexerCursorRange {
        LexerCursorRange::new(LexerCursor::at(0, 0, 0), LexerCursor::at(0, 3, 3))
    }

    #[test]
    fn message_formatting() {
        let d = Diagnostic::new(DiagnosticKind::UndefinedVariable, some_range()).arg("foo");
        assert_eq!(d.format(), "undefined variable `foo`");
        assert_eq!(d.sname(), "undefined-variable");
        assert_eq!(d.severity(), Severity::Error);
    }

    #[test]
    fn missing_args_keep_placeholder() {
        let d = Diagnostic::new(DiagnosticKind::Expected, some_range());
        assert_eq!(d.format(), "expected {}");
    }

    #[test]
    fn notes_and_fixes_accumulate() {
        let d = Diagnostic::new(DiagnosticKind::DuplicatedAttrName, some_range())
            .arg("a")
            .note(Note::new(NoteKind::PrevDeclared, some_range()))
            .fix(Fix::new("remove this attribute")
                .edit(TextEdit::removal(some_range())));
        assert_eq!(d.notes().len(), 1);
        assert_eq!(d.fixes().len(), 1);
        assert_eq!(d.notes()[0].format(), "previously declared here");
    }
}
