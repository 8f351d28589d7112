//! Conversions between engine types and `lsp_types`.
//!
//! The engine measures everything in UTF-8 byte offsets; LSP speaks
//! `(line, UTF-16 column)`. All conversions go through the translation
//! unit's line index.

use lsp_types as lsp;
use nix_diagnostics::{Diagnostic, DiagnosticTag, Severity};
use nix_position_tracking::{LexerCursorRange, LineStartsCache, TextEdit};

use crate::state::NixTU;

pub fn to_lsp_position(line_starts: &LineStartsCache, text: &str, offset: usize) -> lsp::Position {
    let (line, character) = line_starts.offset_to_position(text, offset);
    lsp::Position { line, character }
}

pub fn to_lsp_range(
    line_starts: &LineStartsCache,
    text: &str,
    range: LexerCursorRange,
) -> lsp::Range {
    lsp::Range {
        start: to_lsp_position(line_starts, text, range.begin.offset),
        end: to_lsp_position(line_starts, text, range.end.offset),
    }
}

/// Byte offset for an LSP position; `None` when the line is out of range.
pub fn to_offset(tu: &NixTU, position: lsp::Position) -> Option<usize> {
    tu.line_starts()
        .position_to_offset(tu.src(), position.line, position.character)
        .ok()
}

pub fn tu_range(tu: &NixTU, range: LexerCursorRange) -> lsp::Range {
    to_lsp_range(tu.line_starts(), tu.src(), range)
}

pub fn to_lsp_text_edit(tu: &NixTU, edit: &TextEdit) -> lsp::TextEdit {
    lsp::TextEdit { range: tu_range(tu, edit.old_range), new_text: edit.new_text.clone() }
}

pub fn lsp_severity(severity: Severity) -> lsp::DiagnosticSeverity {
    match severity {
        Severity::Fatal | Severity::Error => lsp::DiagnosticSeverity::ERROR,
        Severity::Warning => lsp::DiagnosticSeverity::WARNING,
        Severity::Info => lsp::DiagnosticSeverity::INFORMATION,
        Severity::Hint => lsp::DiagnosticSeverity::HINT,
    }
}

pub fn lsp_tags(tags: &[DiagnosticTag]) -> Vec<lsp::DiagnosticTag> {
    tags.iter()
        .map(|tag| match tag {
            DiagnosticTag::Faded => lsp::DiagnosticTag::UNNECESSARY,
            DiagnosticTag::Striked => lsp::DiagnosticTag::DEPRECATED,
        })
        .collect()
}

/// Translate one engine diagnostic into LSP diagnostics: the main entry
/// with its notes as related information, then each note republished as a
/// hint pointing back at the original.
pub fn lsp_diagnostics(tu: &NixTU, uri: &lsp::Uri, diag: &Diagnostic) -> Vec<lsp::Diagnostic> {
    let mut message = diag.format();
    if !diag.fixes().is_empty() {
        if diag.fixes().len() == 1 {
            message.push_str(" (fix available)");
        } else {
            message.push_str(&format!(" ({} fixes available)", diag.fixes().len()));
        }
    }

    let range = tu_range(tu, diag.range());
    let related: Vec<lsp::DiagnosticRelatedInformation> = diag
        .notes()
        .iter()
        .map(|note| lsp::DiagnosticRelatedInformation {
            location: lsp::Location { uri: uri.clone(), range: tu_range(tu, note.range()) },
            message: note.format(),
        })
        .collect();

    let mut out = vec![lsp::Diagnostic {
        range,
        severity: Some(lsp_severity(diag.severity())),
        code: Some(lsp::NumberOrString::String(diag.sname().to_string())),
        source: Some("nix".to_string()),
        message,
        tags: Some(lsp_tags(diag.tags())),
        related_information: Some(related),
        ..Default::default()
    }];

    for note in diag.notes() {
        out.push(lsp::Diagnostic {
            range: tu_range(tu, note.range()),
            severity: Some(lsp::DiagnosticSeverity::HINT),
            code: Some(lsp::NumberOrString::String(note.sname().to_string())),
            source: Some("nix".to_string()),
            message: note.format(),
            related_information: Some(vec![lsp::DiagnosticRelatedInformation {
                location: lsp::Location { uri: uri.clone(), range },
                message: "original diagnostic".to_string(),
            }]),
            ..Default::default()
        });
    }
    out
}
