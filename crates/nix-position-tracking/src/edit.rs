//! Plain text edits.
//!
//! A [`TextEdit`] replaces the byte range `old_range` with `new_text`.
//! Insertions have an empty range, removals an empty replacement.

use serde::{Deserialize, Serialize};

use crate::cursor::{LexerCursor, LexerCursorRange};

/// A single text replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub old_range: LexerCursorRange,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(old_range: LexerCursorRange, new_text: impl Into<String>) -> Self {
        let new_text = new_text.into();
        debug_assert!(!old_range.is_empty() || !new_text.is_empty());
        TextEdit { old_range, new_text }
    }

    /// An insertion at `loc`.
    pub fn insertion(loc: LexerCursor, new_text: impl Into<String>) -> Self {
        TextEdit::new(LexerCursorRange::empty(loc), new_text)
    }

    /// A removal of `range`.
    pub fn removal(range: LexerCursorRange) -> Self {
        TextEdit { old_range: range, new_text: String::new() }
    }

    pub fn is_insertion(&self) -> bool {
        self.old_range.is_empty()
    }

    pub fn is_removal(&self) -> bool {
        self.new_text.is_empty()
    }

    pub fn is_replace(&self) -> bool {
        !self.is_insertion() && !self.is_removal()
    }
}

/// Apply a batch of non-overlapping edits to `text`.
///
/// Edits are applied back-to-front so earlier offsets stay valid. Used by
/// tests and by refactoring actions that rewrite a region from its parts.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| e.old_range.begin.offset);
    let mut out = text.to_string();
    for edit in sorted.iter().rev() {
        let begin = edit.old_range.begin.offset.min(out.len());
        let end = edit.old_range.end.offset.min(out.len());
        out.replace_range(begin..end, &edit.new_text);
    }
    out
}
