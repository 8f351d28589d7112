//! Document and server state.
//!
//! A draft is the rope-backed text of one open document; a [`NixTU`] is the
//! immutable analysis of one draft version. Drafts are updated in message
//! order; TUs replace each other atomically under the store lock.

use nix_diagnostics::Diagnostic;
use nix_parser::ParseResult;
use nix_position_tracking::LineStartsCache;
use nix_sema::{ParentMapAnalysis, VariableLookupAnalysis};
use serde::Deserialize;
use thiserror::Error;

/// Failure while applying an incremental change. The draft is dropped when
/// this happens; further requests for the document fail until the next
/// `didOpen` or a full-document change.
#[derive(Debug, Error)]
pub enum ChangeError {
    #[error("change start {0} is out of range")]
    StartOutOfRange(u32),
    #[error("change end {0} is out of range")]
    EndOutOfRange(u32),
    #[error("change range is inverted")]
    InvertedRange,
}

/// Rope-backed document content with a cached string and line index.
///
/// The rope gives O(log n) incremental edits; the cached string feeds the
/// parser and all byte-offset based analyses.
#[derive(Clone)]
pub struct DocumentState {
    pub rope: ropey::Rope,
    pub text: String,
    pub version: Option<i64>,
    pub line_starts: LineStartsCache,
}

impl DocumentState {
    pub fn new(content: &str, version: Option<i64>) -> Self {
        DocumentState {
            rope: ropey::Rope::from_str(content),
            text: content.to_string(),
            version,
            line_starts: LineStartsCache::new(content),
        }
    }

    /// Apply one LSP content change. A change without a range replaces the
    /// whole document.
    ///
    /// Positions are `(line, UTF-16 column)`. Columns beyond the end of a
    /// line snap to the line end; a line beyond the document fails the whole
    /// change — with one exception: some editors address "end of file" as
    /// the first column of the line after the last one even when the file
    /// lacks a trailing newline. That position gets a synthesized newline.
    pub fn apply_change(
        &mut self,
        range: Option<lsp_types::Range>,
        new_text: &str,
        version: Option<i64>,
    ) -> Result<(), ChangeError> {
        let Some(range) = range else {
            *self = DocumentState::new(new_text, version);
            return Ok(());
        };

        for pos in [range.start, range.end] {
            if pos.line == self.line_starts.line_count()
                && pos.character == 0
                && !self.text.ends_with('\n')
            {
                self.splice(self.text.len(), self.text.len(), "\n");
            }
        }

        let start = self
            .line_starts
            .position_to_offset(&self.text, range.start.line, range.start.character)
            .map_err(|_| ChangeError::StartOutOfRange(range.start.line))?;
        let end = self
            .line_starts
            .position_to_offset(&self.text, range.end.line, range.end.character)
            .map_err(|_| ChangeError::EndOutOfRange(range.end.line))?;
        if start > end {
            return Err(ChangeError::InvertedRange);
        }
        self.splice(start, end, new_text);
        self.version = version;
        Ok(())
    }

    fn splice(&mut self, start: usize, end: usize, new_text: &str) {
        let start_char = self.rope.byte_to_char(start);
        let end_char = self.rope.byte_to_char(end);
        if start_char < end_char {
            self.rope.remove(start_char..end_char);
        }
        if !new_text.is_empty() {
            self.rope.insert(start_char, new_text);
        }
        self.text = self.rope.to_string();
        self.line_starts = LineStartsCache::new(&self.text);
    }
}

/// Everything the server knows about one document at one version.
///
/// TU stands for "Translation Unit". Analyses are computed eagerly once and
/// never mutated afterwards.
pub struct NixTU {
    src: String,
    version: Option<i64>,
    diagnostics: Vec<Diagnostic>,
    parse: ParseResult,
    parent_map: Option<ParentMapAnalysis>,
    variable_lookup: Option<VariableLookupAnalysis>,
    line_starts: LineStartsCache,
}

impl NixTU {
    /// Run the whole pipeline: parse, lower, parent map, variable lookup.
    pub fn analyze(src: String, version: Option<i64>) -> Self {
        let mut diagnostics = Vec::new();
        let parse = nix_parser::parse(&src, &mut diagnostics);
        let (parent_map, variable_lookup) = match parse.root {
            Some(root) => {
                let pm = ParentMapAnalysis::run(&parse.arena, root);
                let vla = VariableLookupAnalysis::run(
                    &parse.arena,
                    &parse.sema,
                    root,
                    &mut diagnostics,
                );
                (Some(pm), Some(vla))
            }
            None => (None, None),
        };
        let line_starts = LineStartsCache::new(&src);
        NixTU { src, version, diagnostics, parse, parent_map, variable_lookup, line_starts }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn parse(&self) -> &ParseResult {
        &self.parse
    }

    pub fn root(&self) -> Option<nix_ast::NodeId> {
        self.parse.root
    }

    pub fn parent_map(&self) -> Option<&ParentMapAnalysis> {
        self.parent_map.as_ref()
    }

    pub fn variable_lookup(&self) -> Option<&VariableLookupAnalysis> {
        self.variable_lookup.as_ref()
    }

    pub fn line_starts(&self) -> &LineStartsCache {
        &self.line_starts
    }
}

/// Configuration honored by the core, delivered via
/// `workspace/didChangeConfiguration`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub diagnostic: DiagnosticConfig,
    pub inlay_hints: InlayHintsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    /// Diagnostic snames to suppress.
    pub suppress: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InlayHintsConfig {
    pub enable: bool,
}

impl Default for InlayHintsConfig {
    fn default() -> Self {
        InlayHintsConfig { enable: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> lsp_types::Range {
        lsp_types::Range {
            start: lsp_types::Position { line: sl, character: sc },
            end: lsp_types::Position { line: el, character: ec },
        }
    }

    #[test]
    fn incremental_edits_match_full_replacement() {
        let mut doc = DocumentState::new("let a = 1; in a", Some(1));
        doc.apply_change(Some(range(0, 4, 0, 5)), "b", Some(2))
            .unwrap_or_else(|_| panic!());
        doc.apply_change(Some(range(0, 14, 0, 15)), "b", Some(3))
            .unwrap_or_else(|_| panic!());
        assert_eq!(doc.text, "let b = 1; in b");

        let mut full = DocumentState::new("let a = 1; in a", Some(1));
        full.apply_change(None, "let b = 1; in b", Some(3))
            .unwrap_or_else(|_| panic!());
        assert_eq!(doc.text, full.text);
    }

    #[test]
    fn multiline_edit() {
        let mut doc = DocumentState::new("{\n  a = 1;\n}\n", Some(1));
        doc.apply_change(Some(range(1, 2, 1, 8)), "b = 2;", Some(2))
            .unwrap_or_else(|_| panic!());
        assert_eq!(doc.text, "{\n  b = 2;\n}\n");
    }

    #[test]
    fn utf16_columns_in_edits() {
        // '😀' is two UTF-16 code units.
        let mut doc = DocumentState::new("\"😀x\"", Some(1));
        doc.apply_change(Some(range(0, 3, 0, 4)), "y", Some(2))
            .unwrap_or_else(|_| panic!());
        assert_eq!(doc.text, "\"😀y\"");
    }

    #[test]
    fn eof_quirk_synthesizes_newline() {
        let mut doc = DocumentState::new("a = 1;", Some(1));
        doc.apply_change(Some(range(1, 0, 1, 0)), "b = 2;", Some(2))
            .unwrap_or_else(|_| panic!());
        assert_eq!(doc.text, "a = 1;\nb = 2;");
    }

    #[test]
    fn line_out_of_range_fails_the_change() {
        let mut doc = DocumentState::new("a\n", Some(1));
        assert!(doc.apply_change(Some(range(9, 0, 9, 1)), "x", Some(2)).is_err());
    }

    #[test]
    fn analyze_builds_all_tables() {
        let tu = NixTU::analyze("let a = 1; in a".into(), Some(1));
        assert!(tu.root().is_some());
        assert!(tu.parent_map().is_some());
        assert!(tu.variable_lookup().is_some());
        assert_eq!(tu.diagnostics().len(), 0);
    }

    #[test]
    fn config_parses_from_settings() {
        let value = serde_json::json!({
            "diagnostic": { "suppress": ["sema-extra-with"] },
            "inlayHints": { "enable": false },
        });
        let config: ServerConfig =
            serde_json::from_value(value).unwrap_or_else(|_| panic!());
        assert_eq!(config.diagnostic.suppress, vec!["sema-extra-with"]);
        assert!(!config.inlay_hints.enable);
    }
}
