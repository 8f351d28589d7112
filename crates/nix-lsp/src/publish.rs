//! Version-ordered diagnostics publishing.
//!
//! Diagnostics for version V are never published after version V+1 for the
//! same document: the publisher tracks the last published version per URI
//! and drops stale sets. A suppression list (diagnostic snames from the
//! configuration) and in-source directive comments are applied before
//! translation.

use std::io::Write;

use lsp_types as lsp;
use nix_diagnostics::{Diagnostic, DiagnosticKind};
use nix_token::CommentDirective;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::convert;
use crate::state::NixTU;
use crate::transport;

/// Build the suppression set from configured snames; unknown names are
/// logged and ignored.
pub fn suppression_set(snames: &[String]) -> FxHashSet<DiagnosticKind> {
    let mut set = FxHashSet::default();
    for name in snames {
        match DiagnosticKind::from_sname(name) {
            Some(kind) => {
                set.insert(kind);
            }
            None => warn!(sname = %name, "unknown diagnostic sname in suppression list"),
        }
    }
    set
}

/// Whether `diag` is silenced by a `nixf-ignore:`/`nixf-disable:` comment.
///
/// `nixf-disable:<sname>` works document-wide; `nixf-ignore:<sname>` only
/// silences diagnostics starting on the comment's own line or the line
/// right below it.
fn suppressed_by_directive(tu: &NixTU, diag: &Diagnostic) -> bool {
    let src = tu.src();
    for comment in &tu.parse().comments {
        match comment.directive(src) {
            Some(CommentDirective::Disable(sname)) => {
                if sname == diag.sname() {
                    return true;
                }
            }
            Some(CommentDirective::Ignore(sname)) => {
                if sname != diag.sname() {
                    continue;
                }
                let comment_line = comment.range.end.line;
                let diag_line = diag.range().begin.line;
                if diag_line == comment_line || diag_line == comment_line + 1 {
                    return true;
                }
            }
            None => {}
        }
    }
    false
}

/// Tracks the last published diagnostics version per URI.
#[derive(Default)]
pub struct DiagnosticPublisher {
    last_version: Mutex<FxHashMap<String, i64>>,
}

impl DiagnosticPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate, filter and publish the TU's diagnostics. Returns false
    /// when the set was dropped as stale.
    pub fn publish<W: Write>(
        &self,
        out: &Mutex<W>,
        uri: &lsp::Uri,
        tu: &NixTU,
        suppressed: &FxHashSet<DiagnosticKind>,
    ) -> std::io::Result<bool> {
        {
            let mut last = self.last_version.lock();
            let entry = last.entry(uri.as_str().to_string()).or_insert(i64::MIN);
            let version = tu.version().unwrap_or(i64::MIN);
            if version < *entry {
                return Ok(false);
            }
            *entry = version;
        }

        let mut diags = Vec::new();
        for diag in tu.diagnostics() {
            if suppressed.contains(&diag.kind()) || suppressed_by_directive(tu, diag) {
                continue;
            }
            diags.extend(convert::lsp_diagnostics(tu, uri, diag));
        }

        let params = lsp::PublishDiagnosticsParams {
            uri: uri.clone(),
            diagnostics: diags,
            version: tu.version().map(|v| v as i32),
        };
        transport::write_notification(
            &mut *out.lock(),
            "textDocument/publishDiagnostics",
            serde_json::to_value(params).map_err(std::io::Error::other)?,
        )?;
        Ok(true)
    }

    /// Clear state for a closed document so a reopened file publishes from
    /// scratch.
    pub fn forget(&self, uri: &lsp::Uri) {
        self.last_version.lock().remove(uri.as_str());
    }
}
