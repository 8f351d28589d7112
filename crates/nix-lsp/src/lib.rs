//! Nix Language Server runtime.
//!
//! The server is organized like its engine: a thin, synchronous I/O loop
//! reads framed JSON-RPC messages, notifications update the per-document
//! state, and requests are answered from the last completed analysis on a
//! bounded worker pool.
//!
//! - [`protocol`] — JSON-RPC message types
//! - [`transport`] — Content-Length framing over arbitrary readers/writers
//! - [`state`] — drafts, translation units, configuration
//! - [`server`] — dispatch loop, worker pool, cancellation
//! - [`convert`] — engine ⇄ LSP type conversions
//! - [`publish`] — version-ordered diagnostics publishing with suppression
//! - [`eval`] — the optional package-metadata collaborator
//! - [`features`] — one module per language feature
//!
//! The primary entry point is [`run_stdio`].

pub mod ast_util;
pub mod convert;
pub mod eval;
pub mod features;
pub mod protocol;
pub mod publish;
pub mod server;
pub mod state;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::LspServer;

/// Run the LSP server in stdio mode. Returns once the client disconnects;
/// transport-level failures surface as errors.
pub fn run_stdio() -> anyhow::Result<i32> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut server = LspServer::new(Box::new(stdout));
    server.run(&mut stdin.lock())
}
