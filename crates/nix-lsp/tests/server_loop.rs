//! Server loop tests: lifecycle, diagnostics publishing, version ordering.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::io::Write;
use std::sync::Arc;

use nix_lsp::LspServer;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn frame(body: &str) -> String {
    format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
}

fn notification(method: &str, params: serde_json::Value) -> nix_lsp::JsonRpcRequest {
    serde_json::from_value(serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    }))
    .unwrap()
}

fn request(id: i64, method: &str, params: serde_json::Value) -> nix_lsp::JsonRpcRequest {
    serde_json::from_value(serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    }))
    .unwrap()
}

fn did_open(uri: &str, version: i64, text: &str) -> nix_lsp::JsonRpcRequest {
    notification(
        "textDocument/didOpen",
        serde_json::json!({
            "textDocument": {
                "uri": uri,
                "languageId": "nix",
                "version": version,
                "text": text,
            }
        }),
    )
}

#[test]
fn graceful_shutdown_exit_code() {
    let buf = SharedBuf::default();
    let mut server = LspServer::new(Box::new(buf.clone()));
    let input = [
        frame(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#),
        frame(r#"{"jsonrpc":"2.0","id":2,"method":"shutdown"}"#),
        frame(r#"{"jsonrpc":"2.0","method":"exit"}"#),
    ]
    .concat();
    let code = server.run(&mut input.as_bytes()).unwrap();
    assert_eq!(code, 0);
    assert!(buf.contents().contains("\"capabilities\""));
    assert!(buf.contents().contains("nix-lsp"));
}

#[test]
fn exit_without_shutdown_is_not_graceful() {
    let buf = SharedBuf::default();
    let mut server = LspServer::new(Box::new(buf.clone()));
    let input = frame(r#"{"jsonrpc":"2.0","method":"exit"}"#);
    let code = server.run(&mut input.as_bytes()).unwrap();
    assert_eq!(code, 1);
}

#[test]
fn did_open_publishes_diagnostics() {
    let buf = SharedBuf::default();
    let mut server = LspServer::new(Box::new(buf.clone()));
    server.handle_message(did_open(
        "file:///tmp/a.nix",
        1,
        "with whatEverUndefined; [ ]",
    ));
    drop(server); // joins the pool, flushing pending analyses
    let out = buf.contents();
    assert!(out.contains("textDocument/publishDiagnostics"));
    assert!(out.contains("undefined-variable"));
    assert!(out.contains("extra-with"));
}

#[test]
fn incremental_change_reanalyzes() {
    let buf = SharedBuf::default();
    let mut server = LspServer::new(Box::new(buf.clone()));
    server.handle_message(did_open("file:///tmp/b.nix", 1, "let a = 1; in a"));
    server.handle_message(notification(
        "textDocument/didChange",
        serde_json::json!({
            "textDocument": { "uri": "file:///tmp/b.nix", "version": 2 },
            "contentChanges": [{
                "range": {
                    "start": { "line": 0, "character": 14 },
                    "end": { "line": 0, "character": 15 },
                },
                "text": "b",
            }],
        }),
    ));
    server.handle_message(request(
        5,
        "textDocument/documentSymbol",
        serde_json::json!({ "textDocument": { "uri": "file:///tmp/b.nix" } }),
    ));
    drop(server);
    let out = buf.contents();
    // The edited document refers to `b` now, which is undefined.
    assert!(out.contains("undefined-variable"));
}

#[test]
fn suppression_set_from_configuration() {
    let buf = SharedBuf::default();
    let mut server = LspServer::new(Box::new(buf.clone()));
    server.handle_message(notification(
        "workspace/didChangeConfiguration",
        serde_json::json!({
            "settings": {
                "nix": { "diagnostic": { "suppress": ["extra-with"] } }
            }
        }),
    ));
    server.handle_message(did_open(
        "file:///tmp/c.nix",
        1,
        "with whatEverUndefined; [ ]",
    ));
    drop(server);
    let out = buf.contents();
    assert!(out.contains("undefined-variable"));
    assert!(!out.contains("extra-with"));
}

#[test]
fn directive_comment_suppresses_next_line() {
    let buf = SharedBuf::default();
    let mut server = LspServer::new(Box::new(buf.clone()));
    server.handle_message(did_open(
        "file:///tmp/d.nix",
        1,
        "# nixf-ignore:undefined-variable\n[ nope ]",
    ));
    drop(server);
    let out = buf.contents();
    assert!(out.contains("textDocument/publishDiagnostics"));
    assert!(!out.contains("undefined-variable"));
}

#[test]
fn unknown_method_gets_an_error() {
    let buf = SharedBuf::default();
    let mut server = LspServer::new(Box::new(buf.clone()));
    server.handle_message(request(9, "textDocument/typeDefinition", serde_json::json!({})));
    drop(server);
    assert!(buf.contents().contains("-32601"));
}

#[test]
fn hover_request_round_trip() {
    let buf = SharedBuf::default();
    let mut server = LspServer::new(Box::new(buf.clone()));
    server.handle_message(did_open("file:///tmp/e.nix", 1, "let x = 1; in x"));
    // Let the analysis land before asking; requests and analyses share the
    // pool, so a later job sees the TU.
    std::thread::sleep(std::time::Duration::from_millis(100));
    server.handle_message(request(
        11,
        "textDocument/hover",
        serde_json::json!({
            "textDocument": { "uri": "file:///tmp/e.nix" },
            "position": { "line": 0, "character": 14 },
        }),
    ));
    drop(server);
    assert!(buf.contents().contains("ExprVar"));
}
