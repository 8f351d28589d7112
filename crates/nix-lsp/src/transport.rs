//! Message framing for the LSP base protocol.
//!
//! Implements Content-Length based framing. Reading is serialized on the
//! I/O thread; writing goes through a mutex so pool workers can reply
//! concurrently.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Read one LSP message from a buffered reader.
///
/// Returns `Ok(None)` on EOF. A frame that parses as JSON but not as a
/// request is a transport-level failure and surfaces as an error.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<JsonRpcRequest>> {
    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None); // EOF
        }
        let line = line.trim_end();
        if line.is_empty() {
            break; // End of headers
        }
        if let Some((key, value)) = line.split_once(": ") {
            headers.insert(key.to_string(), value.to_string());
        }
    }

    let length: usize = headers
        .get("Content-Length")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing Content-Length"))?;

    let mut content = vec![0u8; length];
    reader.read_exact(&mut content)?;

    let request = serde_json::from_slice(&content)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("malformed frame: {e}")))?;
    Ok(Some(request))
}

/// Write an LSP response with proper framing.
pub fn write_message<W: Write>(writer: &mut W, response: &JsonRpcResponse) -> io::Result<()> {
    let content = serde_json::to_string(response)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", content.len(), content)?;
    writer.flush()
}

/// Write an LSP notification with proper framing.
pub fn write_notification<W: Write>(
    writer: &mut W,
    method: &str,
    params: serde_json::Value,
) -> io::Result<()> {
    let notification = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    });
    let content = serde_json::to_string(&notification)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", content.len(), content)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;
    use pretty_assertions::assert_eq;

    #[test]
    fn frame_round_trip() {
        let mut buf = Vec::new();
        let resp = JsonRpcResponse::success(RequestId::Number(7), serde_json::json!({"ok": true}));
        write_message(&mut buf, &resp).unwrap_or_else(|_| panic!());
        let text = String::from_utf8(buf.clone()).unwrap_or_else(|_| panic!());
        assert!(text.starts_with("Content-Length: "));

        // Frame a request the same way and read it back.
        let body = r#"{"jsonrpc":"2.0","id":7,"method":"shutdown"}"#;
        let framed = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let mut reader = io::BufReader::new(framed.as_bytes());
        let req = read_message(&mut reader).unwrap_or_else(|_| panic!());
        let req = req.unwrap_or_else(|| panic!());
        assert_eq!(req.method, "shutdown");
    }

    #[test]
    fn eof_returns_none() {
        let mut reader = io::BufReader::new(&b""[..]);
        assert!(read_message(&mut reader).unwrap_or_else(|_| panic!()).is_none());
    }
}
