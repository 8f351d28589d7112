//! JSON-RPC message types.
//!
//! Only the base protocol shapes live here; all LSP payloads come from
//! `lsp_types`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request or notification id. The protocol allows both numbers and
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// An incoming request or notification (no `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// An outgoing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        JsonRpcResponse { jsonrpc: "2.0".into(), id, result: Some(result), error: None }
    }

    pub fn failure(id: RequestId, error: JsonRpcError) -> Self {
        JsonRpcResponse { jsonrpc: "2.0".into(), id, result: None, error: Some(error) }
    }
}

/// Standard and LSP-specific error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const REQUEST_CANCELLED: i64 = -32800;
}

/// A response error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        JsonRpcError { code, message: message.into(), data: None }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        JsonRpcError::new(error_codes::INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        JsonRpcError::new(error_codes::INTERNAL_ERROR, message)
    }

    pub fn cancelled() -> Self {
        JsonRpcError::new(error_codes::REQUEST_CANCELLED, "request cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_round_trip() {
        let raw = r#"{"jsonrpc":"2.0","id":3,"method":"textDocument/hover","params":{}}"#;
        let req: JsonRpcRequest = serde_json::from_str(raw).unwrap_or_else(|_| panic!());
        assert_eq!(req.id, Some(RequestId::Number(3)));
        assert!(!req.is_notification());
    }

    #[test]
    fn notification_has_no_id() {
        let raw = r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#;
        let req: JsonRpcRequest = serde_json::from_str(raw).unwrap_or_else(|_| panic!());
        assert!(req.is_notification());
    }

    #[test]
    fn response_skips_empty_fields() {
        let resp =
            JsonRpcResponse::success(RequestId::Number(1), serde_json::Value::Null);
        let text = serde_json::to_string(&resp).unwrap_or_else(|_| panic!());
        assert!(!text.contains("error"));
    }
}
