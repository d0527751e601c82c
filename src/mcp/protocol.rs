// src/mcp/protocol.rs

//! JSON-RPC 2.0 framing for the MCP transport. Tool-level failures are NOT
//! JSON-RPC errors: they travel as the tagged `{ok:false, ...}` result shape
//! so the client sees them verbatim. The error object here is reserved for
//! protocol-level problems (bad params, unknown method, parse failures).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(ErrorObject {
                code,
                message,
                data: None,
            }),
        }
    }

    pub fn method_not_found(id: Value, method: &str) -> Self {
        Self::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(id: Value, message: impl Into<String>) -> Self {
        Self::error(id, error_codes::INVALID_PARAMS, message.into())
    }
}

// Standard JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_without_id_are_notifications() {
        let req: Request =
            serde_json::from_str(r#"{"method":"notifications/initialized"}"#).unwrap();
        assert!(req.is_notification());
        let req: Request =
            serde_json::from_str(r#"{"id":7,"method":"tools/list"}"#).unwrap();
        assert!(!req.is_notification());
    }

    #[test]
    fn responses_serialize_one_of_result_or_error() {
        let ok = Response::success(json!(1), json!({"ok": true}));
        let v = serde_json::to_value(&ok).unwrap();
        assert!(v.get("error").is_none());
        assert_eq!(v["result"]["ok"], true);

        let err = Response::method_not_found(json!(1), "nope");
        let v = serde_json::to_value(&err).unwrap();
        assert!(v.get("result").is_none());
        assert_eq!(v["error"]["code"], error_codes::METHOD_NOT_FOUND);
    }
}
