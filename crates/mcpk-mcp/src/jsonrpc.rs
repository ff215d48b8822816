//! JSON-RPC 2.0 types for MCP communication.

use crate::error::McpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Take the `result`, turning an `error` object into [`McpError::JsonRpc`].
    pub fn into_result(self, server: &str, method: &str) -> Result<Value, McpError> {
        if let Some(err) = self.error {
            return Err(McpError::JsonRpc {
                server: server.to_string(),
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| McpError::Protocol(format!("{method} response has neither result nor error")))
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_request_serializes_params() {
        let req = JsonRpcRequest::new(
            7,
            "tools/call",
            Some(json!({"name": "add", "arguments": {"a": 1, "b": 2}})),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert_eq!(json["params"]["arguments"]["b"], 2);
    }

    #[test]
    fn list_request_omits_params() {
        let json = serde_json::to_value(JsonRpcRequest::new(2, "tools/list", None)).unwrap();
        assert!(json.get("params").is_none());
    }

    #[test]
    fn into_result_returns_result() {
        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#).unwrap();
        let value = resp.into_result("everything", "tools/list").unwrap();
        assert!(value["tools"].as_array().unwrap().is_empty());
    }

    #[test]
    fn into_result_maps_error_object() {
        let resp: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        match resp.into_result("everything", "tools/call") {
            Err(McpError::JsonRpc {
                server,
                code,
                message,
            }) => {
                assert_eq!(server, "everything");
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("Expected JsonRpc error, got: {other:?}"),
        }
    }

    #[test]
    fn into_result_rejects_empty_response() {
        let resp: JsonRpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":3}"#).unwrap();
        assert!(matches!(
            resp.into_result("s", "tools/call"),
            Err(McpError::Protocol(_))
        ));
    }

    #[test]
    fn cancelled_notification_has_no_id() {
        let notif = JsonRpcNotification::new(
            "notifications/cancelled",
            Some(json!({"requestId": 4, "reason": "caller cancelled"})),
        );
        let json = serde_json::to_value(&notif).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["params"]["requestId"], 4);
    }
}
