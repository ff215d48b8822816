//! Error types for MCP operations.

use mcpk_types::RemoteCallError;
use thiserror::Error;

/// Errors from MCP server communication.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn MCP server '{name}': {source}")]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },

    #[error("MCP server '{name}' is not running")]
    ServerNotRunning { name: String },

    #[error("JSON-RPC error from '{server}' (code {code}): {message}")]
    JsonRpc {
        server: String,
        code: i64,
        message: String,
    },

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("MCP request '{method}' to '{name}' timed out after {timeout_ms}ms")]
    Timeout {
        name: String,
        method: String,
        timeout_ms: u64,
    },

    #[error("MCP request '{method}' cancelled")]
    Cancelled { method: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Convert into the collaborator-level error the bridge understands.
    pub fn into_remote(self, server: &str) -> RemoteCallError {
        match self {
            McpError::Cancelled { .. } => RemoteCallError::Cancelled,
            McpError::Protocol(message) => RemoteCallError::MalformedResponse(message),
            McpError::Json(e) => RemoteCallError::MalformedResponse(e.to_string()),
            other => RemoteCallError::Transport {
                server: server.to_string(),
                message: other.to_string(),
            },
        }
    }
}
