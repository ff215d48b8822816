//! Remote tool types and the MCP client collaborator trait.

use crate::error::RemoteCallError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Arguments sent to a remote tool.
pub type ToolArguments = serde_json::Map<String, Value>;

/// A tool advertised by a remote server.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A content item in a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
    ResourceLink {
        uri: String,
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Result of calling a tool on a remote server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    /// Machine-readable companion payload, when the server supplies one.
    pub structured_content: Option<Value>,
    pub is_error: bool,
}

/// Client for one remote tool server.
///
/// Implementations must tolerate concurrent `call_tool` invocations; a
/// cancelled call must not disturb the connection or other calls.
pub trait ToolProvider: Send + Sync {
    /// Name of the server this client talks to.
    fn server_name(&self) -> &str;

    /// List the tools the server currently exposes.
    fn list_tools<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<ToolDescriptor>, RemoteCallError>>;

    /// Call a tool by its remote name.
    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: ToolArguments,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<ToolResult, RemoteCallError>>;

    /// Release the underlying connection. Calling this more than once is a no-op.
    fn dispose(&self) -> BoxFuture<'_, ()>;
}
