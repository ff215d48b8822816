//! MCP client: manages one server connection.
//!
//! Handles the MCP protocol handshake (initialize + initialized notification),
//! tool discovery (tools/list), and tool invocation (tools/call).

use crate::config::StdioServerConfig;
use crate::error::McpError;
use crate::transport::StdioTransport;
use mcpk_types::{
    BoxFuture, ContentBlock, RemoteCallError, ToolArguments, ToolDescriptor, ToolProvider,
    ToolResult,
};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// MCP protocol version we support.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Upper bound on `tools/list` pages, in case a server keeps returning cursors.
const MAX_LIST_PAGES: usize = 100;

/// Client for a single MCP server.
pub struct McpClient {
    name: String,
    transport: StdioTransport,
}

#[derive(Deserialize)]
struct ToolsListResult {
    tools: Vec<ToolEntry>,
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_schema", rename = "inputSchema")]
    input_schema: Value,
}

fn default_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

#[derive(Deserialize)]
struct ToolCallResult {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default, rename = "structuredContent")]
    structured_content: Option<Value>,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

impl McpClient {
    /// Connect to an MCP server: spawn the process and run the handshake.
    pub async fn connect(
        name: impl Into<String>,
        config: &StdioServerConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, McpError> {
        let name = name.into();
        let transport = StdioTransport::spawn(
            &name,
            &config.command,
            &config.args,
            &config.env,
            config.timeout_ms,
        )?;
        let client = Self { name, transport };

        if let Err(e) = client.initialize(cancel).await {
            client.transport.shutdown().await;
            return Err(e);
        }

        tracing::info!("MCP server '{}' connected", client.name);
        Ok(client)
    }

    async fn initialize(&self, cancel: &CancellationToken) -> Result<(), McpError> {
        let init_params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": format!("{} StdioClient", self.name),
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        self.transport
            .send_request("initialize", Some(init_params), cancel)
            .await?
            .into_result(&self.name, "initialize")?;

        self.transport
            .send_notification("notifications/initialized", None)
            .await
    }

    /// Fetch every tool the server exposes, following pagination cursors.
    pub async fn fetch_tools(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor
                .take()
                .map(|c| serde_json::json!({ "cursor": c }));
            let result = self
                .transport
                .send_request("tools/list", params, cancel)
                .await?
                .into_result(&self.name, "tools/list")?;

            let page: ToolsListResult = serde_json::from_value(result).map_err(|e| {
                McpError::Protocol(format!("Failed to parse tools/list response: {e}"))
            })?;

            tools.extend(page.tools.into_iter().map(|t| ToolDescriptor {
                name: t.name,
                description: t.description.unwrap_or_default(),
                input_schema: t.input_schema,
            }));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        if let Some(pending) = cursor {
            tracing::warn!(
                "MCP server '{}' still had tools after {MAX_LIST_PAGES} pages (next cursor '{pending}'); keeping the first {}",
                self.name,
                tools.len()
            );
        }

        tracing::debug!("MCP server '{}' lists {} tools", self.name, tools.len());
        Ok(tools)
    }

    /// Call a tool on this server.
    pub async fn invoke_tool(
        &self,
        tool_name: &str,
        arguments: ToolArguments,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, McpError> {
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });

        let result = self
            .transport
            .send_request("tools/call", Some(params), cancel)
            .await?
            .into_result(&self.name, "tools/call")?;

        let call_result: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("Failed to parse tools/call result: {e}")))?;

        Ok(ToolResult {
            content: call_result.content,
            structured_content: call_result.structured_content,
            is_error: call_result.is_error,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shut down the server connection. Repeated calls are no-ops.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

impl ToolProvider for McpClient {
    fn server_name(&self) -> &str {
        &self.name
    }

    fn list_tools<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<ToolDescriptor>, RemoteCallError>> {
        Box::pin(async move {
            self.fetch_tools(cancel)
                .await
                .map_err(|e| e.into_remote(&self.name))
        })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: ToolArguments,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<ToolResult, RemoteCallError>> {
        Box::pin(async move {
            self.invoke_tool(name, arguments, cancel)
                .await
                .map_err(|e| e.into_remote(&self.name))
        })
    }

    fn dispose(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.shutdown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_entry_defaults() {
        let entry: ToolEntry = serde_json::from_str(r#"{"name": "list"}"#).unwrap();
        assert_eq!(entry.name, "list");
        assert!(entry.description.is_none());
        assert_eq!(entry.input_schema["type"], "object");
    }

    #[test]
    fn tools_list_page_with_cursor() {
        let json = r#"{
            "tools": [
                {"name": "add", "description": "Adds two numbers", "inputSchema": {
                    "type": "object",
                    "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                    "required": ["a", "b"]
                }},
                {"name": "echo", "inputSchema": {"type": "object"}}
            ],
            "nextCursor": "page-2"
        }"#;
        let page: ToolsListResult = serde_json::from_str(json).unwrap();
        assert_eq!(page.tools.len(), 2);
        assert_eq!(page.next_cursor.as_deref(), Some("page-2"));
        assert_eq!(page.tools[0].input_schema["required"][1], "b");
    }

    #[test]
    fn call_result_with_structured_content() {
        let json = r#"{
            "content": [{"type": "text", "text": "{\"sum\":3}"}],
            "structuredContent": {"sum": 3}
        }"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.structured_content.unwrap()["sum"], 3);
    }

    #[test]
    fn call_result_error_flag() {
        let json = r#"{"content": [{"type": "text", "text": "not found"}], "isError": true}"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(result.is_error);
        assert_eq!(
            result.content[0],
            ContentBlock::Text {
                text: "not found".into()
            }
        );
    }

    #[test]
    fn mcp_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<McpClient>();
    }

    #[tokio::test]
    async fn connect_to_missing_command_fails() {
        let config = StdioServerConfig::new("nonexistent_command_xyz123");
        let cancel = CancellationToken::new();
        let result = McpClient::connect("bad", &config, &cancel).await;
        assert!(matches!(result, Err(McpError::SpawnFailed { .. })));
    }

    /// Answers every request with one tool and a cursor that never runs out.
    const ENDLESS_PAGES: &str = r#"while read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  [ -n "$id" ] && printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"t%s"}],"nextCursor":"more"}}\n' "$id" "$id"
done"#;

    #[tokio::test]
    async fn endless_cursor_stops_at_page_limit() {
        let config = StdioServerConfig::new("sh").with_args(["-c", ENDLESS_PAGES]);
        let cancel = CancellationToken::new();
        let client = McpClient::connect("endless", &config, &cancel).await.unwrap();

        let tools = client.fetch_tools(&cancel).await.unwrap();
        assert_eq!(tools.len(), MAX_LIST_PAGES);
        assert_eq!(tools[0].name, "t2");
        assert_eq!(tools[MAX_LIST_PAGES - 1].name, format!("t{}", MAX_LIST_PAGES + 1));

        client.transport.shutdown().await;
    }
}
