//! MCP (Model Context Protocol) client used as mcpk's tool provider.
//!
//! Supports stdio-based MCP servers that communicate via newline-delimited
//! JSON-RPC 2.0 messages. Each server is spawned as a child process and
//! initialized with a handshake; [`McpClient`] then implements
//! [`mcpk_types::ToolProvider`] for the bridge.

pub mod client;
pub mod config;
pub mod error;
pub mod jsonrpc;
mod transport;

pub use client::McpClient;
pub use config::{RemoteServerConfig, ServerMap, StdioServerConfig};
pub use error::McpError;
