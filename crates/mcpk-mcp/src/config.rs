//! Connection settings for MCP servers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

fn default_timeout() -> u64 {
    30000
}

/// A server launched as a local child process speaking MCP over stdio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdioServerConfig {
    /// Command to run (e.g., "npx", "python").
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables to set for the server process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Timeout for requests in milliseconds (default: 30000).
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Skip this server when registering a whole config.
    #[serde(default)]
    pub disabled: bool,
}

impl StdioServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout_ms: default_timeout(),
            disabled: false,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// A server reachable at a network endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteServerConfig {
    /// Base URL of the server.
    pub endpoint: String,
    /// Extra HTTP headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub disabled: bool,
}

/// All configured servers, keyed by server name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerMap {
    #[serde(default)]
    pub servers: BTreeMap<String, StdioServerConfig>,
    #[serde(default)]
    pub remote: BTreeMap<String, RemoteServerConfig>,
}

impl ServerMap {
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty() && self.remote.is_empty()
    }

    /// Stdio servers that are not disabled, in name order.
    pub fn enabled_stdio(&self) -> impl Iterator<Item = (&str, &StdioServerConfig)> {
        self.servers
            .iter()
            .filter(|(_, c)| !c.disabled)
            .map(|(name, c)| (name.as_str(), c))
    }

    /// Merge `other` into `self`; entries in `other` win on name clashes.
    pub fn merge(&mut self, other: ServerMap) {
        self.servers.extend(other.servers);
        self.remote.extend(other.remote);
    }
}
