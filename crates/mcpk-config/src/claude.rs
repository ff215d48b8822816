//! Claude Desktop's `claude_desktop_config.json`.

use mcpk_mcp::{ServerMap, StdioServerConfig};
use mcpk_types::ConfigError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
struct ClaudeDesktopConfig {
    #[serde(default, rename = "mcpServers")]
    mcp_servers: BTreeMap<String, ClaudeServer>,
}

#[derive(Debug, Deserialize)]
struct ClaudeServer {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    disabled: bool,
}

/// Where Claude Desktop keeps its config on this platform, if a config
/// directory exists at all.
pub fn claude_desktop_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("Claude").join("claude_desktop_config.json"))
}

/// Read stdio servers from a Claude Desktop config file.
///
/// A missing file yields an empty map. Disabled servers are dropped.
pub fn load_claude_desktop(path: &Path) -> Result<ServerMap, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No Claude Desktop config at {}", path.display());
            return Ok(ServerMap::default());
        }
        Err(e) => {
            return Err(ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    parse_claude_desktop(&content).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}

/// Parse the JSON text of a Claude Desktop config.
pub fn parse_claude_desktop(content: &str) -> Result<ServerMap, ConfigError> {
    let config: ClaudeDesktopConfig =
        serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: "claude_desktop_config.json".into(),
            message: e.to_string(),
        })?;

    let mut map = ServerMap::default();
    for (name, server) in config.mcp_servers {
        if server.disabled {
            tracing::debug!("Skipping disabled Claude Desktop server '{name}'");
            continue;
        }
        let mut stdio = StdioServerConfig::new(server.command).with_args(server.args);
        stdio.env = server.env;
        map.servers.insert(name, stdio);
    }
    Ok(map)
}
