//! The bridge service: connects MCP servers and registers their tools.

use crate::cache::{Registration, RegistrationCache};
use crate::function::McpFunction;
use crate::normalize::normalize_server_key;
use futures_util::future::join_all;
use mcpk_config::{
    BridgeSettings, VsCodeInstance, claude_desktop_config_path, load_claude_desktop, load_vscode,
    vscode_settings_path,
};
use mcpk_mcp::{McpClient, ServerMap, StdioServerConfig};
use mcpk_types::{
    BridgeError, ConfigError, FunctionHandle, FunctionRegistry, KernelFunction, RegistryError,
    ToolProvider,
};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of registering each server from a config source, keyed by server name.
pub type ServerOutcomes = BTreeMap<String, Result<Vec<FunctionHandle>, BridgeError>>;

/// Registers MCP server tools into a host registry, at most once per server.
pub struct McpBridge {
    registry: Arc<dyn FunctionRegistry>,
    cache: RegistrationCache,
    settings: BridgeSettings,
    shutdown: CancellationToken,
}

impl McpBridge {
    pub fn new(registry: Arc<dyn FunctionRegistry>, settings: BridgeSettings) -> Self {
        Self {
            registry,
            cache: RegistrationCache::new(),
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Normalized keys of every server registered so far.
    pub fn server_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .cache
            .registrations()
            .iter()
            .map(|r| r.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Register every tool `client` exposes under the normalized `server_key`.
    ///
    /// A key that is already registered returns the cached handles without
    /// listing tools again; the passed client then stays with the caller.
    /// Cancelling `lifetime` disposes the client of the registration that
    /// actually took place, exactly once.
    pub async fn register_server_tools(
        &self,
        server_key: &str,
        client: Arc<dyn ToolProvider>,
        lifetime: &CancellationToken,
    ) -> Result<Vec<FunctionHandle>, BridgeError> {
        self.register_with(server_key, lifetime, false, || async move {
            Ok::<_, BridgeError>(client)
        })
        .await
    }

    /// Spawn a stdio MCP server and register its tools.
    ///
    /// The cache is consulted before spawning, so a name registered earlier
    /// never starts a second process.
    pub async fn add_stdio_server(
        &self,
        name: &str,
        config: &StdioServerConfig,
        lifetime: &CancellationToken,
    ) -> Result<Vec<FunctionHandle>, BridgeError> {
        self.register_with(name, lifetime, true, || async move {
            let client = McpClient::connect(name, config, lifetime)
                .await
                .map_err(|e| e.into_remote(name))?;
            Ok::<Arc<dyn ToolProvider>, BridgeError>(Arc::new(client))
        })
        .await
    }

    /// Register every enabled server in `servers`.
    ///
    /// Servers are connected concurrently. A failing server does not stop the
    /// others; its error is reported in the outcome map. Remote endpoints are
    /// reported as [`ConfigError::UnsupportedTransport`].
    pub async fn add_servers(
        &self,
        servers: &ServerMap,
        lifetime: &CancellationToken,
    ) -> ServerOutcomes {
        let stdio = servers.enabled_stdio().map(|(name, config)| async move {
            (name.to_string(), self.add_stdio_server(name, config, lifetime).await)
        });
        let mut outcomes: ServerOutcomes = join_all(stdio).await.into_iter().collect();

        for (name, remote) in &servers.remote {
            if remote.disabled {
                continue;
            }
            let err = ConfigError::UnsupportedTransport {
                server: name.clone(),
                transport: "http".into(),
            };
            outcomes.insert(name.clone(), Err(err.into()));
        }

        for (name, outcome) in &outcomes {
            match outcome {
                Ok(handles) => {
                    tracing::info!("MCP server '{name}' registered {} functions", handles.len())
                }
                Err(e) => tracing::warn!("Failed to register MCP server '{name}': {e}"),
            }
        }
        outcomes
    }

    /// Register the servers from a Claude Desktop config. `None` reads the
    /// platform default location.
    pub async fn add_claude_desktop_servers(
        &self,
        path: Option<&Path>,
        lifetime: &CancellationToken,
    ) -> Result<ServerOutcomes, BridgeError> {
        let servers = match path {
            Some(path) => load_claude_desktop(path)?,
            None => match claude_desktop_config_path() {
                Some(path) => load_claude_desktop(&path)?,
                None => ServerMap::default(),
            },
        };
        Ok(self.add_servers(&servers, lifetime).await)
    }

    /// Register the servers from a VS Code `settings.json` or `mcp.json`.
    pub async fn add_vscode_servers(
        &self,
        path: &Path,
        inputs: &HashMap<String, String>,
        lifetime: &CancellationToken,
    ) -> Result<ServerOutcomes, BridgeError> {
        let servers = load_vscode(path, inputs)?;
        Ok(self.add_servers(&servers, lifetime).await)
    }

    /// Register the servers from the user settings of a VS Code install.
    pub async fn add_vscode_user_servers(
        &self,
        instance: VsCodeInstance,
        inputs: &HashMap<String, String>,
        lifetime: &CancellationToken,
    ) -> Result<ServerOutcomes, BridgeError> {
        match vscode_settings_path(instance) {
            Some(path) => self.add_vscode_servers(&path, inputs, lifetime).await,
            None => Ok(ServerOutcomes::new()),
        }
    }

    /// End every registration lifetime and wait for the clients to be disposed.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        for registration in self.cache.registrations() {
            if let Some(disposer) = registration.take_disposer() {
                if let Err(e) = disposer.await {
                    tracing::warn!("Disposer for '{}' failed: {e}", registration.key);
                }
            }
        }
    }

    async fn register_with<F, Fut>(
        &self,
        server_name: &str,
        lifetime: &CancellationToken,
        owns_client: bool,
        connect: F,
    ) -> Result<Vec<FunctionHandle>, BridgeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn ToolProvider>, BridgeError>>,
    {
        let key = normalize_server_key(server_name)?;
        let plugin = key.as_str();

        let (registration, performed) = self
            .cache
            .get_or_register(plugin, move || async move {
                let client = connect().await?;
                let result = self.register_tools(plugin, Arc::clone(&client), lifetime).await;
                if result.is_err() && owns_client {
                    client.dispose().await;
                }
                result
            })
            .await?;

        if !performed {
            tracing::debug!("MCP server '{key}' already registered, reusing its functions");
        }
        Ok(registration.handles.clone())
    }

    /// List, translate and register one server's tools.
    ///
    /// Every schema is translated before anything is registered, and a registry
    /// failure other than a duplicate removes what this call already added.
    async fn register_tools(
        &self,
        key: &str,
        client: Arc<dyn ToolProvider>,
        lifetime: &CancellationToken,
    ) -> Result<Registration, BridgeError> {
        let tools = client.list_tools(lifetime).await?;

        let mut functions: Vec<Arc<dyn KernelFunction>> = Vec::with_capacity(tools.len());
        for tool in tools {
            let parameters = mcpk_schema::translate(&tool.input_schema, self.settings.schema.policy)
                .map_err(|source| BridgeError::Schema {
                    tool: tool.name.clone(),
                    source,
                })?;
            functions.push(Arc::new(McpFunction::new(
                tool,
                parameters,
                Arc::clone(&client),
                self.settings.invocation.clone(),
            )));
        }

        let handles = self.register_all(key, functions)?;
        tracing::info!(
            "Registered {} functions from MCP server '{}' as plugin '{key}'",
            handles.len(),
            client.server_name()
        );

        let disposer = spawn_disposer(
            key.to_string(),
            Arc::clone(&client),
            lifetime.clone(),
            self.shutdown.clone(),
        );
        Ok(Registration::new(key.to_string(), handles, client, disposer))
    }

    fn register_all(
        &self,
        key: &str,
        functions: Vec<Arc<dyn KernelFunction>>,
    ) -> Result<Vec<FunctionHandle>, BridgeError> {
        let mut handles = Vec::with_capacity(functions.len());
        let mut added: Vec<String> = Vec::new();

        for function in functions {
            let name = function.name().to_string();
            match self.registry.register_function(key, function) {
                Ok(handle) => {
                    added.push(name);
                    handles.push(handle);
                }
                Err(RegistryError::DuplicateRegistration { .. }) => {
                    tracing::debug!("Function '{key}.{name}' already registered");
                    if let Some(existing) = self
                        .registry
                        .functions(key)
                        .into_iter()
                        .find(|h| h.name() == name)
                    {
                        handles.push(existing);
                    }
                }
                Err(e) => {
                    for name in &added {
                        self.registry.remove_function(key, name);
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(handles)
    }
}

/// Wait for the registration lifetime (or bridge shutdown) to end, then
/// dispose the client.
fn spawn_disposer(
    key: String,
    client: Arc<dyn ToolProvider>,
    lifetime: CancellationToken,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = lifetime.cancelled() => {}
            _ = shutdown.cancelled() => {}
        }
        client.dispose().await;
        tracing::info!("Disposed MCP client for '{key}'");
    })
}
