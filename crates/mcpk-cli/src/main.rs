//! mcpk CLI: list and call MCP server tools as typed functions.

mod render;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mcpk_bridge::{Kernel, McpBridge, ServerOutcomes};
use mcpk_config::BridgeSettings;
use mcpk_types::{FunctionRegistry, KernelArguments};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "mcpk", version, about = "Call MCP server tools as typed functions")]
struct Cli {
    /// Settings file (default: ~/.mcpk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also register the servers configured for Claude Desktop
    #[arg(long, global = true)]
    claude: bool,

    /// Also register the servers from a VS Code settings.json or mcp.json
    #[arg(long, global = true)]
    vscode: Option<PathBuf>,

    /// Value for a VS Code `${input:ID}` placeholder
    #[arg(long = "input", value_name = "ID=VALUE", global = true)]
    inputs: Vec<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every registered function with its parameters
    List,
    /// Invoke one function and print its result
    Call {
        plugin: String,
        function: String,
        /// Named arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
        /// Positional arguments as a JSON array, bound in required order
        #[arg(long, conflicts_with = "args")]
        positional: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let settings = match &cli.config {
        Some(path) => BridgeSettings::load_from(path),
        None => BridgeSettings::load(),
    }
    .context("Failed to load settings")?;

    let kernel = Arc::new(Kernel::new());
    let bridge = McpBridge::new(Arc::clone(&kernel) as Arc<dyn FunctionRegistry>, settings);
    let lifetime = CancellationToken::new();

    let result = run(&cli, &kernel, &bridge, &lifetime).await;
    bridge.shutdown().await;
    result
}

async fn run(
    cli: &Cli,
    kernel: &Kernel,
    bridge: &McpBridge,
    lifetime: &CancellationToken,
) -> Result<()> {
    report(bridge.add_servers(&bridge.settings().servers, lifetime).await);
    if cli.claude {
        report(bridge.add_claude_desktop_servers(None, lifetime).await?);
    }
    if let Some(path) = &cli.vscode {
        let inputs = parse_inputs(&cli.inputs)?;
        report(bridge.add_vscode_servers(path, &inputs, lifetime).await?);
    }

    match &cli.command {
        Command::List => {
            let plugins = kernel.plugins();
            if plugins.is_empty() {
                println!("No functions registered.");
            }
            for plugin in plugins {
                println!("{plugin}");
                for handle in kernel.functions(&plugin) {
                    println!("    {}", render::function(&handle));
                }
            }
            Ok(())
        }
        Command::Call {
            plugin,
            function,
            args,
            positional,
        } => {
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            let result = match positional {
                Some(raw) => {
                    let values: Vec<Value> =
                        serde_json::from_str(raw).context("--positional must be a JSON array")?;
                    kernel.invoke_positional(plugin, function, values, &cancel).await?
                }
                None => {
                    let arguments = match args {
                        Some(raw) => parse_arguments(raw)?,
                        None => KernelArguments::new(),
                    };
                    kernel.invoke(plugin, function, arguments, &cancel).await?
                }
            };

            println!("{}", result.text);
            if let Some(structured) = result.structured {
                println!("{}", serde_json::to_string_pretty(&structured)?);
            }
            Ok(())
        }
    }
}

fn report(outcomes: ServerOutcomes) {
    for (name, outcome) in outcomes {
        if let Err(e) = outcome {
            eprintln!("Warning: MCP server '{name}' was not registered: {e}");
        }
    }
}

fn parse_arguments(raw: &str) -> Result<KernelArguments> {
    match serde_json::from_str(raw).context("--args must be a JSON object")? {
        Value::Object(map) => Ok(map),
        other => bail!("--args must be a JSON object, got {other}"),
    }
}

fn parse_inputs(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((id, value)) if !id.is_empty() => Ok((id.to_string(), value.to_string())),
            _ => bail!("--input expects ID=VALUE, got '{entry}'"),
        })
        .collect()
}
