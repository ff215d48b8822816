//! Configuration for mcpk.
//!
//! [`BridgeSettings`] controls schema translation and invocation behaviour and
//! lists configured servers. The [`claude`] and [`vscode`] modules import
//! server definitions written for other MCP hosts.

pub mod claude;
pub mod settings;
pub mod vscode;

pub use claude::{claude_desktop_config_path, load_claude_desktop, parse_claude_desktop};
pub use settings::{
    BridgeSettings, CoercionFallback, InvocationSettings, NullArguments, SchemaSettings, config_dir,
};
pub use vscode::{VsCodeInput, VsCodeInstance, load_vscode, parse_vscode, vscode_settings_path};
