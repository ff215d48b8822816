//! VS Code MCP server definitions.
//!
//! Servers come either from the `mcp` section of a user `settings.json` or
//! from a workspace `.vscode/mcp.json`, which holds `servers` and `inputs` at
//! the top level. VS Code prompts for `${input:<id>}` values interactively;
//! here they are supplied by the caller or fall back to the input's default.

use mcpk_mcp::{ServerMap, StdioServerConfig};
use mcpk_types::ConfigError;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Which VS Code build's user settings to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VsCodeInstance {
    #[default]
    Stable,
    Insiders,
}

impl VsCodeInstance {
    fn dir_name(self) -> &'static str {
        match self {
            VsCodeInstance::Stable => "Code",
            VsCodeInstance::Insiders => "Code - Insiders",
        }
    }
}

/// Path of the user `settings.json` for `instance`.
pub fn vscode_settings_path(instance: VsCodeInstance) -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join(instance.dir_name()).join("User").join("settings.json"))
}

#[derive(Debug, Clone, Default, Deserialize)]
struct McpSection {
    #[serde(default)]
    servers: BTreeMap<String, VsCodeServer>,
    #[serde(default, alias = "input")]
    inputs: Vec<VsCodeInput>,
}

#[derive(Debug, Clone, Deserialize)]
struct VsCodeServer {
    #[serde(default, rename = "type")]
    server_type: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default, rename = "envFile")]
    env_file: Option<String>,
    #[serde(default)]
    disabled: bool,
}

/// An `inputs` entry: a value VS Code would prompt the user for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VsCodeInput {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub password: bool,
}

/// Read servers from a VS Code settings or `mcp.json` file.
///
/// `inputs` supplies values for `${input:<id>}` placeholders and takes
/// precedence over any `default` declared in the file. A missing file yields
/// an empty map.
pub fn load_vscode(path: &Path, inputs: &HashMap<String, String>) -> Result<ServerMap, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No VS Code settings at {}", path.display());
            return Ok(ServerMap::default());
        }
        Err(e) => {
            return Err(ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_vscode(&content, base_dir, inputs).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}

/// Parse VS Code settings text. Relative `envFile` paths resolve against
/// `base_dir`.
pub fn parse_vscode(
    content: &str,
    base_dir: &Path,
    inputs: &HashMap<String, String>,
) -> Result<ServerMap, ConfigError> {
    let parse_err = |message: String| ConfigError::Parse {
        path: "settings.json".into(),
        message,
    };

    let root: Value = serde_json::from_str(&strip_jsonc(content)).map_err(|e| parse_err(e.to_string()))?;
    let section = match root {
        Value::Object(mut obj) => match obj.remove("mcp") {
            Some(mcp) => mcp,
            None if obj.contains_key("servers") => Value::Object(obj),
            None => return Ok(ServerMap::default()),
        },
        _ => return Err(parse_err("expected a JSON object".into())),
    };
    let section: McpSection = serde_json::from_value(section).map_err(|e| parse_err(e.to_string()))?;

    let resolver = InputResolver::new(&section.inputs, inputs);
    let mut map = ServerMap::default();
    for (name, server) in section.servers {
        if server.disabled {
            tracing::debug!("Skipping disabled VS Code server '{name}'");
            continue;
        }
        match server.server_type.as_deref().unwrap_or("stdio") {
            "stdio" => {}
            other => {
                return Err(ConfigError::UnsupportedTransport {
                    server: name,
                    transport: other.to_string(),
                });
            }
        }
        let Some(command) = server.command else {
            return Err(ConfigError::MissingKey {
                key: format!("servers.{name}.command"),
            });
        };

        let mut env = HashMap::new();
        if let Some(env_file) = &server.env_file {
            for (key, value) in read_env_file(&base_dir.join(env_file))? {
                env.insert(key, resolver.replace(&value));
            }
        }
        for (key, value) in &server.env {
            env.insert(key.clone(), resolver.replace(value));
        }

        let mut stdio = StdioServerConfig::new(command).with_args(server.args);
        stdio.env = env;
        map.servers.insert(name, stdio);
    }
    Ok(map)
}

fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let invalid = |message: String| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    };
    dotenvy::from_path_iter(path)
        .map_err(|e| invalid(e.to_string()))?
        .map(|item| item.map_err(|e| invalid(e.to_string())))
        .collect()
}

static INPUT_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{input:([^}]+)\}").expect("placeholder pattern is valid"));

/// Resolves `${input:<id>}` against caller values, then file defaults.
struct InputResolver<'a> {
    supplied: &'a HashMap<String, String>,
    defaults: HashMap<&'a str, &'a str>,
}

impl<'a> InputResolver<'a> {
    fn new(declared: &'a [VsCodeInput], supplied: &'a HashMap<String, String>) -> Self {
        let defaults = declared
            .iter()
            .filter_map(|input| input.default.as_deref().map(|d| (input.id.as_str(), d)))
            .collect();
        Self { supplied, defaults }
    }

    fn replace(&self, text: &str) -> String {
        INPUT_PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                let id = &caps[1];
                self.supplied
                    .get(id)
                    .map(String::as_str)
                    .or_else(|| self.defaults.get(id).copied())
                    .unwrap_or(&caps[0])
                    .to_string()
            })
            .into_owned()
    }
}

/// Drop `//` and `/* */` comments and trailing commas so VS Code's JSONC
/// parses as plain JSON. String literals are left untouched.
fn strip_jsonc(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    let mut in_string = false;

    while let Some((i, c)) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                for (_, next) in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                for (_, next) in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            ',' => {
                // Trailing comma: the next significant char closes a container
                let next = strip_leading_trivia(&input[i + c.len_utf8()..]);
                if !matches!(next.chars().next(), Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn strip_leading_trivia(s: &str) -> &str {
    let mut rest = s.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("//") {
            rest = after.find('\n').map_or("", |i| &after[i..]).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |i| &after[i + 2..]).trim_start();
        } else {
            return rest;
        }
    }
}
