//! Bridge settings read from TOML with environment overrides.
//!
//! Precedence (highest to lowest): environment variables, the config file
//! (`$MCPK_CONFIG_DIR/config.toml`, default `~/.mcpk/config.toml`), defaults.

use mcpk_mcp::ServerMap;
use mcpk_schema::SchemaPolicy;
use mcpk_types::ConfigError;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How an optional parameter the caller did not supply is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullArguments {
    /// Leave the key out of the outgoing arguments.
    #[default]
    Omit,
    /// Send the key with an explicit `null`.
    Explicit,
}

/// What happens when a supplied value cannot be converted to its declared type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionFallback {
    /// Send the original value unchanged and let the server decide.
    #[default]
    PassThrough,
    /// Fail the call with an argument error.
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSettings {
    #[serde(default)]
    pub policy: SchemaPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationSettings {
    #[serde(default)]
    pub null_arguments: NullArguments,
    #[serde(default)]
    pub coercion_fallback: CoercionFallback,
    /// Expose `structuredContent` alongside the text result.
    #[serde(default = "default_true")]
    pub structured_content: bool,
}

fn default_true() -> bool {
    true
}

impl Default for InvocationSettings {
    fn default() -> Self {
        Self {
            null_arguments: NullArguments::default(),
            coercion_fallback: CoercionFallback::default(),
            structured_content: true,
        }
    }
}

/// Everything the bridge reads from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    #[serde(default)]
    pub schema: SchemaSettings,
    #[serde(default)]
    pub invocation: InvocationSettings,
    #[serde(flatten)]
    pub servers: ServerMap,
}

impl BridgeSettings {
    /// Load from the default config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_dir().join("config.toml"))
    }

    /// Load from `path` and the process environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = load_settings_file(path);
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<string>".into(),
            message: e.to_string(),
        })
    }

    /// Apply `MCPK_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MCPK_SCHEMA_POLICY") {
            self.schema.policy = parse_choice("MCPK_SCHEMA_POLICY", &raw)?;
        }
        if let Some(raw) = lookup("MCPK_NULL_ARGUMENTS") {
            self.invocation.null_arguments = parse_choice("MCPK_NULL_ARGUMENTS", &raw)?;
        }
        if let Some(raw) = lookup("MCPK_COERCION_FALLBACK") {
            self.invocation.coercion_fallback = parse_choice("MCPK_COERCION_FALLBACK", &raw)?;
        }
        Ok(())
    }
}

fn parse_choice<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    T::deserialize(normalized.as_str().into_deserializer()).map_err(
        |e: serde::de::value::Error| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        },
    )
}

/// Get the mcpk config directory path (~/.mcpk/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MCPK_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcpk")
}

/// Load and parse a TOML settings file, returning defaults on any error.
fn load_settings_file(path: &Path) -> BridgeSettings {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            BridgeSettings::default()
        }),
        Err(_) => BridgeSettings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let settings = BridgeSettings::default();
        assert_eq!(settings.schema.policy, SchemaPolicy::Strict);
        assert_eq!(settings.invocation.null_arguments, NullArguments::Omit);
        assert_eq!(
            settings.invocation.coercion_fallback,
            CoercionFallback::PassThrough
        );
        assert!(settings.invocation.structured_content);
        assert!(settings.servers.is_empty());
    }

    #[test]
    fn parse_full_file() {
        let settings = BridgeSettings::from_toml(
            r#"
[schema]
policy = "lenient"

[invocation]
null_arguments = "explicit"
coercion_fallback = "reject"
structured_content = false

[servers.everything]
command = "npx"
args = ["-y", "@modelcontextprotocol/server-everything"]

[remote.devops]
endpoint = "http://localhost:5000"
"#,
        )
        .unwrap();
        assert_eq!(settings.schema.policy, SchemaPolicy::Lenient);
        assert_eq!(settings.invocation.null_arguments, NullArguments::Explicit);
        assert_eq!(settings.invocation.coercion_fallback, CoercionFallback::Reject);
        assert!(!settings.invocation.structured_content);
        assert_eq!(settings.servers.servers["everything"].command, "npx");
        assert_eq!(settings.servers.remote["devops"].endpoint, "http://localhost:5000");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = BridgeSettings::from_toml("[invocation]\nnull_arguments = \"explicit\"\n").unwrap();
        assert_eq!(settings.invocation.null_arguments, NullArguments::Explicit);
        assert!(settings.invocation.structured_content);
        assert_eq!(settings.schema.policy, SchemaPolicy::Strict);
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MCPK_SCHEMA_POLICY", "Lenient"),
            ("MCPK_COERCION_FALLBACK", "pass-through"),
        ]);
        let mut settings = BridgeSettings::from_toml("[invocation]\ncoercion_fallback = \"reject\"\n").unwrap();
        settings
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.schema.policy, SchemaPolicy::Lenient);
        assert_eq!(
            settings.invocation.coercion_fallback,
            CoercionFallback::PassThrough
        );
        assert_eq!(settings.invocation.null_arguments, NullArguments::Omit);
    }

    #[test]
    fn invalid_env_value_is_reported() {
        let mut settings = BridgeSettings::default();
        let err = settings
            .apply_overrides(|key| (key == "MCPK_NULL_ARGUMENTS").then(|| "sometimes".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "MCPK_NULL_ARGUMENTS"));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[schema\npolicy = ").unwrap();
        assert_eq!(load_settings_file(&path), BridgeSettings::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_settings_file(&dir.path().join("absent.toml")),
            BridgeSettings::default()
        );
    }
}
