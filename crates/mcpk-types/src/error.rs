//! Error hierarchy for mcpk.

use thiserror::Error;

/// Top-level error type for registration and invocation.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Tool '{tool}' has an unusable input schema: {source}")]
    Schema {
        tool: String,
        #[source]
        source: SchemaError,
    },

    #[error("Argument error: {0}")]
    Argument(#[from] ArgumentError),

    #[error("Remote call error: {0}")]
    RemoteCall(#[from] RemoteCallError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid server name '{name}': must contain at least one character")]
    InvalidServerName { name: String },

    #[error("Unknown function '{function}' in plugin '{plugin}'")]
    UnknownFunction { plugin: String, function: String },

    #[error("Operation cancelled")]
    Cancelled,
}

/// A tool's input schema cannot be resolved to parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("property '{property}' declares a type union with no non-null member")]
    EmptyUnion { property: String },

    #[error("property '{property}' declares unknown type '{type_name}'")]
    UnknownType { property: String, type_name: String },

    #[error("input schema is not a JSON Schema object: {message}")]
    Malformed { message: String },
}

/// The caller supplied arguments that cannot be sent to the remote tool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("Missing required argument '{parameter}' for '{function}'")]
    Missing { function: String, parameter: String },

    #[error("Argument '{parameter}' cannot be converted to {expected}: {value}")]
    Uncoercible {
        parameter: String,
        expected: String,
        value: String,
    },

    #[error("Expected at most {expected} positional arguments, got {given}")]
    TooManyPositional { expected: usize, given: usize },
}

/// The collaborator's transport or the remote tool itself failed.
#[derive(Debug, Clone, Error)]
pub enum RemoteCallError {
    #[error("Transport failure talking to '{server}': {message}")]
    Transport { server: String, message: String },

    #[error("Tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Remote call cancelled")]
    Cancelled,
}

/// Errors raised by a host function registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Function '{function}' is already registered in plugin '{plugin}'")]
    DuplicateRegistration { plugin: String, function: String },

    #[error("Registry rejected '{plugin}.{function}': {message}")]
    Rejected {
        plugin: String,
        function: String,
        message: String,
    },
}

/// Errors from configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Server '{server}' uses transport '{transport}', which is not supported")]
    UnsupportedTransport { server: String, transport: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_tool_and_property() {
        let err = BridgeError::Schema {
            tool: "list_projects".into(),
            source: SchemaError::EmptyUnion {
                property: "top".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("list_projects"));
        assert!(msg.contains("top"));
    }

    #[test]
    fn argument_error_converts_into_bridge_error() {
        let err: BridgeError = ArgumentError::Missing {
            function: "list_commits".into(),
            parameter: "owner".into(),
        }
        .into();
        assert!(matches!(err, BridgeError::Argument(ArgumentError::Missing { .. })));
        assert_eq!(
            err.to_string(),
            "Argument error: Missing required argument 'owner' for 'list_commits'"
        );
    }
}
