//! Shared types, collaborator traits and error hierarchy for mcpk.

pub mod error;
pub mod function;
pub mod schema;
pub mod tool;

pub use error::{
    ArgumentError, BridgeError, ConfigError, RegistryError, RemoteCallError, SchemaError,
};
pub use function::*;
pub use schema::*;
pub use tool::*;
