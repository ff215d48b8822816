//! Translation of MCP tool input schemas into typed parameter metadata.
//!
//! JSON Schema's type algebra is folded onto the closed [`TypeTag`] sum type:
//! unions collapse to their first non-null member (nullable when `"null"` is
//! present), arrays carry an element tag, and objects with declared
//! properties become records.
//!
//! [`TypeTag`]: mcpk_types::TypeTag

pub mod node;
pub mod translate;

pub use node::{JsonSchemaNode, SchemaType};
pub use translate::{SchemaPolicy, resolve_type, translate, translate_node};
