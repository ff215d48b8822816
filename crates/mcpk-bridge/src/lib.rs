//! Exposes the tools of MCP servers as typed host functions.
//!
//! [`McpBridge`] lists a server's tools, translates each input schema into a
//! [`ParameterList`](mcpk_types::ParameterList), and registers one
//! [`McpFunction`] per tool under a plugin named after the server. Invoking a
//! function coerces its arguments to the declared types, calls the tool and
//! reduces the result to text.

pub mod bridge;
pub mod cache;
pub mod coerce;
pub mod function;
pub mod kernel;
pub mod normalize;
pub mod result;

pub use bridge::{McpBridge, ServerOutcomes};
pub use cache::{Registration, RegistrationCache};
pub use coerce::{coerce_argument, coerce_value};
pub use function::McpFunction;
pub use kernel::Kernel;
pub use normalize::normalize_server_key;
pub use result::reduce_text;
