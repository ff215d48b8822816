//! Host-side callable functions and the registry they live in.

use crate::error::{BridgeError, RegistryError};
use crate::schema::{ParameterList, TypeTag};
use crate::tool::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Named argument values supplied by the host when invoking a function.
pub type KernelArguments = serde_json::Map<String, Value>;

/// Output of a function invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionResult {
    /// Primary text channel.
    pub text: String,
    /// Structured companion payload, passed through when available.
    pub structured: Option<Value>,
}

impl FunctionResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
        }
    }
}

/// A callable registered with the host.
pub trait KernelFunction: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ParameterList;

    fn return_type(&self) -> TypeTag {
        TypeTag::String
    }

    /// Invoke with named arguments.
    ///
    /// `cancel` aborts only this call.
    fn invoke<'a>(
        &'a self,
        arguments: KernelArguments,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<FunctionResult, BridgeError>>;
}

/// A registered function, addressed by plugin and function name.
#[derive(Clone)]
pub struct FunctionHandle {
    plugin: String,
    function: Arc<dyn KernelFunction>,
}

impl FunctionHandle {
    pub fn new(plugin: impl Into<String>, function: Arc<dyn KernelFunction>) -> Self {
        Self {
            plugin: plugin.into(),
            function,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn name(&self) -> &str {
        self.function.name()
    }

    pub fn function(&self) -> &Arc<dyn KernelFunction> {
        &self.function
    }

    /// Fully qualified `plugin.function` name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.plugin, self.function.name())
    }
}

impl fmt::Debug for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionHandle")
            .field("plugin", &self.plugin)
            .field("name", &self.function.name())
            .finish()
    }
}

/// Host registry that functions are added to.
pub trait FunctionRegistry: Send + Sync {
    /// Add a function under `plugin`.
    ///
    /// Fails with [`RegistryError::DuplicateRegistration`] when the plugin
    /// already holds a function with the same name.
    fn register_function(
        &self,
        plugin: &str,
        function: Arc<dyn KernelFunction>,
    ) -> Result<FunctionHandle, RegistryError>;

    /// Enumerate the functions registered under `plugin`.
    fn functions(&self, plugin: &str) -> Vec<FunctionHandle>;

    /// Remove one function. Returns whether it was present.
    fn remove_function(&self, plugin: &str, function: &str) -> bool;
}
