//! A remote MCP tool exposed as a [`KernelFunction`].

use crate::coerce::coerce_argument;
use crate::result::reduce_text;
use mcpk_config::{InvocationSettings, NullArguments};
use mcpk_types::{
    ArgumentError, BoxFuture, BridgeError, FunctionResult, KernelArguments, KernelFunction,
    ParameterList, RemoteCallError, ToolArguments, ToolDescriptor, ToolProvider,
};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One remote tool, callable through the host registry.
///
/// Every function registered from a server shares that server's client.
pub struct McpFunction {
    name: String,
    description: String,
    parameters: ParameterList,
    client: Arc<dyn ToolProvider>,
    settings: InvocationSettings,
}

impl McpFunction {
    pub fn new(
        tool: ToolDescriptor,
        parameters: ParameterList,
        client: Arc<dyn ToolProvider>,
        settings: InvocationSettings,
    ) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            parameters,
            client,
            settings,
        }
    }

    /// Build the outgoing argument map from what the caller supplied.
    ///
    /// Fails before any remote call when a required parameter is missing or a
    /// value cannot be coerced under the `reject` fallback. Arguments that
    /// match no declared parameter are forwarded as given.
    pub fn prepare_arguments(&self, mut supplied: KernelArguments) -> Result<ToolArguments, ArgumentError> {
        let mut outgoing = ToolArguments::new();

        for spec in &self.parameters {
            let coerced = match supplied.remove(&spec.name) {
                Some(Value::Null) if !spec.required => None,
                Some(value) => coerce_argument(
                    &spec.name,
                    value,
                    &spec.resolved_type,
                    self.settings.coercion_fallback,
                )?,
                None if spec.required => {
                    return Err(ArgumentError::Missing {
                        function: self.name.clone(),
                        parameter: spec.name.clone(),
                    });
                }
                None => None,
            };

            match coerced {
                Some(value) => {
                    outgoing.insert(spec.name.clone(), value);
                }
                None if spec.required || self.settings.null_arguments == NullArguments::Explicit => {
                    outgoing.insert(spec.name.clone(), Value::Null);
                }
                None => {}
            }
        }

        for (name, value) in supplied {
            tracing::debug!("Forwarding undeclared argument '{name}' to '{}'", self.name);
            outgoing.insert(name, value);
        }
        Ok(outgoing)
    }

    async fn call(&self, arguments: KernelArguments, cancel: &CancellationToken) -> Result<FunctionResult, BridgeError> {
        let outgoing = self.prepare_arguments(arguments)?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Call to '{}' cancelled", self.name);
                return Err(BridgeError::Cancelled);
            }
            result = self.client.call_tool(&self.name, outgoing, cancel) => result,
        };

        let result = match result {
            Ok(result) => result,
            Err(RemoteCallError::Cancelled) => return Err(BridgeError::Cancelled),
            Err(e) => {
                tracing::error!(tool = %self.name, "MCP tool call failed: {e}");
                return Err(e.into());
            }
        };

        let text = reduce_text(&result.content);
        if result.is_error {
            tracing::error!(tool = %self.name, "MCP tool reported an error: {text}");
            return Err(RemoteCallError::ToolFailed {
                tool: self.name.clone(),
                message: text,
            }
            .into());
        }

        Ok(FunctionResult {
            text,
            structured: result
                .structured_content
                .filter(|_| self.settings.structured_content),
        })
    }
}

impl KernelFunction for McpFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ParameterList {
        &self.parameters
    }

    fn invoke<'a>(
        &'a self,
        arguments: KernelArguments,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<FunctionResult, BridgeError>> {
        Box::pin(self.call(arguments, cancel))
    }
}
