//! In-memory host registry with name-based dispatch.

use mcpk_types::{
    BridgeError, FunctionHandle, FunctionRegistry, FunctionResult, KernelArguments,
    KernelFunction, RegistryError,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

type Plugins = BTreeMap<String, Vec<Arc<dyn KernelFunction>>>;

/// Functions grouped by plugin, each plugin keeping registration order.
pub struct Kernel {
    plugins: RwLock<Plugins>,
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Plugins> {
        self.plugins.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Plugins> {
        self.plugins.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Names of all plugins holding at least one function.
    pub fn plugins(&self) -> Vec<String> {
        self.read()
            .iter()
            .filter(|(_, functions)| !functions.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Look up one function.
    pub fn function(&self, plugin: &str, name: &str) -> Option<FunctionHandle> {
        self.read()
            .get(plugin)?
            .iter()
            .find(|f| f.name() == name)
            .map(|f| FunctionHandle::new(plugin, Arc::clone(f)))
    }

    /// Invoke a function by plugin and function name.
    pub async fn invoke(
        &self,
        plugin: &str,
        function: &str,
        arguments: KernelArguments,
        cancel: &CancellationToken,
    ) -> Result<FunctionResult, BridgeError> {
        let handle = self.lookup(plugin, function)?;
        handle.function().invoke(arguments, cancel).await
    }

    /// Invoke with positional values bound by the function's required order.
    pub async fn invoke_positional(
        &self,
        plugin: &str,
        function: &str,
        values: Vec<Value>,
        cancel: &CancellationToken,
    ) -> Result<FunctionResult, BridgeError> {
        let handle = self.lookup(plugin, function)?;
        let arguments = handle.function().parameters().bind_positional(values)?;
        handle.function().invoke(arguments, cancel).await
    }

    fn lookup(&self, plugin: &str, function: &str) -> Result<FunctionHandle, BridgeError> {
        self.function(plugin, function)
            .ok_or_else(|| BridgeError::UnknownFunction {
                plugin: plugin.to_string(),
                function: function.to_string(),
            })
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry for Kernel {
    fn register_function(
        &self,
        plugin: &str,
        function: Arc<dyn KernelFunction>,
    ) -> Result<FunctionHandle, RegistryError> {
        let mut plugins = self.write();
        let functions = plugins.entry(plugin.to_string()).or_default();
        if functions.iter().any(|f| f.name() == function.name()) {
            return Err(RegistryError::DuplicateRegistration {
                plugin: plugin.to_string(),
                function: function.name().to_string(),
            });
        }
        functions.push(Arc::clone(&function));
        Ok(FunctionHandle::new(plugin, function))
    }

    fn functions(&self, plugin: &str) -> Vec<FunctionHandle> {
        self.read()
            .get(plugin)
            .map(|functions| {
                functions
                    .iter()
                    .map(|f| FunctionHandle::new(plugin, Arc::clone(f)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn remove_function(&self, plugin: &str, function: &str) -> bool {
        let mut plugins = self.write();
        let Some(functions) = plugins.get_mut(plugin) else {
            return false;
        };
        let before = functions.len();
        functions.retain(|f| f.name() != function);
        let removed = functions.len() != before;
        if functions.is_empty() {
            plugins.remove(plugin);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpk_types::{BoxFuture, ParameterList, ParameterSpec, TypeTag};

    struct Echo {
        name: &'static str,
        parameters: ParameterList,
    }

    impl Echo {
        fn new(name: &'static str) -> Arc<Self> {
            let parameters = ParameterList::new(
                vec![
                    ParameterSpec {
                        name: "a".into(),
                        description: String::new(),
                        required: true,
                        resolved_type: TypeTag::String,
                    },
                    ParameterSpec {
                        name: "b".into(),
                        description: String::new(),
                        required: true,
                        resolved_type: TypeTag::String,
                    },
                ],
                vec!["b".into(), "a".into()],
            );
            Arc::new(Self { name, parameters })
        }
    }

    impl KernelFunction for Echo {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echoes its arguments"
        }

        fn parameters(&self) -> &ParameterList {
            &self.parameters
        }

        fn invoke<'a>(
            &'a self,
            arguments: KernelArguments,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<FunctionResult, BridgeError>> {
            Box::pin(async move { Ok(FunctionResult::text(Value::Object(arguments).to_string())) })
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let kernel = Kernel::new();
        kernel.register_function("p", Echo::new("echo")).unwrap();
        let err = kernel.register_function("p", Echo::new("echo")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                plugin: "p".into(),
                function: "echo".into()
            }
        );
        // Same function name under another plugin is fine
        assert!(kernel.register_function("q", Echo::new("echo")).is_ok());
    }

    #[test]
    fn functions_keep_registration_order() {
        let kernel = Kernel::new();
        for name in ["zeta", "alpha", "mid"] {
            kernel.register_function("p", Echo::new(name)).unwrap();
        }
        let names: Vec<String> = kernel
            .functions("p")
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(kernel.functions("p")[0].qualified_name(), "p.zeta");
        assert!(kernel.functions("missing").is_empty());
    }

    #[test]
    fn remove_function_drops_empty_plugin() {
        let kernel = Kernel::new();
        kernel.register_function("p", Echo::new("echo")).unwrap();
        assert!(kernel.remove_function("p", "echo"));
        assert!(!kernel.remove_function("p", "echo"));
        assert!(kernel.plugins().is_empty());
    }

    #[tokio::test]
    async fn invoke_dispatches_by_name() {
        let kernel = Kernel::new();
        kernel.register_function("p", Echo::new("echo")).unwrap();
        let cancel = CancellationToken::new();
        let mut args = KernelArguments::new();
        args.insert("a".into(), "x".into());
        let result = kernel.invoke("p", "echo", args, &cancel).await.unwrap();
        assert_eq!(result.text, r#"{"a":"x"}"#);
    }

    #[tokio::test]
    async fn invoke_unknown_function() {
        let kernel = Kernel::new();
        let cancel = CancellationToken::new();
        let err = kernel
            .invoke("p", "nope", KernelArguments::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownFunction { .. }));
    }

    #[tokio::test]
    async fn invoke_positional_uses_required_order() {
        let kernel = Kernel::new();
        kernel.register_function("p", Echo::new("echo")).unwrap();
        let cancel = CancellationToken::new();
        let result = kernel
            .invoke_positional("p", "echo", vec!["first".into(), "second".into()], &cancel)
            .await
            .unwrap();
        let echoed: Value = serde_json::from_str(&result.text).unwrap();
        assert_eq!(echoed["b"], "first");
        assert_eq!(echoed["a"], "second");
    }
}
