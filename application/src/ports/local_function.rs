//! Local function port
//!
//! In-process capabilities (built-ins, backend service bindings) implement
//! [`LocalFunction`] and are registered in a [`LocalFunctionRegistry`]
//! created at start-up.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use toolmesh_domain::{ToolDescriptor, ToolError};

/// An in-process function callable through the router
#[async_trait]
pub trait LocalFunction: Send + Sync {
    /// Bare name agents use to call this function
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the accepted arguments
    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(self.name(), self.description()).with_schema(self.input_schema())
    }
}

/// Owned table of local functions keyed by name
#[derive(Clone, Default)]
pub struct LocalFunctionRegistry {
    functions: HashMap<String, Arc<dyn LocalFunction>>,
}

impl LocalFunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register(&mut self, function: Arc<dyn LocalFunction>) {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            tracing::debug!(function = %name, "Replaced local function");
        }
    }

    pub fn with(mut self, function: Arc<dyn LocalFunction>) -> Self {
        self.register(function);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LocalFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for LocalFunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(&'static str, Value);

    #[async_trait]
    impl LocalFunction for Constant {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "returns a constant"
        }

        async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
            Ok(self.1.clone())
        }
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = LocalFunctionRegistry::new()
            .with(Arc::new(Constant("zeta", Value::from(1))))
            .with(Arc::new(Constant("alpha", Value::from(2))));

        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
        let function = registry.get("alpha").unwrap();
        assert_eq!(function.call(Value::Null).await.unwrap(), Value::from(2));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = LocalFunctionRegistry::new();
        registry.register(Arc::new(Constant("x", Value::from(1))));
        registry.register(Arc::new(Constant("x", Value::from(2))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_descriptor_uses_default_schema() {
        let descriptor = Constant("x", Value::Null).descriptor();
        assert_eq!(descriptor.name, "x");
        assert_eq!(descriptor.description, "returns a constant");
        assert_eq!(descriptor.input_schema["type"], "object");
    }
}
