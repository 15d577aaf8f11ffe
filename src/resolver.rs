//! Function resolution and invocation traits.
//!
//! Resolution is split from invocation so the orchestrator can report an
//! unknown function back to the model without ever constructing a callable,
//! and so filters can observe the parsed arguments before anything runs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LoopError;

/// Parsed tool-call arguments.
pub type ArgumentMap = serde_json::Map<String, Value>;

/// A function the orchestrator can invoke.
#[async_trait]
pub trait CallableFunction: Send + Sync {
    /// Invoke with the parsed arguments.
    async fn invoke(&self, arguments: &ArgumentMap) -> Result<Value, LoopError>;
}

/// A resolved function plus the arguments it will receive.
///
/// Filters may replace `arguments` before execution.
pub struct ResolvedFunction {
    /// The function to invoke.
    pub callable: Arc<dyn CallableFunction>,
    /// Arguments, initially the parsed tool-call payload.
    pub arguments: ArgumentMap,
}

/// Maps a fully qualified tool-call name to an invocable function.
pub trait FunctionResolver: Send + Sync {
    /// Resolve `name`, or `None` if no such function is known.
    fn resolve(&self, name: &str, arguments: &ArgumentMap) -> Option<ResolvedFunction>;
}

/// Adapter turning an async closure into a [`CallableFunction`].
pub struct FnFunction<F> {
    f: F,
}

impl<F> FnFunction<F> {
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> CallableFunction for FnFunction<F>
where
    F: Fn(ArgumentMap) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, LoopError>> + Send,
{
    async fn invoke(&self, arguments: &ArgumentMap) -> Result<Value, LoopError> {
        (self.f)(arguments.clone()).await
    }
}

/// In-memory resolver keyed by case-insensitive function name.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn CallableFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable under `name`.
    pub fn register(&mut self, name: impl Into<String>, callable: Arc<dyn CallableFunction>) {
        self.functions
            .insert(name.into().to_ascii_lowercase(), callable);
    }

    /// Register an async closure under `name`.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(ArgumentMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LoopError>> + Send + 'static,
    {
        self.register(name, Arc::new(FnFunction::new(f)));
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FunctionResolver for FunctionRegistry {
    fn resolve(&self, name: &str, arguments: &ArgumentMap) -> Option<ResolvedFunction> {
        self.functions
            .get(&name.to_ascii_lowercase())
            .map(|callable| ResolvedFunction {
                callable: Arc::clone(callable),
                arguments: arguments.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn registry_resolves_case_insensitively() {
        let mut registry = FunctionRegistry::new();
        registry.register_fn("Weather-Lookup", |args: ArgumentMap| async move {
            let city = args.get("city").and_then(Value::as_str).unwrap_or("?");
            Ok(Value::String(format!("sunny in {city}")))
        });

        let mut args = ArgumentMap::new();
        args.insert("city".to_string(), json!("Paris"));
        let resolved = registry
            .resolve("weather-lookup", &args)
            .expect("should resolve regardless of case");
        let result = resolved.callable.invoke(&resolved.arguments).await.unwrap();
        assert_eq!(result, json!("sunny in Paris"));
    }

    #[test]
    fn unknown_function_resolves_to_none() {
        let registry = FunctionRegistry::new();
        assert!(registry.resolve("missing", &ArgumentMap::new()).is_none());
    }
}
