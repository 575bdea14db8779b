//! Operation Registry
//!
//! The table of named operations a member knows how to execute, keyed by
//! `(namespace, operation)`. Business logic plugs into the dispatcher here.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A named operation executed on the home member of its routing key.
///
/// Handlers must not block on a dispatch back to the member that called
/// them: two members each waiting on the other would deadlock.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn handle(&self, key: &str, args: Value) -> anyhow::Result<Value>;
}

/// Adapts an async closure into an `OperationHandler`.
pub struct HandlerFn<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

/// Wraps `f(key, args)` as a handler.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F, Fut>
where
    F: Fn(String, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    HandlerFn {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> OperationHandler for HandlerFn<F, Fut>
where
    F: Fn(String, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn handle(&self, key: &str, args: Value) -> anyhow::Result<Value> {
        (self.f)(key.to_string(), args).await
    }
}

type HandlerKey = (String, String);

// == Operation Registry ==
#[derive(Clone, Default)]
pub struct OperationRegistry {
    handlers: Arc<RwLock<HashMap<HandlerKey, Arc<dyn OperationHandler>>>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `(namespace, operation)`.
    ///
    /// A second registration for the same pair replaces the first.
    pub async fn register<H>(&self, namespace: &str, operation: &str, handler: H)
    where
        H: OperationHandler + 'static,
    {
        let key = (namespace.to_string(), operation.to_string());
        let previous = self.handlers.write().await.insert(key, Arc::new(handler));

        if previous.is_some() {
            warn!(namespace, operation, "Replaced existing operation handler");
        } else {
            info!(namespace, operation, "Registered operation handler");
        }
    }

    pub async fn lookup(&self, namespace: &str, operation: &str) -> Option<Arc<dyn OperationHandler>> {
        self.handlers
            .read()
            .await
            .get(&(namespace.to_string(), operation.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = OperationRegistry::new();
        registry
            .register(
                "assets",
                "restore",
                handler_fn(|key, _args| async move { Ok::<_, anyhow::Error>(json!({ "restored": key })) }),
            )
            .await;

        let handler = registry.lookup("assets", "restore").await.unwrap();
        let result = handler.handle("asset-9", Value::Null).await.unwrap();
        assert_eq!(result, json!({ "restored": "asset-9" }));

        assert!(registry.lookup("assets", "delete").await.is_none());
        assert!(registry.lookup("other", "restore").await.is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_handler() {
        let registry = OperationRegistry::new();
        registry
            .register("ns", "op", handler_fn(|_, _| async { Ok::<_, anyhow::Error>(json!(1)) }))
            .await;
        registry
            .register("ns", "op", handler_fn(|_, _| async { Ok::<_, anyhow::Error>(json!(2)) }))
            .await;

        assert_eq!(registry.len().await, 1);
        let handler = registry.lookup("ns", "op").await.unwrap();
        assert_eq!(handler.handle("k", Value::Null).await.unwrap(), json!(2));
    }
}
