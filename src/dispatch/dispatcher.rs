//! Cluster Proxy Dispatcher
//!
//! Executes a named operation against `(namespace, key)` on the key's home
//! member, wherever the call originates, and hands the result back.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{KeyedCache, OwnerRecord, Residency};
use crate::cluster::{MemberId, Membership, PartitionPolicy};
use crate::dispatch::{KeyLocks, OperationRegistry};
use crate::error::{ProxyError, Result};
use crate::models::DispatchRequest;
use crate::transport::Transport;

// == Dispatcher ==
pub struct Dispatcher {
    membership: Arc<Membership>,
    partition: PartitionPolicy,
    cache: Arc<dyn KeyedCache>,
    registry: OperationRegistry,
    transport: Arc<dyn Transport>,
    locks: KeyLocks,
}

impl Dispatcher {
    pub fn new(
        membership: Arc<Membership>,
        cache: Arc<dyn KeyedCache>,
        registry: OperationRegistry,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            partition: PartitionPolicy::new(&membership),
            membership,
            cache,
            registry,
            transport,
            locks: KeyLocks::new(),
        }
    }

    pub fn local_member(&self) -> &MemberId {
        self.membership.local()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    // == Home Resolution ==
    /// Determines the member that executes operations for `(namespace, key)`.
    ///
    /// Replicated namespaces use the partition policy shared with the cache;
    /// local-only namespaces use the owner recorded in their location namespace.
    ///
    /// # Errors
    /// - `InvalidRequest` for an undeclared namespace
    /// - `NotFound` when a local-only key has no location record
    pub async fn resolve_home(&self, namespace: &str, key: &str) -> Result<MemberId> {
        let spec = self.cache.namespace(namespace).ok_or_else(|| {
            ProxyError::InvalidRequest(format!("unknown namespace '{}'", namespace))
        })?;

        match spec.residency {
            Residency::Replicated => Ok(self.partition.owner(key).clone()),
            Residency::LocalOnly { location } => {
                // Routing must not keep the location record alive
                let bytes = self.cache.peek(&location, key).await?.ok_or_else(|| {
                    ProxyError::NotFound(format!("{}/{}", namespace, key))
                })?;
                let record: OwnerRecord = serde_json::from_slice(&bytes)?;
                Ok(record.owner)
            }
        }
    }

    // == Invoke ==
    /// Runs `operation` on the home member of `(namespace, key)`.
    ///
    /// Exactly one execution attempt is made; nothing is retried.
    ///
    /// # Errors
    /// - `RemoteExecution` when the home member cannot be reached in time
    /// - `Operation` when the handler fails or none is registered
    /// - `Serialization` when args or result cannot cross members
    pub async fn invoke(
        &self,
        namespace: &str,
        key: &str,
        operation: &str,
        args: Value,
    ) -> Result<Value> {
        let home = self.resolve_home(namespace, key).await?;
        let request = DispatchRequest::new(namespace, key, operation, args);

        if self.membership.is_local(&home) {
            debug!(namespace, key, operation, "Executing locally");
            self.execute_local(request).await
        } else {
            debug!(namespace, key, operation, home = %home, "Dispatching to home member");
            self.transport.invoke(&home, &request).await
        }
    }

    /// Typed variant of `invoke`: serializes `args` and decodes the result.
    pub async fn invoke_as<A, R>(
        &self,
        namespace: &str,
        key: &str,
        operation: &str,
        args: &A,
    ) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let args = serde_json::to_value(args)?;
        let result = self.invoke(namespace, key, operation, args).await?;
        Ok(serde_json::from_value(result)?)
    }

    // == Local Execution ==
    /// Executes a request on this member, without re-checking ownership.
    ///
    /// Used for calls whose home is this member and for requests arriving
    /// from other members. Operations on the same key run one at a time.
    pub async fn execute_local(&self, request: DispatchRequest) -> Result<Value> {
        let DispatchRequest {
            namespace,
            key,
            operation,
            args,
        } = request;

        let handler = self
            .registry
            .lookup(&namespace, &operation)
            .await
            .ok_or_else(|| ProxyError::Operation {
                operation: operation.clone(),
                source: anyhow::anyhow!(
                    "no handler registered for '{}' in namespace '{}' on member {}",
                    operation,
                    namespace,
                    self.membership.local()
                ),
            })?;

        let _guard = self.locks.acquire(&namespace, &key).await;
        handler.handle(&key, args).await.map_err(|source| {
            warn!(namespace = %namespace, key = %key, operation = %operation, "Operation failed: {:#}", source);
            ProxyError::Operation { operation, source }
        })
    }
}
