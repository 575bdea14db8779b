//! Artifact Lifecycle Manager
//!
//! Transient generated artifacts (export bundles and the like) split across
//! two namespaces under the same key:
//! - payload bytes in a local-only namespace on the member that generated them
//! - `{display_name, owner, created_at}` in a small replicated namespace
//!
//! Lifecycle per key: absent, created, then delivered (first retrieval) or
//! expired (idle timeout). While a generator runs, the key is held by a claim
//! record on the location's home member so only one `create` can proceed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactHandle, ArtifactLocation, RetrievedPayload};
use crate::cache::{KeyedCache, NamespaceSpec, Namespaces};
use crate::dispatch::{Dispatcher, OperationHandler};
use crate::error::{ProxyError, Result};

/// Replicated namespace holding artifact metadata.
pub const LOCATION_NAMESPACE: &str = "export-locations";
/// Local-only namespace holding artifact payloads.
pub const PAYLOAD_NAMESPACE: &str = "export-bytes";
/// Replicated namespace holding in-flight `create` claims.
pub const CLAIM_NAMESPACE: &str = "export-claims";
/// Operation run on the payload owner to hand the bytes out once.
pub const RETRIEVE_OPERATION: &str = "retrieve";
/// Operation run on the key's home to reserve it for one `create`.
pub const CLAIM_OPERATION: &str = "claim";

/// Extra lifetime of a payload over its location record.
///
/// The location is written after the payload, so without it the payload
/// could expire first while `exists` still reports the artifact.
pub const PAYLOAD_EXPIRY_GRACE: Duration = Duration::from_secs(5);

/// Adds the artifact namespaces, expiring after `idle_timeout`.
///
/// Reads of the location record never restart its clock, so an artifact
/// lives `idle_timeout` from creation unless it is retrieved first.
pub fn with_artifact_namespaces(namespaces: Namespaces, idle_timeout: Duration) -> Namespaces {
    namespaces
        .with(NamespaceSpec::replicated(LOCATION_NAMESPACE).with_idle_timeout(idle_timeout))
        .with(NamespaceSpec::replicated(CLAIM_NAMESPACE).with_idle_timeout(idle_timeout))
        .with(
            NamespaceSpec::local_only(PAYLOAD_NAMESPACE, LOCATION_NAMESPACE)
                .with_idle_timeout(idle_timeout + PAYLOAD_EXPIRY_GRACE),
        )
}

// == Artifact Store ==
#[derive(Clone)]
pub struct ArtifactStore {
    cache: Arc<dyn KeyedCache>,
    dispatcher: Arc<Dispatcher>,
}

impl ArtifactStore {
    pub fn new(cache: Arc<dyn KeyedCache>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { cache, dispatcher }
    }

    /// Installs the owner-side retrieve and claim operations on this member.
    pub async fn register_handlers(&self) {
        let registry = self.dispatcher.registry();
        registry
            .register(
                PAYLOAD_NAMESPACE,
                RETRIEVE_OPERATION,
                RetrieveHandler {
                    cache: self.cache.clone(),
                },
            )
            .await;
        registry
            .register(
                CLAIM_NAMESPACE,
                CLAIM_OPERATION,
                ClaimHandler {
                    cache: self.cache.clone(),
                },
            )
            .await;
    }

    // == Create ==
    /// Runs `generator` once on this member and publishes its output under `key`.
    ///
    /// The key is claimed on its home member before the generator runs, so
    /// concurrent creates of one key from any members let exactly one through.
    /// The payload stays on this member; the location record is written last,
    /// so the artifact only becomes visible once it is complete.
    ///
    /// # Errors
    /// - `InvalidRequest` if `key` is already in use or being created
    /// - `Generation` if the generator fails; nothing is stored
    pub async fn create<F, Fut>(
        &self,
        key: &str,
        display_name: &str,
        generator: F,
    ) -> Result<ArtifactHandle>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Vec<u8>>>,
    {
        let claimed: bool = self
            .dispatcher
            .invoke_as(CLAIM_NAMESPACE, key, CLAIM_OPERATION, self.dispatcher.local_member())
            .await?;
        if !claimed {
            return Err(ProxyError::InvalidRequest(format!(
                "artifact '{}' already exists",
                key
            )));
        }

        let payload = match generator().await {
            Ok(payload) => payload,
            Err(source) => {
                warn!(key, "Artifact generator failed: {:#}", source);
                self.release_claim(key).await;
                return Err(ProxyError::Generation {
                    key: key.to_string(),
                    source,
                });
            }
        };

        // Once the location record is written it guards the key on its own
        let published = self.publish(key, display_name, payload).await;
        self.release_claim(key).await;
        published
    }

    /// Writes the payload here, then the location record pointing at it.
    async fn publish(
        &self,
        key: &str,
        display_name: &str,
        payload: Vec<u8>,
    ) -> Result<ArtifactHandle> {
        let size = payload.len();
        let location = ArtifactLocation {
            display_name: display_name.to_string(),
            owner: self.dispatcher.local_member().clone(),
            created_at: Utc::now(),
        };
        let record = serde_json::to_vec(&location)?;

        self.cache.put(PAYLOAD_NAMESPACE, key, payload).await?;

        if let Err(err) = self.cache.put(LOCATION_NAMESPACE, key, record).await {
            // Without a location record the payload is unreachable; drop it
            if let Err(cleanup) = self.cache.remove(PAYLOAD_NAMESPACE, key).await {
                warn!(key, "Failed to drop orphaned payload: {}", cleanup);
            }
            return Err(err);
        }

        info!(key, display_name, size, owner = %location.owner, "Artifact created");

        Ok(ArtifactHandle {
            id: key.to_string(),
            display_name: location.display_name,
            owner: location.owner,
            created_at: location.created_at,
            size,
        })
    }

    // == Exists ==
    /// Checks the replicated location namespace only.
    ///
    /// A `create` committed on another member may take a moment to show up.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.cache.contains_key(LOCATION_NAMESPACE, key).await
    }

    // == Display Name ==
    pub async fn display_name(&self, key: &str) -> Result<Option<String>> {
        Ok(self.location(key).await?.map(|l| l.display_name))
    }

    /// Full location record, if the artifact is still pending retrieval.
    ///
    /// Reading it does not extend the artifact's lifetime.
    pub async fn location(&self, key: &str) -> Result<Option<ArtifactLocation>> {
        match self.cache.peek(LOCATION_NAMESPACE, key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    // == Retrieve ==
    /// Hands out the payload once, from whichever member holds it.
    ///
    /// A successful retrieval removes both payload and location record;
    /// every later call returns None.
    pub async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .dispatcher
            .invoke_as::<Value, RetrievedPayload>(
                PAYLOAD_NAMESPACE,
                key,
                RETRIEVE_OPERATION,
                &Value::Null,
            )
            .await;

        match result {
            Ok(retrieved) => retrieved.into_bytes(),
            Err(ProxyError::NotFound(_)) => {
                debug!(key, "No artifact to retrieve");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn release_claim(&self, key: &str) {
        if let Err(err) = self.cache.remove(CLAIM_NAMESPACE, key).await {
            // Left to expire with the claim namespace's idle timeout
            warn!(key, "Failed to release artifact claim: {}", err);
        }
    }
}

// == Claim Handler ==
/// Runs on the key's home, serialized per key by the dispatcher.
///
/// Claims and location records share a home, so both checks are local reads.
/// Answers `true` when the caller now holds the key.
struct ClaimHandler {
    cache: Arc<dyn KeyedCache>,
}

#[async_trait]
impl OperationHandler for ClaimHandler {
    async fn handle(&self, key: &str, args: Value) -> anyhow::Result<Value> {
        if self.cache.contains_key(LOCATION_NAMESPACE, key).await?
            || self.cache.contains_key(CLAIM_NAMESPACE, key).await?
        {
            debug!(key, "Artifact key already taken");
            return Ok(Value::Bool(false));
        }

        self.cache
            .put(CLAIM_NAMESPACE, key, serde_json::to_vec(&args)?)
            .await?;
        Ok(Value::Bool(true))
    }
}

// == Retrieve Handler ==
/// Runs on the payload owner, serialized per key by the dispatcher.
struct RetrieveHandler {
    cache: Arc<dyn KeyedCache>,
}

#[async_trait]
impl OperationHandler for RetrieveHandler {
    async fn handle(&self, key: &str, _args: Value) -> anyhow::Result<Value> {
        // Location first: if it cannot be removed the payload is kept and the
        // caller may try again.
        self.cache.remove(LOCATION_NAMESPACE, key).await?;

        let retrieved = match self.cache.remove(PAYLOAD_NAMESPACE, key).await? {
            Some(bytes) => {
                info!(key, size = bytes.len(), "Artifact delivered");
                RetrievedPayload::found(&bytes)
            }
            None => RetrievedPayload::absent(),
        };

        Ok(serde_json::to_value(retrieved)?)
    }
}
