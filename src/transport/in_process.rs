//! In-process transport: several members sharing one process.
//!
//! Requests and results are still encoded to JSON and back so the
//! serialization boundary behaves as it does over HTTP.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::cache::SharedStore;
use crate::cluster::MemberId;
use crate::dispatch::Dispatcher;
use crate::error::{ProxyError, Result};
use crate::models::DispatchRequest;
use crate::transport::Transport;

struct Endpoint {
    store: SharedStore,
    dispatcher: Weak<Dispatcher>,
}

#[derive(Default)]
struct Network {
    endpoints: HashMap<MemberId, Endpoint>,
    unreachable: HashSet<MemberId>,
}

/// A simulated network; clones share the same set of attached members.
#[derive(Clone, Default)]
pub struct InProcessNetwork {
    inner: Arc<RwLock<Network>>,
}

impl InProcessNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a member reachable through this network.
    pub fn attach(&self, member: MemberId, store: SharedStore, dispatcher: &Arc<Dispatcher>) {
        let mut network = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        network.endpoints.insert(
            member,
            Endpoint {
                store,
                dispatcher: Arc::downgrade(dispatcher),
            },
        );
    }

    /// Simulates a partition: calls to `member` fail as if it were down.
    pub fn set_unreachable(&self, member: &MemberId, unreachable: bool) {
        let mut network = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if unreachable {
            network.unreachable.insert(member.clone());
        } else {
            network.unreachable.remove(member);
        }
    }

    fn store(&self, member: &MemberId) -> Result<SharedStore> {
        let network = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        check_reachable(&network, member)?;
        network
            .endpoints
            .get(member)
            .map(|e| e.store.clone())
            .ok_or_else(|| unreachable(member, "no such member"))
    }

    fn dispatcher(&self, member: &MemberId) -> Result<Arc<Dispatcher>> {
        let network = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        check_reachable(&network, member)?;
        network
            .endpoints
            .get(member)
            .and_then(|e| e.dispatcher.upgrade())
            .ok_or_else(|| unreachable(member, "no such member"))
    }
}

fn check_reachable(network: &Network, member: &MemberId) -> Result<()> {
    if network.unreachable.contains(member) {
        Err(unreachable(member, "connection refused"))
    } else {
        Ok(())
    }
}

fn unreachable(member: &MemberId, message: &str) -> ProxyError {
    ProxyError::RemoteExecution {
        member: member.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl Transport for InProcessNetwork {
    async fn invoke(&self, member: &MemberId, request: &DispatchRequest) -> Result<Value> {
        let dispatcher = self.dispatcher(member)?;
        debug!(member = %member, operation = %request.operation, "In-process invoke");

        let wire = serde_json::to_vec(request)?;
        let received: DispatchRequest = serde_json::from_slice(&wire)?;

        match dispatcher.execute_local(received).await {
            Ok(result) => {
                let wire = serde_json::to_vec(&result)?;
                Ok(serde_json::from_slice(&wire)?)
            }
            // Only the message crosses a real member boundary
            Err(err) => Err(ProxyError::from_wire(
                member.as_str(),
                &request.operation,
                &request.key,
                err.to_body(),
            )),
        }
    }

    async fn cache_get(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.store(member)?.write().await.get(namespace, key)
    }

    async fn cache_peek(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.store(member)?.read().await.peek(namespace, key)
    }

    async fn cache_put(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        self.store(member)?.write().await.put(namespace, key, value)
    }

    async fn cache_remove(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.store(member)?.write().await.remove(namespace, key)
    }

    async fn cache_contains(&self, member: &MemberId, namespace: &str, key: &str) -> Result<bool> {
        self.store(member)?.read().await.contains_key(namespace, key)
    }
}
