//! Node Assembly
//!
//! One cluster member: its partition of the keyed cache, the dispatcher, the
//! artifact store and the change notifier, wired from a `Config`.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::api::AppState;
use crate::artifact::{with_artifact_namespaces, ArtifactStore};
use crate::cache::{ClusterCache, KeyedCache, LocalStore, MemoryCache, Namespaces, SharedStore};
use crate::cluster::{MemberId, Membership};
use crate::config::{CacheBackend, Config};
use crate::dispatch::{Dispatcher, OperationRegistry};
use crate::error::{ProxyError, Result};
use crate::notify::{
    change_channel, spawn_notification_loop, ChangePublisher, Debouncer, Subscribers,
};
use crate::transport::{HttpTransport, InProcessNetwork, Transport};

/// Capacity of the change feed before publishers wait.
const CHANGE_FEED_CAPACITY: usize = 1024;

pub struct Node {
    membership: Arc<Membership>,
    store: SharedStore,
    cache: Arc<dyn KeyedCache>,
    dispatcher: Arc<Dispatcher>,
    artifacts: ArtifactStore,
    debouncer: Debouncer,
    subscribers: Subscribers,
    publisher: ChangePublisher,
    notification_loop: JoinHandle<()>,
}

impl Node {
    /// Builds a member talking to its peers over HTTP.
    ///
    /// # Errors
    /// `InvalidRequest` for a malformed `CLUSTER_MEMBERS` list.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let membership = Arc::new(membership_from(config)?);
        let transport = Arc::new(HttpTransport::new(
            membership.clone(),
            config.invoke_timeout(),
        )?);
        Self::start(config, membership, Namespaces::new(), transport).await
    }

    /// Builds a member attached to a shared in-process network.
    ///
    /// Members of one process reach each other through `network` exactly as
    /// they would over HTTP, minus the sockets.
    pub async fn in_process(
        config: &Config,
        namespaces: Namespaces,
        network: &InProcessNetwork,
    ) -> Result<Self> {
        let membership = Arc::new(membership_from(config)?);
        let node = Self::start(config, membership, namespaces, Arc::new(network.clone())).await?;
        network.attach(node.member().clone(), node.store.clone(), &node.dispatcher);
        Ok(node)
    }

    /// Wires every component; `namespaces` are declared next to the artifact ones.
    ///
    /// # Errors
    /// `InvalidRequest` for the memory backend with more than one member, or
    /// for an invalid namespace table.
    pub async fn start(
        config: &Config,
        membership: Arc<Membership>,
        namespaces: Namespaces,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        // A memory cache keeps every key local, while the dispatcher routes
        // replicated keys across the membership; the two must agree on homes
        if config.cache_backend == CacheBackend::Memory && membership.len() > 1 {
            return Err(ProxyError::InvalidRequest(format!(
                "cache backend 'memory' cannot serve {} members; use 'cluster'",
                membership.len()
            )));
        }

        let namespaces = with_artifact_namespaces(namespaces, config.artifact_idle_timeout());
        namespaces.validate()?;
        let namespaces = Arc::new(namespaces);

        let store = LocalStore::shared(namespaces.clone());
        let cache: Arc<dyn KeyedCache> = match config.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new(namespaces, store.clone())),
            CacheBackend::Cluster => Arc::new(ClusterCache::new(
                namespaces,
                membership.clone(),
                store.clone(),
                transport.clone(),
            )),
        };

        let dispatcher = Arc::new(Dispatcher::new(
            membership.clone(),
            cache.clone(),
            OperationRegistry::new(),
            transport,
        ));

        let artifacts = ArtifactStore::new(cache.clone(), dispatcher.clone());
        artifacts.register_handlers().await;

        let debouncer = Debouncer::new();
        let subscribers = Subscribers::new();
        let (publisher, feed) = change_channel(CHANGE_FEED_CAPACITY);
        let notification_loop = spawn_notification_loop(
            feed,
            debouncer.clone(),
            config.notify_debounce(),
            subscribers.clone(),
        );

        info!(
            member = %membership.local(),
            members = membership.len(),
            backend = ?config.cache_backend,
            "Node started"
        );

        Ok(Self {
            membership,
            store,
            cache,
            dispatcher,
            artifacts,
            debouncer,
            subscribers,
            publisher,
            notification_loop,
        })
    }

    pub fn member(&self) -> &MemberId {
        self.membership.local()
    }

    pub fn membership(&self) -> &Arc<Membership> {
        &self.membership
    }

    /// This member's own partition.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn KeyedCache> {
        &self.cache
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    pub fn publisher(&self) -> &ChangePublisher {
        &self.publisher
    }

    /// State for the member protocol router.
    pub fn app_state(&self) -> AppState {
        AppState::new(self.store.clone(), self.dispatcher.clone())
    }

    /// Cancels pending notifications and stops the change feed loop.
    pub fn shutdown(&self) {
        self.debouncer.close();
        self.notification_loop.abort();
        info!(member = %self.member(), "Node shut down");
    }
}

fn membership_from(config: &Config) -> Result<Membership> {
    let local_address = format!("127.0.0.1:{}", config.server_port);
    Membership::parse(
        MemberId::new(config.member_id.as_str()),
        local_address,
        &config.cluster_members,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cluster_config(member: &str) -> Config {
        Config {
            member_id: member.to_string(),
            cluster_members: "a=in-process,b=in-process".to_string(),
            cache_backend: CacheBackend::Cluster,
            notify_debounce_ms: 100,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_from_config_single_member() {
        let node = Node::from_config(&Config::default()).await.unwrap();

        assert_eq!(node.member().as_str(), "node-1");
        assert_eq!(node.membership().len(), 1);
        assert_eq!(node.membership().address_of(node.member()), Some("127.0.0.1:3000"));
        node.shutdown();
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_member_list() {
        let config = Config {
            cluster_members: "a=127.0.0.1:1,garbage".to_string(),
            ..Config::default()
        };
        assert!(Node::from_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_backend_rejected_for_multiple_members() {
        let network = InProcessNetwork::new();
        let config = Config {
            cache_backend: CacheBackend::Memory,
            ..cluster_config("a")
        };

        let result = Node::in_process(&config, Namespaces::new(), &network).await;
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_in_process_nodes_share_artifacts() {
        let network = InProcessNetwork::new();
        let a = Node::in_process(&cluster_config("a"), Namespaces::new(), &network)
            .await
            .unwrap();
        let b = Node::in_process(&cluster_config("b"), Namespaces::new(), &network)
            .await
            .unwrap();

        a.artifacts()
            .create("EXP-9", "nine.zip", || async { Ok(b"nine".to_vec()) })
            .await
            .unwrap();

        assert!(b.artifacts().exists("EXP-9").await.unwrap());
        assert_eq!(b.artifacts().retrieve("EXP-9").await.unwrap(), Some(b"nine".to_vec()));
        assert!(!a.artifacts().exists("EXP-9").await.unwrap());
    }

    #[tokio::test]
    async fn test_published_change_reaches_subscriber() {
        let node = Node::from_config(&Config {
            notify_debounce_ms: 50,
            ..Config::default()
        })
        .await
        .unwrap();

        let mut rx = node.subscribers().connect("alice");
        node.subscribers().watch("alice", "orders");

        node.publisher().publish("orders").await;
        node.publisher().publish("orders").await;

        let notification = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notification.topic, "orders");
        node.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_notifications() {
        let node = Node::from_config(&Config::default()).await.unwrap();
        let mut rx = node.subscribers().connect("alice");
        node.subscribers().watch("alice", "orders");

        node.publisher().publish("orders").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        node.shutdown();

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(rx.try_recv().is_err());
        assert!(node.debouncer().is_closed());
    }
}
