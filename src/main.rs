//! Cluster Proxy - member binary
//!
//! Runs one cluster member: the member protocol over HTTP plus the idle
//! cleanup task.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cluster_proxy::api::create_router;
use cluster_proxy::{spawn_cleanup_task, Config, Node};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Assemble the node (membership, cache backend, dispatcher, artifacts)
/// 4. Start background idle cleanup task
/// 5. Serve the member protocol on the configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to info, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cluster_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cluster Proxy member");

    let config = Config::from_env();
    info!(
        "Configuration loaded: member={}, backend={:?}, port={}, invoke_timeout={}ms, artifact_idle_timeout={}s",
        config.member_id,
        config.cache_backend,
        config.server_port,
        config.invoke_timeout_ms,
        config.artifact_idle_timeout
    );

    let node = Node::from_config(&config)
        .await
        .context("failed to assemble node")?;

    let cleanup_handle = spawn_cleanup_task(node.store().clone(), config.cleanup_interval);
    info!("Background cleanup task started");

    let app = create_router(node.app_state());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Member {} listening on http://{}", node.member(), addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
    node.shutdown();

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
