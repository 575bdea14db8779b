//! Cluster Proxy - keyed operation dispatch across a cluster of members
//!
//! Routes operations on `(namespace, key)` to the key's home member, stores
//! read-once artifacts on the member that generated them, and debounces
//! change notifications per topic.

pub mod api;
pub mod artifact;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod node;
pub mod notify;
pub mod tasks;
pub mod transport;

pub use api::AppState;
pub use config::Config;
pub use error::{ProxyError, Result};
pub use node::Node;
pub use tasks::spawn_cleanup_task;
