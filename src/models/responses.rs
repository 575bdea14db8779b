//! Response DTOs for the member protocol
//!
//! Defines the structure of outgoing HTTP response bodies. Failures use
//! `crate::error::ErrorBody`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for a successful `POST /cluster/invoke`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    /// Whatever the handler returned
    pub result: Value,
}

/// Response body for `GET /cluster/contains/:namespace/:key`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainsResponse {
    pub contains: bool,
}

/// One namespace's statistics in `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStats {
    pub namespace: String,
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub member: String,
    pub namespaces: Vec<NamespaceStats>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from per-namespace cache statistics
    pub fn new(member: impl Into<String>, stats: Vec<(String, CacheStats)>) -> Self {
        let namespaces = stats
            .into_iter()
            .map(|(namespace, stats)| NamespaceStats {
                namespace,
                hit_rate: stats.hit_rate(),
                stats,
            })
            .collect();
        Self {
            member: member.into(),
            namespaces,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Member answering the health check
    pub member: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(member: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            member: member.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
