//! Configuration Module
//!
//! Handles loading and managing member configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which `KeyedCache` implementation a member runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Single-process cache, every namespace local
    Memory,
    /// Partitioned across the configured cluster members
    Cluster,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "cluster" => Ok(CacheBackend::Cluster),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Member configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of this member inside the cluster
    pub member_id: String,
    /// HTTP port serving the member protocol
    pub server_port: u16,
    /// Raw `id=host:port` member list; empty means a single-member cluster
    pub cluster_members: String,
    /// Cache implementation selection
    pub cache_backend: CacheBackend,
    /// Timeout for calls to other members in milliseconds
    pub invoke_timeout_ms: u64,
    /// Idle timeout for unretrieved artifacts in seconds
    pub artifact_idle_timeout: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Quiet period before a change notification is delivered, in milliseconds
    pub notify_debounce_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMBER_ID` - Member identity (default: node-1)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLUSTER_MEMBERS` - `id=host:port,...` (default: empty, single member)
    /// - `CACHE_BACKEND` - `memory` or `cluster` (default: memory)
    /// - `INVOKE_TIMEOUT_MS` - Remote call timeout (default: 5000)
    /// - `ARTIFACT_IDLE_TIMEOUT_SECS` - Artifact idle timeout (default: 1800)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 30)
    /// - `NOTIFY_DEBOUNCE_MS` - Notification quiet period (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            member_id: env::var("MEMBER_ID").unwrap_or(defaults.member_id),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cluster_members: env::var("CLUSTER_MEMBERS").unwrap_or(defaults.cluster_members),
            cache_backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.cache_backend),
            invoke_timeout_ms: parse_var("INVOKE_TIMEOUT_MS")
                .unwrap_or(defaults.invoke_timeout_ms),
            artifact_idle_timeout: parse_var("ARTIFACT_IDLE_TIMEOUT_SECS")
                .unwrap_or(defaults.artifact_idle_timeout),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            notify_debounce_ms: parse_var("NOTIFY_DEBOUNCE_MS")
                .unwrap_or(defaults.notify_debounce_ms),
        }
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_millis(self.invoke_timeout_ms)
    }

    pub fn artifact_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.artifact_idle_timeout)
    }

    pub fn notify_debounce(&self) -> Duration {
        Duration::from_millis(self.notify_debounce_ms)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            member_id: "node-1".to_string(),
            server_port: 3000,
            cluster_members: String::new(),
            cache_backend: CacheBackend::Memory,
            invoke_timeout_ms: 5000,
            artifact_idle_timeout: 1800,
            cleanup_interval: 30,
            notify_debounce_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.member_id, "node-1");
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.invoke_timeout(), Duration::from_secs(5));
        assert_eq!(config.artifact_idle_timeout(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "MEMBER_ID",
            "SERVER_PORT",
            "CLUSTER_MEMBERS",
            "CACHE_BACKEND",
            "INVOKE_TIMEOUT_MS",
            "ARTIFACT_IDLE_TIMEOUT_SECS",
            "CLEANUP_INTERVAL",
            "NOTIFY_DEBOUNCE_MS",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.member_id, "node-1");
        assert_eq!(config.server_port, 3000);
        assert!(config.cluster_members.is_empty());
        assert_eq!(config.cleanup_interval, 30);
        assert_eq!(config.notify_debounce_ms, 1000);
    }

    #[test]
    fn test_cache_backend_parse() {
        assert_eq!("cluster".parse::<CacheBackend>(), Ok(CacheBackend::Cluster));
        assert_eq!(" Memory ".parse::<CacheBackend>(), Ok(CacheBackend::Memory));
        assert!("redis".parse::<CacheBackend>().is_err());
    }
}
