//! Transport Module
//!
//! How a member reaches another member: remote operation invocation and
//! remote cache access for replicated namespaces.
//!
//! # Implementations
//! - `HttpTransport`: reqwest client speaking the axum member protocol
//! - `InProcessNetwork`: several members inside one process, for tests

mod http;
mod in_process;

pub use http::HttpTransport;
pub use in_process::InProcessNetwork;

use async_trait::async_trait;
use serde_json::Value;

use crate::cluster::MemberId;
use crate::error::Result;
use crate::models::DispatchRequest;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Run a dispatch request on `member` and return its result.
    ///
    /// Unreachable or timed-out members yield `RemoteExecution`; the call is
    /// never retried here.
    async fn invoke(&self, member: &MemberId, request: &DispatchRequest) -> Result<Value>;

    async fn cache_get(&self, member: &MemberId, namespace: &str, key: &str)
        -> Result<Option<Vec<u8>>>;

    /// Like `cache_get`, but leaves the entry's idle clock alone.
    async fn cache_peek(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>>;

    async fn cache_put(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()>;

    async fn cache_remove(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>>;

    async fn cache_contains(&self, member: &MemberId, namespace: &str, key: &str) -> Result<bool>;
}
