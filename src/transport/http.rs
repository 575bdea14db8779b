//! HTTP transport: reqwest client for the axum member protocol.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cluster::{MemberId, Membership};
use crate::error::{ErrorBody, ProxyError, Result};
use crate::models::{ContainsResponse, DispatchRequest, InvokeResponse};
use crate::transport::Transport;

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    membership: Arc<Membership>,
}

impl HttpTransport {
    /// Every request, connect included, is bounded by `timeout`.
    pub fn new(membership: Arc<Membership>, timeout: Duration) -> Result<Self> {
        // Peers are addressed directly, never through an environment proxy
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, membership })
    }

    fn url(&self, member: &MemberId, segments: &[&str]) -> Result<Url> {
        let address = self.membership.address_of(member).ok_or_else(|| {
            ProxyError::RemoteExecution {
                member: member.to_string(),
                message: "member is not part of the cluster".to_string(),
            }
        })?;

        let mut url = Url::parse(&format!("http://{}/", address)).map_err(|e| {
            ProxyError::RemoteExecution {
                member: member.to_string(),
                message: format!("invalid member address '{}': {}", address, e),
            }
        })?;

        // Segments are percent-encoded, so keys may contain '/' and spaces
        url.path_segments_mut()
            .map_err(|_| ProxyError::Internal(format!("address '{}' cannot be a base", address)))?
            .clear()
            .extend(segments);

        Ok(url)
    }

    fn cache_url(&self, member: &MemberId, namespace: &str, key: &str) -> Result<Url> {
        self.url(member, &["cluster", "cache", namespace, key])
    }

    /// Converts a non-success response into the error the peer reported.
    async fn peer_error(
        member: &MemberId,
        operation: &str,
        key: &str,
        response: Response,
    ) -> ProxyError {
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return unreachable_member(member, e),
        };

        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => ProxyError::from_wire(member.as_str(), operation, key, body),
            Err(_) => ProxyError::RemoteExecution {
                member: member.to_string(),
                message: format!("unexpected HTTP {} from peer", status),
            },
        }
    }
}

fn unreachable_member(member: &MemberId, err: reqwest::Error) -> ProxyError {
    let message = if err.is_timeout() {
        format!("timed out: {}", err)
    } else {
        err.to_string()
    };
    warn!(member = %member, "Member call failed: {}", message);
    ProxyError::RemoteExecution {
        member: member.to_string(),
        message,
    }
}

fn decode_error(member: &MemberId, err: reqwest::Error) -> ProxyError {
    if err.is_decode() {
        ProxyError::Serialization(format!("reply from {}: {}", member, err))
    } else {
        unreachable_member(member, err)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(&self, member: &MemberId, request: &DispatchRequest) -> Result<Value> {
        let url = self.url(member, &["cluster", "invoke"])?;
        debug!(member = %member, operation = %request.operation, key = %request.key, "Forwarding invoke");

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| unreachable_member(member, e))?;

        if !response.status().is_success() {
            return Err(
                Self::peer_error(member, &request.operation, &request.key, response).await,
            );
        }

        let body: InvokeResponse = response.json().await.map_err(|e| decode_error(member, e))?;
        Ok(body.result)
    }

    async fn cache_get(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        let url = self.cache_url(member, namespace, key)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable_member(member, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| unreachable_member(member, e))?;
                Ok(Some(bytes.to_vec()))
            }
            _ => Err(Self::peer_error(member, "cache.get", key, response).await),
        }
    }

    async fn cache_peek(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        let url = self.url(member, &["cluster", "peek", namespace, key])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable_member(member, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| unreachable_member(member, e))?;
                Ok(Some(bytes.to_vec()))
            }
            _ => Err(Self::peer_error(member, "cache.peek", key, response).await),
        }
    }

    async fn cache_put(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        let url = self.cache_url(member, namespace, key)?;
        let response = self
            .client
            .put(url)
            .body(value)
            .send()
            .await
            .map_err(|e| unreachable_member(member, e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::peer_error(member, "cache.put", key, response).await)
        }
    }

    async fn cache_remove(
        &self,
        member: &MemberId,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        let url = self.cache_url(member, namespace, key)?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| unreachable_member(member, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| unreachable_member(member, e))?;
                Ok(Some(bytes.to_vec()))
            }
            _ => Err(Self::peer_error(member, "cache.remove", key, response).await),
        }
    }

    async fn cache_contains(&self, member: &MemberId, namespace: &str, key: &str) -> Result<bool> {
        let url = self.url(member, &["cluster", "contains", namespace, key])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable_member(member, e))?;

        if !response.status().is_success() {
            return Err(Self::peer_error(member, "cache.contains", key, response).await);
        }

        let body: ContainsResponse = response.json().await.map_err(|e| decode_error(member, e))?;
        Ok(body.contains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpTransport {
        let membership = Membership::parse(
            MemberId::new("a"),
            "127.0.0.1:3000",
            "a=127.0.0.1:3000,b=127.0.0.1:3001",
        )
        .unwrap();
        HttpTransport::new(Arc::new(membership), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_cache_url_encodes_key_segments() {
        let url = transport()
            .cache_url(&MemberId::new("b"), "export-bytes", "dir/report 1.zip")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3001/cluster/cache/export-bytes/dir%2Freport%201.zip"
        );
    }

    #[tokio::test]
    async fn test_unknown_member_is_remote_error() {
        let request = DispatchRequest::new("ns", "k", "op", Value::Null);
        let result = transport().invoke(&MemberId::new("zz"), &request).await;
        assert!(matches!(result, Err(ProxyError::RemoteExecution { .. })));
    }
}
