//! Artifact records stored in the location namespace.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::MemberId;
use crate::error::{ProxyError, Result};

/// Metadata for an artifact, replicated so any member can answer
/// "is it ready" and "what is it called".
///
/// `owner` is the member holding the payload; the dispatcher reads it to
/// route retrievals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub display_name: String,
    pub owner: MemberId,
    pub created_at: DateTime<Utc>,
}

/// Returned by a successful `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub id: String,
    pub display_name: String,
    pub owner: MemberId,
    pub created_at: DateTime<Utc>,
    /// Payload length in bytes
    pub size: usize,
}

/// Result of the owner-side retrieve operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPayload {
    /// Base64 payload, or None when nothing was left to hand out
    pub payload: Option<String>,
}

impl RetrievedPayload {
    pub fn found(bytes: &[u8]) -> Self {
        Self {
            payload: Some(STANDARD.encode(bytes)),
        }
    }

    pub fn absent() -> Self {
        Self { payload: None }
    }

    pub fn into_bytes(self) -> Result<Option<Vec<u8>>> {
        self.payload
            .map(|encoded| {
                STANDARD
                    .decode(encoded)
                    .map_err(|e| ProxyError::Serialization(format!("artifact payload: {}", e)))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_serializes_owner_field() {
        let location = ArtifactLocation {
            display_name: "report.zip".to_string(),
            owner: MemberId::new("node-2"),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["owner"], "node-2");
        assert_eq!(json["display_name"], "report.zip");
    }

    #[test]
    fn test_retrieved_payload_decodes() {
        let payload = RetrievedPayload::found(&[0, 159, 255]);
        assert_eq!(payload.into_bytes().unwrap(), Some(vec![0, 159, 255]));
        assert_eq!(RetrievedPayload::absent().into_bytes().unwrap(), None);
    }

    #[test]
    fn test_retrieved_payload_rejects_bad_encoding() {
        let payload = RetrievedPayload {
            payload: Some("!!not base64!!".to_string()),
        };
        assert!(matches!(payload.into_bytes(), Err(ProxyError::Serialization(_))));
    }
}
