//! Error types for the cluster proxy
//!
//! Member-boundary failures are kept apart from handler failures so callers
//! can tell whether resubmitting a call is safe.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// == Proxy Error Enum ==
/// Unified error type for cache, dispatch and artifact operations.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Home member unreachable, timed out, or answered outside the protocol
    #[error("Remote execution failed on member {member}: {message}")]
    RemoteExecution { member: String, message: String },

    /// The operation handler itself raised an error
    #[error("Operation '{operation}' failed: {source}")]
    Operation {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Arguments or results could not cross the process boundary
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Artifact generator failed; nothing was committed
    #[error("Artifact generation failed for '{key}': {source}")]
    Generation {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Key or namespace has no entry
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Returns true when resubmitting the same call cannot duplicate a side effect.
    ///
    /// A remote failure is ambiguous (the home member may have executed the
    /// operation before the reply was lost) and an operation failure is up to
    /// the handler, so neither qualifies.
    pub fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            ProxyError::Generation { .. } | ProxyError::NotFound(_)
        )
    }

    /// Wire classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::RemoteExecution { .. } => ErrorKind::Remote,
            ProxyError::Operation { .. } => ErrorKind::Operation,
            ProxyError::Serialization(_) => ErrorKind::Serialization,
            ProxyError::Generation { .. } => ErrorKind::Generation,
            ProxyError::NotFound(_) => ErrorKind::NotFound,
            ProxyError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ProxyError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Body sent to another member when this error ends a remote call.
    ///
    /// Operation and generation errors travel with their cause chain only;
    /// the caller rewraps them with its own context.
    pub fn to_body(&self) -> ErrorBody {
        let error = match self {
            ProxyError::Operation { source, .. } | ProxyError::Generation { source, .. } => {
                format!("{:#}", source)
            }
            ProxyError::NotFound(msg)
            | ProxyError::InvalidRequest(msg)
            | ProxyError::Serialization(msg)
            | ProxyError::Internal(msg) => msg.clone(),
            ProxyError::RemoteExecution { .. } => self.to_string(),
        };
        ErrorBody {
            error,
            kind: self.kind(),
        }
    }

    /// Rebuilds an error received from another member.
    ///
    /// `member` names the peer so remote-side failures keep their origin;
    /// `operation` and `key` are the ones the call was routed with.
    pub fn from_wire(member: &str, operation: &str, key: &str, body: ErrorBody) -> Self {
        match body.kind {
            ErrorKind::Operation => ProxyError::Operation {
                operation: operation.to_string(),
                source: anyhow::anyhow!(body.error),
            },
            ErrorKind::Serialization => ProxyError::Serialization(body.error),
            ErrorKind::Generation => ProxyError::Generation {
                key: key.to_string(),
                source: anyhow::anyhow!(body.error),
            },
            ErrorKind::NotFound => ProxyError::NotFound(body.error),
            ErrorKind::InvalidRequest => ProxyError::InvalidRequest(body.error),
            ErrorKind::Remote | ErrorKind::Internal => ProxyError::RemoteExecution {
                member: member.to_string(),
                message: body.error,
            },
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Serialization(err.to_string())
    }
}

// == Wire Error Body ==
/// Error classification carried in member protocol responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Remote,
    Operation,
    Serialization,
    Generation,
    NotFound,
    InvalidRequest,
    Internal,
}

/// JSON body returned for every failed member protocol request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::RemoteExecution { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::Operation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::Serialization(_) => StatusCode::BAD_REQUEST,
            ProxyError::Generation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self.to_body())).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cluster proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
