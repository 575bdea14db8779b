//! API Handlers
//!
//! Member protocol handlers. Peers call these to run operations on their
//! home member and to reach the partitions this member owns.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::cache::SharedStore;
use crate::cluster::MemberId;
use crate::dispatch::Dispatcher;
use crate::error::{ProxyError, Result};
use crate::models::{ContainsResponse, DispatchRequest, HealthResponse, InvokeResponse, StatsResponse};

/// Application state shared across all handlers.
///
/// The store is this member's own partition; the dispatcher executes
/// forwarded operations.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub dispatcher: Arc<Dispatcher>,
    pub member: MemberId,
}

impl AppState {
    pub fn new(store: SharedStore, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            member: dispatcher.local_member().clone(),
            store,
            dispatcher,
        }
    }
}

/// Handler for POST /cluster/invoke
///
/// Runs the operation here; the sender already resolved this member as home.
pub async fn invoke_handler(
    State(state): State<AppState>,
    Json(req): Json<DispatchRequest>,
) -> Result<Json<InvokeResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ProxyError::InvalidRequest(error_msg));
    }

    debug!(namespace = %req.namespace, key = %req.key, operation = %req.operation, "Inbound invoke");
    let result = state.dispatcher.execute_local(req).await?;

    Ok(Json(InvokeResponse { result }))
}

/// Handler for GET /cluster/cache/:namespace/:key
pub async fn cache_get_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Vec<u8>> {
    let mut store = state.store.write().await;
    store
        .get(&namespace, &key)?
        .ok_or_else(|| ProxyError::NotFound(format!("{}/{}", namespace, key)))
}

/// Handler for GET /cluster/peek/:namespace/:key
///
/// Same answer as a cache GET, without restarting the entry's idle clock.
pub async fn peek_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Vec<u8>> {
    let store = state.store.read().await;
    store
        .peek(&namespace, &key)?
        .ok_or_else(|| ProxyError::NotFound(format!("{}/{}", namespace, key)))
}

/// Handler for PUT /cluster/cache/:namespace/:key
pub async fn cache_put_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode> {
    let mut store = state.store.write().await;
    store.put(&namespace, &key, body.to_vec())?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /cluster/cache/:namespace/:key
///
/// Answers with the removed bytes.
pub async fn cache_delete_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Vec<u8>> {
    let mut store = state.store.write().await;
    store
        .remove(&namespace, &key)?
        .ok_or_else(|| ProxyError::NotFound(format!("{}/{}", namespace, key)))
}

/// Handler for GET /cluster/contains/:namespace/:key
pub async fn contains_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Json<ContainsResponse>> {
    let store = state.store.read().await;
    let contains = store.contains_key(&namespace, &key)?;
    Ok(Json(ContainsResponse { contains }))
}

/// Handler for GET /stats
///
/// Statistics of this member's partition only.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = state.store.read().await;
    Json(StatsResponse::new(state.member.as_str(), store.stats()))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.member.as_str()))
}
