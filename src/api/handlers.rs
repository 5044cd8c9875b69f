//! API Handlers
//!
//! HTTP request handlers for each registry endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::config::Config;
use crate::error::{RegistryError, Result};
use crate::events::{
    AnalyticsListener, EventListener, InlineSink, LoggingListener, MetricsListener,
};
use crate::models::{
    CreateKeyRequest, CreateKeyResponse, DeleteResponse, HealthResponse, ResolveResponse,
    StatsResponse,
};
use crate::registry::{current_timestamp, RegistryStore};
use crate::service::{self, KeyService};

/// Number of keys listed under `top_keys` in `/stats`.
const TOP_KEYS: usize = 5;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Composed service stack (layers + allocator)
    pub service: Arc<dyn KeyService>,
    /// The store behind the stack, read directly for record counts
    pub store: Arc<RegistryStore>,
    pub metrics: Arc<MetricsListener>,
    pub analytics: Arc<AnalyticsListener>,
}

impl AppState {
    pub fn new(
        service: Arc<dyn KeyService>,
        store: Arc<RegistryStore>,
        metrics: Arc<MetricsListener>,
        analytics: Arc<AnalyticsListener>,
    ) -> Self {
        Self {
            service,
            store,
            metrics,
            analytics,
        }
    }

    /// Creates a self-contained AppState from configuration.
    ///
    /// Events are delivered inline to fresh listeners, so no runtime task is
    /// needed. The server binary wires an `EventPublisher` instead.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(RegistryStore::new());
        let metrics = Arc::new(MetricsListener::new());
        let analytics = Arc::new(AnalyticsListener::new());

        let listeners: Vec<Arc<dyn EventListener>> = vec![
            metrics.clone(),
            analytics.clone(),
            Arc::new(LoggingListener::new()),
        ];
        let service = service::build(config, store.clone(), Arc::new(InlineSink::new(listeners)))?;

        Ok(Self::new(service, store, metrics, analytics))
    }
}

/// Handler for POST /api/keys
///
/// Registers a value and returns its key. With duplicate suppression on, an
/// already registered value gets its existing key back.
pub async fn create_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<CreateKeyResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(RegistryError::InvalidValue(error_msg));
    }

    let key = state.service.shorten(&req.value)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateKeyResponse::new(key, req.value)),
    ))
}

/// Handler for GET /api/keys/:key
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ResolveResponse>> {
    let record = state.service.resolve(&key)?;

    Ok(Json(ResolveResponse::from_record(
        record,
        current_timestamp(),
    )))
}

/// Handler for DELETE /api/keys/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.service.delete(&key) {
        return Err(RegistryError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.metrics.snapshot(),
        state.store.len(),
        state.analytics.top(TOP_KEYS),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
