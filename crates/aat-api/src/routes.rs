use std::sync::Arc;

use aat_core::document::{
    default_document, ClearAck, CloudDocument, PushAck, PushPayload, SERVER_DEVICE_ID,
};
use aat_core::store::{
    merge_into_store, DocumentStore, MemoryStore, StoreError, UpstashStore, TOKEN_VARS, URL_VARS,
};
use aat_core::util::sanitize;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use http::{header, Method};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, StoreSettings};
use crate::error::{AppError, FailureDebug};

pub const SYNC_ROUTE: &str = "/api/sync";

/// Largest accepted push body. A whole dashboard snapshot travels in one
/// request, so this sits well above axum's 2 MB default.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl AppState {
    /// Build the store selected by `config`. Missing Upstash credentials leave
    /// the state without a store; requests then fail with a configuration
    /// error instead of preventing startup.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, StoreError> {
        let store: Option<Arc<dyn DocumentStore>> = match &config.store {
            StoreSettings::Memory => Some(Arc::new(MemoryStore::new())),
            StoreSettings::Upstash(upstash) => {
                Some(Arc::new(UpstashStore::new(upstash.clone())?))
            }
            StoreSettings::Unconfigured { .. } => None,
        };
        Ok(Self { config, store })
    }

    /// State serving from an explicit store.
    pub fn with_store(config: Arc<AppConfig>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            store: Some(store),
        }
    }

    pub fn store_name(&self) -> &'static str {
        self.store
            .as_ref()
            .map_or("unconfigured", |store| store.backend_name())
    }

    fn store(
        &self,
        method: &'static str,
        operation: &'static str,
    ) -> Result<&dyn DocumentStore, AppError> {
        self.store.as_deref().ok_or_else(|| {
            let (has_url, has_token) = self.config.store.credential_flags();
            let mut missing = Vec::new();
            if !has_url {
                missing.push(URL_VARS.join(" or "));
            }
            if !has_token {
                missing.push(TOKEN_VARS.join(" or "));
            }
            self.failure(
                method,
                operation,
                StoreError::NotConfigured {
                    missing: missing.join(", "),
                },
            )
        })
    }

    fn failure(
        &self,
        method: &'static str,
        operation: &'static str,
        source: StoreError,
    ) -> AppError {
        let (has_url, has_token) = self.config.store.credential_flags();
        AppError::store(
            source,
            FailureDebug {
                method,
                operation,
                has_url,
                has_token,
            },
        )
    }
}

pub fn app_router(state: AppState) -> Router {
    let sync_routes = get(read_document)
        .post(write_merge)
        .delete(clear_document)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/healthz", get(healthz))
        .route(SYNC_ROUTE, sync_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    store: &'static str,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        store: state.store_name(),
    })
}

async fn read_document(State(state): State<AppState>) -> Result<Json<CloudDocument>, AppError> {
    let store = state.store("GET", "sync_read")?;
    let document = store
        .load()
        .await
        .map_err(|error| state.failure("GET", "sync_read", error))?
        .unwrap_or_else(|| default_document(Utc::now(), SERVER_DEVICE_ID));

    tracing::debug!(
        endpoint = "sync_read",
        version = document.version,
        records = document.total_records(),
        "Served cloud document"
    );
    Ok(Json(document))
}

async fn write_merge(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PushAck>, AppError> {
    let payload = parse_payload(&body)?;
    let store = state.store("POST", "sync_write")?;

    let outcome = merge_into_store(store, &payload, state.config.merge_attempts)
        .await
        .map_err(|error| state.failure("POST", "sync_write", error))?;

    let record_count = outcome.document.record_count();
    tracing::info!(
        endpoint = "sync_write",
        version = outcome.document.version,
        device = %outcome.document.device_id,
        bookings = record_count.bookings,
        services = record_count.services,
        users = record_count.users,
        skipped = outcome.skipped,
        "Merged pushed snapshot"
    );
    Ok(Json(PushAck::for_document(&outcome.document, outcome.skipped)))
}

async fn clear_document(State(state): State<AppState>) -> Result<Json<ClearAck>, AppError> {
    let store = state.store("DELETE", "sync_clear")?;
    store
        .remove()
        .await
        .map_err(|error| state.failure("DELETE", "sync_clear", error))?;

    tracing::info!(endpoint = "sync_clear", "Cleared cloud document");
    Ok(Json(ClearAck::default()))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Decode a write-merge body. Empty bodies and `null` read as `{}`.
fn parse_payload(body: &[u8]) -> Result<PushPayload, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PushPayload::default());
    }

    let value: Value = serde_json::from_slice(body).map_err(|error| {
        AppError::bad_request(format!("body is not valid JSON: {}", sanitize(&error)))
    })?;
    if value.is_null() {
        return Ok(PushPayload::default());
    }
    if !value.is_object() {
        return Err(AppError::bad_request("body must be a JSON object"));
    }

    serde_json::from_value(value).map_err(|error| {
        AppError::bad_request(format!("unexpected body shape: {}", sanitize(&error)))
    })
}
