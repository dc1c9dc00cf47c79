//! Sync client: status tracking, push/pull/clear and auto-sync over a
//! pluggable backend.

mod auto;
mod client;
mod direct;
mod http;
mod status;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use thiserror::Error;

pub use auto::{AutoSyncHandle, TickOutcome};
pub use client::{StatusObserver, SubscriptionId, SyncClient};
pub use direct::DirectSyncBackend;
pub use http::{HttpSyncBackend, SYNC_PATH};
pub use status::{SyncState, SyncStats, SyncStatus};

use crate::document::{ClearAck, CloudDocument, PushAck, PushPayload};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid sync configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    #[error("Invalid sync payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Transport between the sync client and the shared document.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Human-readable target, e.g. the endpoint URL.
    fn describe(&self) -> String;

    /// Current cloud document (the default document when none is stored).
    async fn fetch(&self) -> SyncResult<CloudDocument>;

    async fn push(&self, payload: &PushPayload) -> SyncResult<PushAck>;

    async fn clear(&self) -> SyncResult<ClearAck>;
}
