//! Backend that merges against the document store in-process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::{SyncBackend, SyncResult};
use crate::document::{
    default_document, ClearAck, CloudDocument, PushAck, PushPayload, SERVER_DEVICE_ID,
};
use crate::store::{merge_into_store, DocumentStore, DEFAULT_MERGE_ATTEMPTS};

#[derive(Clone)]
pub struct DirectSyncBackend {
    store: Arc<dyn DocumentStore>,
    max_attempts: u32,
}

impl std::fmt::Debug for DirectSyncBackend {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DirectSyncBackend")
            .field("store", &self.store.backend_name())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl DirectSyncBackend {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MERGE_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

#[async_trait]
impl SyncBackend for DirectSyncBackend {
    fn describe(&self) -> String {
        format!("{} store (direct)", self.store.backend_name())
    }

    async fn fetch(&self) -> SyncResult<CloudDocument> {
        Ok(self
            .store
            .load()
            .await?
            .unwrap_or_else(|| default_document(Utc::now(), SERVER_DEVICE_ID)))
    }

    async fn push(&self, payload: &PushPayload) -> SyncResult<PushAck> {
        let outcome = merge_into_store(self.store.as_ref(), payload, self.max_attempts).await?;
        Ok(PushAck::for_document(&outcome.document, outcome.skipped))
    }

    async fn clear(&self) -> SyncResult<ClearAck> {
        self.store.remove().await?;
        Ok(ClearAck::default())
    }
}
