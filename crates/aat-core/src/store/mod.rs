//! Backing stores for the shared cloud document.

mod memory;
mod upstash;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

pub use memory::MemoryStore;
pub use upstash::{resolve_token, resolve_url, UpstashConfig, UpstashStore, TOKEN_VARS, URL_VARS};

use crate::document::{CloudDocument, PushPayload};
use crate::merge::{merge_document, MergeOutcome};

pub const DEFAULT_MERGE_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document store is not configured: missing {missing}")]
    NotConfigured { missing: String },
    #[error("Document store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Document store error: {0}")]
    Api(String),
    #[error("Stored document could not be decoded: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Document changed concurrently; gave up after {attempts} merge attempts")]
    Contention { attempts: u32 },
}

impl StoreError {
    /// Stable name of the failure, reported as `errorType` by the endpoint.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured { .. } => "NotConfigured",
            Self::Http(_) => "HttpError",
            Self::Api(_) => "StoreApiError",
            Self::Corrupt(_) => "CorruptDocument",
            Self::Contention { .. } => "Contention",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value holder of the single cloud document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name reported by the health route.
    fn backend_name(&self) -> &'static str;

    async fn load(&self) -> StoreResult<Option<CloudDocument>>;

    /// Replace the document if the stored version still equals
    /// `expected_version` (`None`: only if nothing is stored).
    ///
    /// Returns `false` when another writer got there first.
    async fn replace(
        &self,
        expected_version: Option<u64>,
        document: &CloudDocument,
    ) -> StoreResult<bool>;

    /// Delete the document. Deleting an absent document succeeds.
    async fn remove(&self) -> StoreResult<()>;
}

/// Load, merge and compare-and-swap until the write lands.
///
/// A lost swap means another writer committed in between; the payload is
/// merged again on top of that writer's document. Store failures are not
/// retried.
pub async fn merge_into_store(
    store: &dyn DocumentStore,
    payload: &PushPayload,
    max_attempts: u32,
) -> StoreResult<MergeOutcome> {
    let attempts = max_attempts.max(1);

    for attempt in 1..=attempts {
        let existing = store.load().await?;
        let expected_version = existing.as_ref().map(|document| document.version);
        let outcome = merge_document(existing, payload, Utc::now());

        if store.replace(expected_version, &outcome.document).await? {
            if outcome.skipped > 0 {
                tracing::warn!(
                    skipped = outcome.skipped,
                    "Dropped entities without an id during merge"
                );
            }
            tracing::debug!(
                version = outcome.document.version,
                attempt,
                backend = store.backend_name(),
                "Merged document persisted"
            );
            return Ok(outcome);
        }

        tracing::info!(
            attempt,
            ?expected_version,
            "Document changed during merge; retrying"
        );
    }

    Err(StoreError::Contention { attempts })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::Entity;

    fn payload_with(id: &str, updated_at: &str) -> PushPayload {
        PushPayload {
            bookings: vec![Entity::new(id).with_field("updatedAt", updated_at)],
            device_id: Some("device_test".to_string()),
            ..PushPayload::default()
        }
    }

    /// Memory store that lets `racing_writes` concurrent commits land first.
    struct RacingStore {
        inner: MemoryStore,
        racing_writes: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        fn backend_name(&self) -> &'static str {
            "racing"
        }

        async fn load(&self) -> StoreResult<Option<CloudDocument>> {
            self.inner.load().await
        }

        async fn replace(
            &self,
            expected_version: Option<u64>,
            document: &CloudDocument,
        ) -> StoreResult<bool> {
            let remaining = self.racing_writes.load(Ordering::SeqCst);
            if remaining > 0 {
                self.racing_writes.store(remaining - 1, Ordering::SeqCst);
                let rival = payload_with("rival", "2024-01-01T00:00:00Z");
                let current = self.inner.load().await?;
                let version = current.as_ref().map(|document| document.version);
                let outcome = merge_document(current, &rival, Utc::now());
                assert!(self.inner.replace(version, &outcome.document).await?);
            }
            self.inner.replace(expected_version, document).await
        }

        async fn remove(&self) -> StoreResult<()> {
            self.inner.remove().await
        }
    }

    #[tokio::test]
    async fn version_counts_writes_from_empty() {
        let store = MemoryStore::new();
        for n in 1..=4_u64 {
            let outcome = merge_into_store(&store, &payload_with("b1", "2024-01-01"), 3)
                .await
                .unwrap();
            assert_eq!(outcome.document.version, n);
        }
    }

    #[tokio::test]
    async fn lost_swap_merges_again_on_top_of_rival() {
        let store = RacingStore {
            inner: MemoryStore::new(),
            racing_writes: AtomicU32::new(1),
        };

        let outcome = merge_into_store(&store, &payload_with("mine", "2024-01-02T00:00:00Z"), 3)
            .await
            .unwrap();

        assert_eq!(outcome.document.version, 2);
        let stored = store.load().await.unwrap().unwrap();
        let ids: Vec<_> = stored.bookings.iter().filter_map(Entity::id).collect();
        assert_eq!(ids, vec!["rival", "mine"]);
        assert_eq!(stored.device_id, "device_test");
    }

    #[tokio::test]
    async fn persistent_contention_gives_up() {
        let store = RacingStore {
            inner: MemoryStore::new(),
            racing_writes: AtomicU32::new(10),
        };

        let error = merge_into_store(&store, &payload_with("mine", "2024-01-02"), 2)
            .await
            .unwrap_err();

        assert!(matches!(error, StoreError::Contention { attempts: 2 }));
        assert_eq!(error.kind(), "Contention");
    }
}
