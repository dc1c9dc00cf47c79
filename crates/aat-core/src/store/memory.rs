//! In-process document store for development and tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DocumentStore, StoreResult};
use crate::document::CloudDocument;

#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<CloudDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing document.
    pub fn with_document(document: CloudDocument) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> StoreResult<Option<CloudDocument>> {
        Ok(self.document.lock().await.clone())
    }

    async fn replace(
        &self,
        expected_version: Option<u64>,
        document: &CloudDocument,
    ) -> StoreResult<bool> {
        let mut slot = self.document.lock().await;
        let current_version = slot.as_ref().map(|stored| stored.version);
        if current_version != expected_version {
            return Ok(false);
        }
        *slot = Some(document.clone());
        drop(slot);
        Ok(true)
    }

    async fn remove(&self) -> StoreResult<()> {
        self.document.lock().await.take();
        Ok(())
    }
}
