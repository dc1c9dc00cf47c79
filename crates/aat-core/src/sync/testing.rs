//! Scriptable backend shared by the sync client tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{SyncBackend, SyncError, SyncResult};
use crate::document::{ClearAck, CloudDocument, PushAck, PushPayload, RecordCount};

#[derive(Default)]
pub struct MockBackend {
    requests: AtomicUsize,
    gated: AtomicBool,
    gate: Notify,
    failure: Mutex<Option<String>>,
    pushes: Mutex<Vec<PushPayload>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose fetches and pushes block until [`MockBackend::release`].
    /// Clears never block.
    pub fn gated() -> Arc<Self> {
        let backend = Self::default();
        backend.gated.store(true, Ordering::SeqCst);
        Arc::new(backend)
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn succeed(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn pushes(&self) -> Vec<PushPayload> {
        self.pushes.lock().unwrap().clone()
    }

    async fn enter(&self, gate: bool) -> SyncResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if gate && self.gated.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(SyncError::Api {
                status: 503,
                message,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SyncBackend for MockBackend {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    async fn fetch(&self) -> SyncResult<CloudDocument> {
        self.enter(true).await?;
        let pushes = self.pushes.lock().unwrap();
        let last = pushes.last().cloned().unwrap_or_default();
        Ok(CloudDocument {
            bookings: last.bookings,
            services: last.services,
            users: last.users,
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            version: u64::try_from(pushes.len()).unwrap().max(1),
            device_id: last.device_id.unwrap_or_else(|| "server".to_string()),
        })
    }

    async fn push(&self, payload: &PushPayload) -> SyncResult<PushAck> {
        self.enter(true).await?;
        let mut pushes = self.pushes.lock().unwrap();
        pushes.push(payload.clone());
        Ok(PushAck {
            success: true,
            message: "Data synced successfully".to_string(),
            version: u64::try_from(pushes.len()).unwrap(),
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            record_count: RecordCount {
                bookings: payload.bookings.len(),
                services: payload.services.len(),
                users: payload.users.len(),
            },
            skipped: 0,
        })
    }

    async fn clear(&self) -> SyncResult<ClearAck> {
        self.enter(false).await?;
        self.pushes.lock().unwrap().clear();
        Ok(ClearAck::default())
    }
}
