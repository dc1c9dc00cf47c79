//! The sync client service object.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::status::{SyncState, SyncStats, SyncStatus};
use super::{SyncBackend, SyncResult};
use crate::document::{CloudDocument, PushAck};
use crate::error::Result;
use crate::local::{load_or_create_device_id, LocalSnapshot, LocalStorage, LAST_SYNC_KEY};
use crate::util::{iso_now, normalize_text_option, sanitize};

/// Callback run synchronously on every status transition.
pub type StatusObserver = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
struct ClientState {
    state: SyncState,
    connected: bool,
    last_sync: Option<String>,
    error: Option<String>,
    last_ack: Option<PushAck>,
}

impl ClientState {
    fn status(&self) -> SyncStatus {
        SyncStatus {
            is_connected: self.connected,
            is_authorized: self.connected,
            last_sync: self.last_sync.clone(),
            sync_in_progress: self.state == SyncState::SyncInProgress,
            error: self.error.clone(),
        }
    }
}

/// Releases the in-flight flag when dropped, including on early return or
/// panic.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Pushes and pulls the local replica through a [`SyncBackend`], allowing at
/// most one sync in flight and broadcasting status transitions.
pub struct SyncClient {
    backend: Arc<dyn SyncBackend>,
    storage: Arc<dyn LocalStorage>,
    device_id: String,
    in_flight: AtomicBool,
    state: Mutex<ClientState>,
    observers: Mutex<Vec<(SubscriptionId, StatusObserver)>>,
    next_subscription: AtomicU64,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncClient")
            .field("backend", &self.backend.describe())
            .field("device_id", &self.device_id)
            .field("state", &lock(&self.state).state)
            .finish_non_exhaustive()
    }
}

impl SyncClient {
    /// Create a client, restoring the device id and `lastSync` from storage.
    pub fn new(backend: Arc<dyn SyncBackend>, storage: Arc<dyn LocalStorage>) -> Result<Self> {
        let device_id = load_or_create_device_id(storage.as_ref())?;
        let last_sync = normalize_text_option(storage.get(LAST_SYNC_KEY)?);

        Ok(Self {
            backend,
            storage,
            device_id,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(ClientState {
                connected: true,
                last_sync,
                ..ClientState::default()
            }),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn backend(&self) -> &dyn SyncBackend {
        self.backend.as_ref()
    }

    pub fn storage(&self) -> &dyn LocalStorage {
        self.storage.as_ref()
    }

    pub fn state(&self) -> SyncState {
        lock(&self.state).state
    }

    pub fn status(&self) -> SyncStatus {
        lock(&self.state).status()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Acknowledgement of the most recent successful push.
    pub fn last_ack(&self) -> Option<PushAck> {
        lock(&self.state).last_ack.clone()
    }

    /// Mark the sync environment available and broadcast the current status.
    pub fn initialize(&self) {
        self.transition(|state| state.connected = true);
    }

    /// Mark the sync environment unavailable; auto-sync idles until
    /// [`SyncClient::initialize`].
    pub fn disconnect(&self) {
        self.transition(|state| state.connected = false);
    }

    /// Upload the snapshot for merging into the cloud document.
    ///
    /// Returns `Ok(None)` without contacting the backend when another sync is
    /// already in flight.
    pub async fn push(&self, snapshot: &LocalSnapshot) -> SyncResult<Option<PushAck>> {
        // Held until the final transition so no second sync starts early
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("Sync already in progress; skipping push");
            return Ok(None);
        };
        self.transition(begin_sync);

        let payload = snapshot.to_payload(&self.device_id);
        let result = self.backend.push(&payload).await;

        match result {
            Ok(ack) => {
                tracing::info!(
                    version = ack.version,
                    bookings = ack.record_count.bookings,
                    services = ack.record_count.services,
                    users = ack.record_count.users,
                    "Pushed local snapshot"
                );
                let now = self.record_last_sync();
                let stored = ack.clone();
                self.transition(move |state| {
                    finish_sync(state, now);
                    state.last_ack = Some(stored);
                });
                Ok(Some(ack))
            }
            Err(error) => {
                tracing::warn!(error = %sanitize(&error), "Push failed");
                let message = format!("Sync failed: {}", sanitize(&error));
                self.transition(move |state| fail_sync(state, message));
                Err(error)
            }
        }
    }

    /// Download the cloud document. The caller merges it into local state.
    ///
    /// Returns `None` when another sync is in flight or the fetch fails; the
    /// failure is reported through the status.
    pub async fn pull(&self) -> Option<CloudDocument> {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("Sync already in progress; skipping pull");
            return None;
        };
        self.transition(begin_sync);

        let result = self.backend.fetch().await;

        match result {
            Ok(document) => {
                tracing::info!(
                    version = document.version,
                    records = document.total_records(),
                    "Pulled cloud document"
                );
                let now = self.record_last_sync();
                self.transition(move |state| finish_sync(state, now));
                Some(document)
            }
            Err(error) => {
                tracing::warn!(error = %sanitize(&error), "Pull failed");
                let message = format!("Sync failed: {}", sanitize(&error));
                self.transition(move |state| fail_sync(state, message));
                None
            }
        }
    }

    /// Delete the cloud document. `lastSync` is left untouched.
    ///
    /// A push or pull in flight keeps ownership of the sync state; clear then
    /// only records a failure message.
    pub async fn clear(&self) -> SyncResult<()> {
        match self.backend.clear().await {
            Ok(ack) => {
                tracing::info!(message = %ack.message, "Cleared cloud document");
                let syncing = &self.in_flight;
                self.transition(|state| {
                    if !syncing.load(Ordering::Acquire) {
                        state.state = SyncState::Idle;
                        state.error = None;
                    }
                });
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %sanitize(&error), "Clear failed");
                let message = format!("Clear failed: {}", sanitize(&error));
                let syncing = &self.in_flight;
                self.transition(move |state| {
                    if syncing.load(Ordering::Acquire) {
                        state.error = Some(message);
                    } else {
                        fail_sync(state, message);
                    }
                });
                Err(error)
            }
        }
    }

    /// Probe the backend with a read. The state machine is not affected.
    pub async fn check_connection(&self) -> SyncStatus {
        let probe = self.backend.fetch().await;
        let mut status = self.status();
        status.sync_in_progress = self.is_syncing();
        match probe {
            Ok(_) => {
                status.is_connected = true;
                status.is_authorized = true;
                status.error = None;
            }
            Err(error) => {
                status.is_connected = false;
                status.is_authorized = false;
                status.error = Some(sanitize(&error));
            }
        }
        status
    }

    /// Pull and summarize the cloud document; zeros when the pull fails.
    pub async fn stats(&self) -> SyncStats {
        self.pull()
            .await
            .map_or_else(SyncStats::default, |document| SyncStats {
                total_records: document.total_records(),
                last_sync_time: Some(document.last_modified.clone()),
                cloud_version: document.version,
            })
    }

    pub fn subscribe(&self, observer: StatusObserver) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, observer));
        id
    }

    /// Remove one observer. Returns whether it was subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(subscription, _)| *subscription != id);
        observers.len() != before
    }

    /// Drop every observer.
    pub fn shutdown(&self) {
        lock(&self.observers).clear();
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.in_flight))
    }

    fn record_last_sync(&self) -> String {
        let now = iso_now();
        if let Err(error) = self.storage.set(LAST_SYNC_KEY, &now) {
            tracing::warn!(error = %sanitize(&error), "Failed to persist last sync time");
        }
        now
    }

    /// Apply a state change and notify observers outside the lock.
    fn transition(&self, apply: impl FnOnce(&mut ClientState)) {
        let status = {
            let mut state = lock(&self.state);
            apply(&mut state);
            state.status()
        };
        self.notify(&status);
    }

    fn notify(&self, status: &SyncStatus) {
        let observers: Vec<StatusObserver> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(status);
        }
    }
}

fn begin_sync(state: &mut ClientState) {
    state.state = SyncState::SyncInProgress;
    state.error = None;
}

fn finish_sync(state: &mut ClientState, completed_at: String) {
    state.state = SyncState::Idle;
    state.error = None;
    state.last_sync = Some(completed_at);
}

fn fail_sync(state: &mut ClientState, message: String) {
    state.state = SyncState::Error;
    state.error = Some(message);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
