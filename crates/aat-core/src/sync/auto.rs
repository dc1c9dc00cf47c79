//! Periodic background push of the persisted local snapshot.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::client::SyncClient;
use crate::document::PushAck;
use crate::local::load_snapshot;
use crate::util::sanitize;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// What a single auto-sync tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Pushed(PushAck),
    SkippedInFlight,
    SkippedDisconnected,
    SkippedEmpty,
    Failed(String),
}

/// Running auto-sync timer. Stopping or dropping the handle cancels it.
#[derive(Debug)]
pub struct AutoSyncHandle {
    task: JoinHandle<()>,
}

impl AutoSyncHandle {
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SyncClient {
    /// Push the persisted snapshot every `interval`, first tick after one
    /// full interval.
    ///
    /// The timer holds only a weak reference and ends once the client is
    /// dropped. Must be called inside a tokio runtime.
    pub fn start_auto_sync(self: &Arc<Self>, interval: Duration) -> AutoSyncHandle {
        let period = interval.max(MIN_INTERVAL);
        let client: Weak<Self> = Arc::downgrade(self);
        tracing::info!(interval_secs = period.as_secs(), "Starting auto-sync");

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(client) = client.upgrade() else {
                    break;
                };
                client.run_auto_sync_tick().await;
            }
        });

        AutoSyncHandle { task }
    }

    /// One auto-sync step. Failures are logged and left for the next tick.
    pub async fn run_auto_sync_tick(&self) -> TickOutcome {
        if self.is_syncing() {
            tracing::debug!("Auto-sync tick skipped: sync in progress");
            return TickOutcome::SkippedInFlight;
        }
        if !self.is_connected() {
            tracing::debug!("Auto-sync tick skipped: disconnected");
            return TickOutcome::SkippedDisconnected;
        }

        let snapshot = match load_snapshot(self.storage()) {
            Ok(Some(snapshot)) if !snapshot.is_empty() => snapshot,
            Ok(_) => return TickOutcome::SkippedEmpty,
            Err(error) => {
                tracing::warn!(error = %sanitize(&error), "Auto-sync could not read local snapshot");
                return TickOutcome::Failed(sanitize(&error));
            }
        };

        match self.push(&snapshot).await {
            Ok(Some(ack)) => TickOutcome::Pushed(ack),
            Ok(None) => TickOutcome::SkippedInFlight,
            Err(error) => {
                tracing::warn!(error = %sanitize(&error), "Auto-sync push failed");
                TickOutcome::Failed(sanitize(&error))
            }
        }
    }
}
