use serde::{Deserialize, Serialize};

/// Client sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    SyncInProgress,
    Error,
}

impl SyncState {
    /// Whether a push or pull may start from this state.
    pub const fn can_start_sync(self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }
}

/// Snapshot broadcast to observers on every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_connected: bool,
    pub is_authorized: bool,
    pub last_sync: Option<String>,
    pub sync_in_progress: bool,
    pub error: Option<String>,
}

/// Summary of the cloud document, as shown by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub total_records: usize,
    /// `lastModified` of the cloud document
    pub last_sync_time: Option<String>,
    pub cloud_version: u64,
}
