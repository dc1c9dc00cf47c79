//! The shared cloud document and the wire types exchanged with the endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::Entity;
use crate::util::iso_timestamp;

/// Fixed store key of the single shared document.
pub const DOCUMENT_KEY: &str = "aat-booking-data";
/// `deviceId` of the default document, before any device has pushed.
pub const SERVER_DEVICE_ID: &str = "server";
/// `deviceId` recorded when a push does not name its device.
pub const UNKNOWN_DEVICE_ID: &str = "unknown";
/// Version of the default document and of the first persisted write.
pub const INITIAL_VERSION: u64 = 1;

pub const SYNC_SUCCESS_MESSAGE: &str = "Data synced successfully";
pub const CLEAR_SUCCESS_MESSAGE: &str = "Data cleared successfully";

/// The single shared state record holding all three collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDocument {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub bookings: Vec<Entity>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub services: Vec<Entity>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub users: Vec<Entity>,
    pub last_modified: String,
    pub version: u64,
    #[serde(default = "unknown_device")]
    pub device_id: String,
}

impl CloudDocument {
    pub fn record_count(&self) -> RecordCount {
        RecordCount {
            bookings: self.bookings.len(),
            services: self.services.len(),
            users: self.users.len(),
        }
    }

    pub fn total_records(&self) -> usize {
        self.record_count().total()
    }
}

/// The document served when nothing has been written yet.
pub fn default_document(now: DateTime<Utc>, sentinel_device_id: &str) -> CloudDocument {
    CloudDocument {
        bookings: Vec::new(),
        services: Vec::new(),
        users: Vec::new(),
        last_modified: iso_timestamp(now),
        version: INITIAL_VERSION,
        device_id: sentinel_device_id.to_string(),
    }
}

/// Body of a write-merge request. Absent (or `null`) collections are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub bookings: Vec<Entity>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub services: Vec<Entity>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub users: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Per-collection record counts after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCount {
    pub bookings: usize,
    pub services: usize,
    pub users: usize,
}

impl RecordCount {
    pub const fn total(&self) -> usize {
        self.bookings + self.services + self.users
    }
}

/// Acknowledgement returned by a successful write-merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushAck {
    pub success: bool,
    pub message: String,
    pub version: u64,
    pub last_modified: String,
    pub record_count: RecordCount,
    /// Incoming entities dropped because they carried no usable `id`
    #[serde(default, skip_serializing_if = "is_zero")]
    pub skipped: usize,
}

impl PushAck {
    pub fn for_document(document: &CloudDocument, skipped: usize) -> Self {
        Self {
            success: true,
            message: SYNC_SUCCESS_MESSAGE.to_string(),
            version: document.version,
            last_modified: document.last_modified.clone(),
            record_count: document.record_count(),
            skipped,
        }
    }
}

/// Acknowledgement returned by a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearAck {
    pub success: bool,
    pub message: String,
}

impl Default for ClearAck {
    fn default() -> Self {
        Self {
            success: true,
            message: CLEAR_SUCCESS_MESSAGE.to_string(),
        }
    }
}

fn unknown_device() -> String {
    UNKNOWN_DEVICE_ID.to_string()
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if passes a reference
const fn is_zero(value: &usize) -> bool {
    *value == 0
}

fn nullable_vec<'de, D>(deserializer: D) -> Result<Vec<Entity>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Entity>>::deserialize(deserializer)?.unwrap_or_default())
}
