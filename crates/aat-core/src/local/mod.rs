//! Client-side persisted state: device id, last sync time and the local
//! snapshot of the three collections.

mod file;
mod memory;
mod snapshot;

use uuid::Uuid;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use snapshot::{LocalSnapshot, PullSummary};

use crate::error::Result;
use crate::util::normalize_text_option;

pub const DEVICE_ID_KEY: &str = "aat-device-id";
pub const LAST_SYNC_KEY: &str = "aat-last-sync";
pub const SNAPSHOT_KEY: &str = "aat-booking-state";

/// String key-value persistence for client state.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Fresh device identifier: `device_` followed by a time-ordered UUID.
pub fn new_device_id() -> String {
    format!("device_{}", Uuid::now_v7().simple())
}

/// Return the persisted device id, generating and persisting one on first use.
pub fn load_or_create_device_id(storage: &dyn LocalStorage) -> Result<String> {
    if let Some(existing) = normalize_text_option(storage.get(DEVICE_ID_KEY)?) {
        return Ok(existing);
    }

    let device_id = new_device_id();
    storage.set(DEVICE_ID_KEY, &device_id)?;
    tracing::info!(device = %device_id, "Generated device id");
    Ok(device_id)
}

pub fn load_snapshot(storage: &dyn LocalStorage) -> Result<Option<LocalSnapshot>> {
    let Some(raw) = storage.get(SNAPSHOT_KEY)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

pub fn save_snapshot(storage: &dyn LocalStorage, snapshot: &LocalSnapshot) -> Result<()> {
    storage.set(SNAPSHOT_KEY, &serde_json::to_string(snapshot)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_is_generated_once() {
        let storage = MemoryStorage::new();

        let first = load_or_create_device_id(&storage).unwrap();
        let second = load_or_create_device_id(&storage).unwrap();

        assert!(first.starts_with("device_"));
        assert_eq!(first, second);
        assert_eq!(storage.get(DEVICE_ID_KEY).unwrap(), Some(first));
    }

    #[test]
    fn device_ids_differ_between_devices() {
        assert_ne!(new_device_id(), new_device_id());
    }

    #[test]
    fn snapshot_round_trips_through_storage() {
        let storage = MemoryStorage::new();
        assert!(load_snapshot(&storage).unwrap().is_none());

        let snapshot: LocalSnapshot = serde_json::from_str(
            r#"{"bookings":[{"id":"b1"}],"services":[],"users":[],"theme":"dark"}"#,
        )
        .unwrap();
        save_snapshot(&storage, &snapshot).unwrap();

        assert_eq!(load_snapshot(&storage).unwrap(), Some(snapshot));
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let storage = MemoryStorage::new();
        storage.set(SNAPSHOT_KEY, "{oops").unwrap();
        assert!(load_snapshot(&storage).is_err());
    }
}
