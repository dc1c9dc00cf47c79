//! The caller's local replica.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{CloudDocument, PushPayload, RecordCount};
use crate::merge::{merge_pulled, CollectionUpdate};
use crate::models::{Collection, Entity};

/// Local replica of the three collections.
///
/// Any other top-level fields belong to the caller and are kept untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    #[serde(default)]
    pub bookings: Vec<Entity>,
    #[serde(default)]
    pub services: Vec<Entity>,
    #[serde(default)]
    pub users: Vec<Entity>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocalSnapshot {
    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty() && self.services.is_empty() && self.users.is_empty()
    }

    pub fn collection(&self, collection: Collection) -> &[Entity] {
        match collection {
            Collection::Bookings => &self.bookings,
            Collection::Services => &self.services,
            Collection::Users => &self.users,
        }
    }

    pub fn record_count(&self) -> RecordCount {
        RecordCount {
            bookings: self.bookings.len(),
            services: self.services.len(),
            users: self.users.len(),
        }
    }

    pub fn to_payload(&self, device_id: &str) -> PushPayload {
        PushPayload {
            bookings: self.bookings.clone(),
            services: self.services.clone(),
            users: self.users.clone(),
            device_id: Some(device_id.to_string()),
        }
    }

    /// Merge a pulled document into this replica, record by record.
    ///
    /// Local records come first, so a cloud copy replaces one only when it is
    /// strictly newer. Cloud records missing locally are inserted.
    pub fn apply_pulled(&mut self, document: &CloudDocument) -> PullSummary {
        let (bookings, bookings_update) =
            merge_pulled(std::mem::take(&mut self.bookings), &document.bookings);
        let (services, services_update) =
            merge_pulled(std::mem::take(&mut self.services), &document.services);
        let (users, users_update) = merge_pulled(std::mem::take(&mut self.users), &document.users);

        self.bookings = bookings;
        self.services = services;
        self.users = users;

        PullSummary {
            bookings: bookings_update,
            services: services_update,
            users: users_update,
        }
    }
}

/// Per-collection outcome of [`LocalSnapshot::apply_pulled`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullSummary {
    pub bookings: CollectionUpdate,
    pub services: CollectionUpdate,
    pub users: CollectionUpdate,
}

impl PullSummary {
    pub const fn inserted(&self) -> usize {
        self.bookings.inserted + self.services.inserted + self.users.inserted
    }

    pub const fn updated(&self) -> usize {
        self.bookings.updated + self.services.updated + self.users.updated
    }

    pub const fn changed(&self) -> bool {
        self.bookings.changed() || self.services.changed() || self.users.changed()
    }
}
