//! Generic synchronized entity

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FIELD_ID: &str = "id";
const FIELD_CREATED_AT: &str = "createdAt";
const FIELD_UPDATED_AT: &str = "updatedAt";

/// A synchronized record: a JSON object identified by its `id` field.
///
/// Every field other than `id`, `createdAt` and `updatedAt` is opaque to the
/// sync layer and survives merges untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Create an entity holding only an `id`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(FIELD_ID.to_string(), Value::String(id.into()));
        Self(fields)
    }

    /// Builder-style field setter
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Identity of the entity, compared exactly as stored. Missing,
    /// non-string and blank ids yield `None`.
    pub fn id(&self) -> Option<&str> {
        self.string_field(FIELD_ID)
            .filter(|id| !id.trim().is_empty())
    }

    /// Raw `createdAt` value, when it is a string
    pub fn created_at(&self) -> Option<&str> {
        self.string_field(FIELD_CREATED_AT)
    }

    /// Raw `updatedAt` value, when it is a string
    pub fn updated_at(&self) -> Option<&str> {
        self.string_field(FIELD_UPDATED_AT)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Decode a typed view (e.g. [`crate::models::Booking`]) of this entity.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// The three synchronized collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Bookings,
    Services,
    Users,
}

impl Collection {
    pub const ALL: [Self; 3] = [Self::Bookings, Self::Services, Self::Users];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Bookings => "bookings",
            Self::Services => "services",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
