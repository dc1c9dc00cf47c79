//! Service / excursion catalog model

use serde::{Deserialize, Serialize};

/// A bookable service or excursion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Duration in minutes
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub max_capacity: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub pickup_time: Option<String>,
    #[serde(default)]
    pub dropoff_time: Option<String>,
    #[serde(default)]
    pub items_to_bring: Vec<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

const fn default_active() -> bool {
    true
}

impl Service {
    /// Currency code, falling back to EUR like the dashboard does
    #[must_use]
    pub fn currency_code(&self) -> &str {
        self.currency.as_deref().unwrap_or("EUR")
    }
}
