//! Sync client configuration.
//!
//! Values come from the environment (or any lookup function in tests) and are
//! validated once, up front.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_SYNC_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_AUTO_SYNC_MINUTES: u64 = 5;
const AUTO_SYNC_MINUTES_RANGE: std::ops::RangeInclusive<u64> = 1..=1_440;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the remote store endpoint, without a trailing slash
    pub endpoint: String,
    /// Local state directory; `None` leaves the choice to the caller
    pub data_dir: Option<PathBuf>,
    pub auto_sync_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SYNC_URL.to_string(),
            data_dir: None,
            auto_sync_interval: minutes(DEFAULT_AUTO_SYNC_MINUTES),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint = normalize_endpoint(
            &optional_trimmed(&lookup, "AAT_SYNC_URL").unwrap_or_else(|| DEFAULT_SYNC_URL.into()),
        )?;

        let data_dir = optional_trimmed(&lookup, "AAT_DATA_DIR").map(PathBuf::from);

        let auto_sync_minutes = match optional_trimmed(&lookup, "AAT_AUTO_SYNC_MINUTES") {
            Some(raw) => parse_interval_minutes(&raw)?,
            None => DEFAULT_AUTO_SYNC_MINUTES,
        };

        Ok(Self {
            endpoint,
            data_dir,
            auto_sync_interval: minutes(auto_sync_minutes),
        })
    }
}

/// Validate an endpoint base URL and strip trailing slashes.
pub fn normalize_endpoint(raw: &str) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| Error::Config("sync endpoint must not be empty".to_string()))?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "sync endpoint must include http:// or https://".to_string(),
        ))
    }
}

/// Parse an auto-sync interval in minutes, bounded to one day.
pub fn parse_interval_minutes(raw: &str) -> Result<u64> {
    let value = raw.trim().parse::<u64>().map_err(|_| {
        Error::Config("AAT_AUTO_SYNC_MINUTES must be an integer in [1, 1440]".to_string())
    })?;
    if AUTO_SYNC_MINUTES_RANGE.contains(&value) {
        Ok(value)
    } else {
        Err(Error::Config(
            "AAT_AUTO_SYNC_MINUTES must be in [1, 1440]".to_string(),
        ))
    }
}

pub const fn minutes(value: u64) -> Duration {
    Duration::from_secs(value * 60)
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ClientConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.auto_sync_interval, Duration::from_secs(300));
    }

    #[test]
    fn endpoint_is_trimmed_and_validated() {
        let config = config_from(&[("AAT_SYNC_URL", " https://aat.example.com/ ")]).unwrap();
        assert_eq!(config.endpoint, "https://aat.example.com");

        let error = config_from(&[("AAT_SYNC_URL", "aat.example.com")]).unwrap_err();
        assert!(error.to_string().contains("http://"));
    }

    #[test]
    fn auto_sync_minutes_is_bounded() {
        assert!(config_from(&[("AAT_AUTO_SYNC_MINUTES", "0")]).is_err());
        assert!(config_from(&[("AAT_AUTO_SYNC_MINUTES", "1441")]).is_err());
        assert!(config_from(&[("AAT_AUTO_SYNC_MINUTES", "soon")]).is_err());

        let config = config_from(&[("AAT_AUTO_SYNC_MINUTES", "15")]).unwrap();
        assert_eq!(config.auto_sync_interval, Duration::from_secs(900));
    }

    #[test]
    fn data_dir_is_optional() {
        let config = config_from(&[("AAT_DATA_DIR", "/tmp/aat-state")]).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/aat-state")));
    }
}
