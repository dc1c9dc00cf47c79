use std::collections::HashMap;
use std::env;

use aat_core::document::DOCUMENT_KEY;
use aat_core::store::{resolve_token, resolve_url, UpstashConfig, DEFAULT_MERGE_ATTEMPTS};
use aat_core::util::is_http_url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which document store the endpoint serves from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    Memory,
    Upstash(UpstashConfig),
    /// Upstash selected but credentials missing; requests fail until fixed.
    Unconfigured { has_url: bool, has_token: bool },
}

impl StoreSettings {
    /// Presence of the store URL and token, for error diagnostics.
    pub const fn credential_flags(&self) -> (bool, bool) {
        match self {
            Self::Memory => (false, false),
            Self::Upstash(_) => (true, true),
            Self::Unconfigured { has_url, has_token } => (*has_url, *has_token),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub store: StoreSettings,
    pub document_key: String,
    pub merge_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "AAT_API_BIND_ADDR", "127.0.0.1:3000");
        let document_key = value_or_default(&lookup, "AAT_SYNC_DOCUMENT_KEY", DOCUMENT_KEY);

        let merge_attempts = value_or_default(
            &lookup,
            "AAT_SYNC_MERGE_ATTEMPTS",
            &DEFAULT_MERGE_ATTEMPTS.to_string(),
        )
        .parse::<u32>()
        .map_err(|_| {
            ConfigError::Invalid("AAT_SYNC_MERGE_ATTEMPTS must be an integer in [1, 10]".to_string())
        })?;
        if !(1..=10).contains(&merge_attempts) {
            return Err(ConfigError::Invalid(
                "AAT_SYNC_MERGE_ATTEMPTS must be in [1, 10]".to_string(),
            ));
        }

        let store = match value_or_default(&lookup, "AAT_SYNC_STORE", "upstash")
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreSettings::Memory,
            "upstash" => upstash_settings(&lookup, &document_key)?,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "AAT_SYNC_STORE must be `upstash` or `memory`, got `{other}`"
                )))
            }
        };

        Ok(Self {
            bind_addr,
            store,
            document_key,
            merge_attempts,
        })
    }

    /// Config for tests and local runs: in-memory store, ephemeral port.
    pub fn in_memory() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            store: StoreSettings::Memory,
            document_key: DOCUMENT_KEY.to_string(),
            merge_attempts: DEFAULT_MERGE_ATTEMPTS,
        }
    }
}

fn upstash_settings(
    lookup: &impl Fn(&str) -> Option<String>,
    document_key: &str,
) -> Result<StoreSettings, ConfigError> {
    let url = resolve_url(lookup);
    let token = resolve_token(lookup);

    match (url, token) {
        (Some(url), Some(token)) => {
            if !is_http_url(&url) {
                return Err(ConfigError::Invalid(
                    "KV_REST_API_URL must start with http:// or https://".to_string(),
                ));
            }
            Ok(StoreSettings::Upstash(
                UpstashConfig::new(url, token).with_key(document_key),
            ))
        }
        (url, token) => {
            tracing::warn!(
                has_url = url.is_some(),
                has_token = token.is_some(),
                "Upstash credentials missing; sync requests will fail"
            );
            Ok(StoreSettings::Unconfigured {
                has_url: url.is_some(),
                has_token: token.is_some(),
            })
        }
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
