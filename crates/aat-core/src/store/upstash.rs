//! Upstash Redis REST backend.
//!
//! Commands are POSTed as JSON arrays (`["GET", key]`) with a bearer token and
//! answered with `{"result": ...}` or `{"error": "..."}`. The document is
//! stored as a JSON string.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{DocumentStore, StoreError, StoreResult};
use crate::document::{CloudDocument, DOCUMENT_KEY};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Store URL variables, first present wins.
pub const URL_VARS: [&str; 2] = ["KV_REST_API_URL", "UPSTASH_REDIS_REST_URL"];
/// Store token variables, first present wins.
pub const TOKEN_VARS: [&str; 2] = ["KV_REST_API_TOKEN", "UPSTASH_REDIS_REST_TOKEN"];

/// Swap the document only while the stored `version` matches `ARGV[1]`
/// (empty: only while the key is absent).
const COMPARE_AND_SET_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '' then
  if current then return 0 end
else
  if not current then return 0 end
  local stored = cjson.decode(current)
  if tostring(stored['version']) ~= ARGV[1] then return 0 end
end
redis.call('SET', KEYS[1], ARGV[2])
return 1
";

#[derive(Clone, PartialEq, Eq)]
pub struct UpstashConfig {
    pub url: String,
    pub token: String,
    pub key: String,
}

impl std::fmt::Debug for UpstashConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("UpstashConfig")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .field("key", &self.key)
            .finish()
    }
}

impl UpstashConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            key: DOCUMENT_KEY.to_string(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Resolve credentials from the environment-style `lookup`.
    pub fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = resolve_url(&lookup);
        let token = resolve_token(&lookup);

        match (url, token) {
            (Some(url), Some(token)) => Ok(Self::new(url, token)),
            (url, token) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push(URL_VARS.join(" or "));
                }
                if token.is_none() {
                    missing.push(TOKEN_VARS.join(" or "));
                }
                Err(StoreError::NotConfigured {
                    missing: missing.join(", "),
                })
            }
        }
    }
}

pub fn resolve_url<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    first_present(lookup, &URL_VARS)
}

pub fn resolve_token<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    first_present(lookup, &TOKEN_VARS)
}

fn first_present<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .find_map(|name| normalize_text_option(lookup(name)))
}

#[derive(Debug, Clone)]
pub struct UpstashStore {
    config: UpstashConfig,
    client: reqwest::Client,
}

impl UpstashStore {
    pub fn new(config: UpstashConfig) -> StoreResult<Self> {
        if !is_http_url(&config.url) {
            return Err(StoreError::NotConfigured {
                missing: "a store URL starting with http:// or https://".to_string(),
            });
        }
        let config = UpstashConfig {
            url: config.url.trim_end_matches('/').to_string(),
            ..config
        };
        Ok(Self {
            config,
            client: reqwest::Client::builder().build()?,
        })
    }

    async fn command(&self, args: Value) -> StoreResult<Value> {
        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .header("Accept", "application/json")
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_reply(status, &body)
    }
}

#[async_trait]
impl DocumentStore for UpstashStore {
    fn backend_name(&self) -> &'static str {
        "upstash"
    }

    async fn load(&self) -> StoreResult<Option<CloudDocument>> {
        let result = self.command(json!(["GET", self.config.key])).await?;
        decode_document(result)
    }

    async fn replace(
        &self,
        expected_version: Option<u64>,
        document: &CloudDocument,
    ) -> StoreResult<bool> {
        let expected = expected_version.map(|version| version.to_string()).unwrap_or_default();
        let encoded = serde_json::to_string(document)?;
        let result = self
            .command(json!([
                "EVAL",
                COMPARE_AND_SET_SCRIPT,
                "1",
                self.config.key,
                expected,
                encoded
            ]))
            .await?;

        match result.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(StoreError::Api(format!(
                "unexpected compare-and-set reply: {}",
                compact_text(&result.to_string())
            ))),
        }
    }

    async fn remove(&self) -> StoreResult<()> {
        self.command(json!(["DEL", self.config.key])).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UpstashReply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

fn parse_reply(status: StatusCode, body: &str) -> StoreResult<Value> {
    let reply = serde_json::from_str::<UpstashReply>(body).ok();

    if let Some(error) = reply.as_ref().and_then(|reply| reply.error.as_deref()) {
        return Err(StoreError::Api(format!(
            "{} ({})",
            error.trim(),
            status.as_u16()
        )));
    }

    if !status.is_success() {
        let trimmed = compact_text(body);
        return Err(StoreError::Api(if trimmed.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            format!("{} ({})", trimmed, status.as_u16())
        }));
    }

    reply
        .map(|reply| reply.result)
        .ok_or_else(|| StoreError::Api(format!("unreadable reply: {}", compact_text(body))))
}

fn decode_document(result: Value) -> StoreResult<Option<CloudDocument>> {
    match result {
        Value::Null => Ok(None),
        Value::String(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
        Value::Object(_) => Ok(Some(serde_json::from_value(result)?)),
        other => Err(StoreError::Api(format!(
            "unexpected GET reply: {}",
            compact_text(&other.to_string())
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn from_lookup_prefers_kv_variables() {
        let config = UpstashConfig::from_lookup(lookup_from(&[
            ("KV_REST_API_URL", "https://kv.example.com"),
            ("UPSTASH_REDIS_REST_URL", "https://upstash.example.com"),
            ("UPSTASH_REDIS_REST_TOKEN", "token-b"),
        ]))
        .unwrap();

        assert_eq!(config.url, "https://kv.example.com");
        assert_eq!(config.token, "token-b");
        assert_eq!(config.key, DOCUMENT_KEY);
    }

    #[test]
    fn from_lookup_reports_missing_variables() {
        let error = UpstashConfig::from_lookup(lookup_from(&[("KV_REST_API_TOKEN", "t")]))
            .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("KV_REST_API_URL"));
        assert!(!message.contains("KV_REST_API_TOKEN"));
        assert_eq!(error.kind(), "NotConfigured");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let lookup = lookup_from(&[
            ("KV_REST_API_URL", "   "),
            ("UPSTASH_REDIS_REST_URL", "https://upstash.example.com"),
        ]);
        assert_eq!(
            resolve_url(&lookup).as_deref(),
            Some("https://upstash.example.com")
        );
        assert_eq!(resolve_token(&lookup), None);
    }

    #[test]
    fn config_debug_redacts_token() {
        let config = UpstashConfig::new("https://kv.example.com", "super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn store_rejects_non_http_url() {
        let error = UpstashStore::new(UpstashConfig::new("kv.example.com", "t")).unwrap_err();
        assert!(matches!(error, StoreError::NotConfigured { .. }));
    }

    #[test]
    fn parse_reply_surfaces_store_errors() {
        let error = parse_reply(
            StatusCode::BAD_REQUEST,
            r#"{"error":"ERR wrong number of arguments"}"#,
        )
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Document store error: ERR wrong number of arguments (400)"
        );

        let error = parse_reply(StatusCode::UNAUTHORIZED, "").unwrap_err();
        assert_eq!(error.to_string(), "Document store error: HTTP 401");

        assert_eq!(
            parse_reply(StatusCode::OK, r#"{"result":1}"#).unwrap(),
            json!(1)
        );
    }

    #[test]
    fn decode_document_reads_json_string_and_null() {
        assert!(decode_document(Value::Null).unwrap().is_none());

        let encoded = json!({
            "bookings": [{ "id": "b1" }],
            "services": [],
            "users": [],
            "lastModified": "2024-01-01T00:00:00.000Z",
            "version": 5,
            "deviceId": "device_a"
        })
        .to_string();
        let document = decode_document(Value::String(encoded)).unwrap().unwrap();
        assert_eq!(document.version, 5);
        assert_eq!(document.bookings.len(), 1);

        let error = decode_document(Value::String("{not json".to_string())).unwrap_err();
        assert_eq!(error.kind(), "CorruptDocument");
    }
}
