//! Backend that talks to the remote store endpoint over HTTP.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{SyncBackend, SyncError, SyncResult};
use crate::config::normalize_endpoint;
use crate::document::{ClearAck, CloudDocument, PushAck, PushPayload};
use crate::util::compact_text;

pub const SYNC_PATH: &str = "/api/sync";

#[derive(Debug, Clone)]
pub struct HttpSyncBackend {
    url: String,
    client: reqwest::Client,
}

impl HttpSyncBackend {
    /// Backend for the endpoint served under `base_url`.
    pub fn new(base_url: &str) -> SyncResult<Self> {
        let base = normalize_endpoint(base_url)
            .map_err(|error| SyncError::InvalidConfiguration(error.to_string()))?;
        Ok(Self {
            url: format!("{base}{SYNC_PATH}"),
            client: reqwest::Client::builder().build()?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> SyncResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }

        serde_json::from_str(&body).map_err(|error| {
            SyncError::InvalidPayload(format!("{error}: {}", compact_text(&body)))
        })
    }
}

#[async_trait]
impl SyncBackend for HttpSyncBackend {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> SyncResult<CloudDocument> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn push(&self, payload: &PushPayload) -> SyncResult<PushAck> {
        let response = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(payload)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn clear(&self) -> SyncResult<ClearAck> {
        let response = self
            .client
            .delete(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::read_json(response).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_appends_sync_path() {
        let backend = HttpSyncBackend::new("https://aat.example.com/").unwrap();
        assert_eq!(backend.url(), "https://aat.example.com/api/sync");
    }

    #[test]
    fn new_rejects_invalid_endpoint() {
        assert!(matches!(
            HttpSyncBackend::new("aat.example.com"),
            Err(SyncError::InvalidConfiguration(_))
        ));
        assert!(HttpSyncBackend::new("  ").is_err());
    }

    #[test]
    fn parse_api_error_prefers_message_then_error() {
        assert_eq!(
            parse_api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"Internal server error","message":"store offline"}"#
            ),
            "store offline"
        );
        assert_eq!(
            parse_api_error(
                StatusCode::METHOD_NOT_ALLOWED,
                r#"{"error":"Method not allowed"}"#
            ),
            "Method not allowed"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, ""),
            "Bad Gateway"
        );
    }

    #[test]
    fn api_error_display_includes_status() {
        let error = SyncError::Api {
            status: 500,
            message: "store offline".to_string(),
        };
        assert_eq!(error.to_string(), "store offline (HTTP 500)");
    }
}
