use aat_core::store::StoreError;
use aat_core::util::{compact_text, sanitize};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Request context attached to store failures. Carries flags, never secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDebug {
    pub method: &'static str,
    pub operation: &'static str,
    pub has_url: bool,
    pub has_token: bool,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("{source}")]
    Store {
        source: StoreError,
        debug: FailureDebug,
    },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<DebugBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugBody {
    #[serde(flatten)]
    context: FailureDebug,
    error_type: &'static str,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub const fn store(source: StoreError, debug: FailureDebug) -> Self {
        Self::Store { source, debug }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Bad request".to_string(),
                    message: Some(compact_text(&message)),
                    debug: None,
                },
            ),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorBody {
                    error: "Method not allowed".to_string(),
                    message: None,
                    debug: None,
                },
            ),
            Self::Store { source, debug: context } => {
                tracing::error!(
                    endpoint = context.operation,
                    method = context.method,
                    error_type = source.kind(),
                    error = %sanitize(&source),
                    "Sync store operation failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Internal server error".to_string(),
                        message: Some(compact_text(&sanitize(&source))),
                        debug: Some(DebugBody {
                            error_type: source.kind(),
                            context,
                        }),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
