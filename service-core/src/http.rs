//! Conversion of upstream HTTP responses into `AppError`.
//!
//! | HTTP status | AppError |
//! |-------------|----------|
//! | `400` | `BadRequest` |
//! | `401` | `Unauthorized` |
//! | `403` | `Forbidden` |
//! | `404` | `NotFound` |
//! | `409` | `Conflict` |
//! | `429` | `TooManyRequests` |
//! | `503` | `ServiceUnavailable` |
//! | other `5xx` | `BadGateway` |

use reqwest::{Response, StatusCode};
use serde::Deserialize;

use crate::error::AppError;

/// Error body returned by the storage and REST gateways.
///
/// Both gateways put a human readable `message` at the top level; the
/// storage gateway also sends a short `error` label.
#[derive(Debug, Default, Deserialize)]
pub struct UpstreamError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl UpstreamError {
    fn describe(&self, raw_body: &str) -> String {
        match (&self.message, &self.error) {
            (Some(message), _) if !message.is_empty() => message.clone(),
            (_, Some(error)) if !error.is_empty() => error.clone(),
            _ if !raw_body.is_empty() => raw_body.to_string(),
            _ => "no error body".to_string(),
        }
    }
}

/// Map a non-success status and its body to an `AppError`.
pub fn error_from_status(status: StatusCode, body: &str) -> AppError {
    let parsed: UpstreamError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.describe(body);

    match status {
        StatusCode::BAD_REQUEST => AppError::BadRequest(anyhow::anyhow!(message)),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(anyhow::anyhow!(message)),
        StatusCode::FORBIDDEN => AppError::Forbidden(anyhow::anyhow!(message)),
        StatusCode::NOT_FOUND => AppError::NotFound(anyhow::anyhow!(message)),
        StatusCode::CONFLICT => AppError::Conflict(anyhow::anyhow!(message)),
        StatusCode::TOO_MANY_REQUESTS => AppError::TooManyRequests(message, None),
        StatusCode::SERVICE_UNAVAILABLE => AppError::ServiceUnavailable,
        s if s.is_server_error() => AppError::BadGateway(format!("{}: {}", s, message)),
        s => AppError::InternalError(anyhow::anyhow!("unexpected status {}: {}", s, message)),
    }
}

/// Return the response unchanged when successful, otherwise read its body
/// and convert it into an `AppError`.
pub async fn ensure_success(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = %status, body = %body, "Upstream request failed");
    Err(error_from_status(status, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_uses_message_field() {
        let body = r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#;
        let err = error_from_status(StatusCode::CONFLICT, body);
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "Conflict: The resource already exists");
    }

    #[test]
    fn falls_back_to_error_label_then_raw_body() {
        let err = error_from_status(StatusCode::NOT_FOUND, r#"{"error":"not_found"}"#);
        assert_eq!(err.to_string(), "Not found: not_found");

        let err = error_from_status(StatusCode::BAD_REQUEST, "plain text failure");
        assert_eq!(err.to_string(), "Bad request: plain text failure");
    }

    #[test]
    fn server_errors_map_to_gateway_errors() {
        let err = error_from_status(StatusCode::BAD_GATEWAY, "");
        assert!(matches!(err, AppError::BadGateway(_)));

        let err = error_from_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(matches!(err, AppError::ServiceUnavailable));
    }

    #[test]
    fn rate_limits_keep_the_message() {
        let err = error_from_status(StatusCode::TOO_MANY_REQUESTS, r#"{"message":"slow down"}"#);
        match err {
            AppError::TooManyRequests(msg, retry) => {
                assert_eq!(msg, "slow down");
                assert!(retry.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
