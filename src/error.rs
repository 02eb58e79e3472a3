use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

// Errors surfaced at the request boundary.
// Clone so one failure can be handed to every deduplicated waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    QuotaExceeded { retry_after_secs: u64 },
    #[error("upstream api key is not configured")]
    NotConfigured,
    #[error("upstream call timed out")]
    Timeout,
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotConfigured | Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        // upstream detail stays in the logs
        let body = match &self {
            Self::Validation(details) => json!({
                "error": "Validation failed",
                "details": details,
            }),
            Self::QuotaExceeded { retry_after_secs } => json!({
                "error": "Too many requests. Please wait before trying again.",
                "retryAfter": retry_after_secs,
            }),
            Self::NotConfigured => json!({ "error": "AI service is not configured" }),
            Self::Timeout => json!({ "error": "Request timeout. Please try again." }),
            Self::UpstreamUnavailable(_) => json!({
                "error": "AI service is temporarily unavailable. Please try again later."
            }),
            Self::Upstream(_) => json!({
                "error": "Failed to get a response from the AI service."
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_class() {
        assert_eq!(GatewayError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::QuotaExceeded { retry_after_secs: 3 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(GatewayError::NotConfigured.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(GatewayError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            GatewayError::Upstream("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn upstream_detail_is_not_leaked() {
        let response = GatewayError::Upstream("secret key abc rejected".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret"));
    }
}
