mod chat;
mod health;
mod metrics;
mod questions;

pub use chat::{chat_handler, chat_status_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use questions::questions_handler;

use axum::Router;
use axum::http::{HeaderMap, HeaderValue};
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use crate::error::{GatewayError, Result};
use crate::metrics::{RATE_LIMITED, UPSTREAM_TIMEOUTS};
use crate::rate_limit::RateDecision;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler).get(chat_status_handler))
        .route("/api/questions", post(questions_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// Quota verdict as an error, so handlers can use `?`
fn admit(decision: &RateDecision, client: &str) -> Result<()> {
    if decision.allowed {
        return Ok(());
    }
    RATE_LIMITED.inc();
    tracing::info!(client, retry_after = decision.retry_after_secs, "rate limit exceeded");
    Err(GatewayError::QuotaExceeded {
        retry_after_secs: decision.retry_after_secs,
    })
}

// Races an upstream call against its budget; the loser is dropped
async fn with_timeout<T>(budget: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => {
            UPSTREAM_TIMEOUTS.inc();
            tracing::warn!(budget_ms = budget.as_millis() as u64, "upstream call timed out");
            Err(GatewayError::Timeout)
        }
    }
}

fn apply_rate_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    let reset_at = chrono::Utc::now()
        + chrono::Duration::milliseconds(decision.reset_after.as_millis() as i64);

    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    if let Ok(value) = HeaderValue::from_str(&reset_at.to_rfc3339()) {
        headers.insert("x-ratelimit-reset", value);
    }
    if !decision.allowed {
        headers.insert("retry-after", HeaderValue::from(decision.retry_after_secs));
    }
}
