use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::Arc;
use crate::cache::chat_key;
use crate::client::ClientId;
use crate::error::{GatewayError, Result};
use crate::handlers::{admit, apply_rate_headers, with_timeout};
use crate::metrics::REQUEST_TOTAL;
use crate::models::{ChatRequest, ChatResponse, StatusResponse};
use crate::prompt::chat_prompt;
use crate::state::AppState;

// POST /api/chat
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    client: ClientId,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    REQUEST_TOTAL.inc();

    // validation runs before the caller's quota is touched
    let request = match body
        .map_err(|_| GatewayError::validation("Request body must be valid JSON"))
        .and_then(|Json(value)| ChatRequest::from_value(value))
    {
        Ok(request) => request,
        Err(err) => {
            tracing::info!(client = client.as_str(), error = %err, "invalid chat request");
            return err.into_response();
        }
    };

    let decision = state
        .rate_limiter
        .check(client.as_str(), &state.settings.rate_limit);
    let outcome = match admit(&decision, client.as_str()) {
        Ok(()) => reply(&state, request).await,
        Err(err) => Err(err),
    };

    let mut response = outcome
        .map(|message| Json(ChatResponse { message }))
        .into_response();
    apply_rate_headers(response.headers_mut(), &decision);
    response
}

async fn reply(state: &AppState, request: ChatRequest) -> Result<String> {
    if !state.upstream.is_configured() {
        tracing::warn!("chat requested but no upstream api key is configured");
        return Err(GatewayError::NotConfigured);
    }

    let key = chat_key(&request);
    let prompt = chat_prompt(&request);
    let upstream = Arc::clone(&state.upstream);
    tracing::debug!(action = request.action.as_str(), turns = prompt.turns.len(), "calling upstream");

    let call = state
        .chats
        .get_or_create(&key, move || async move { upstream.generate(&prompt).await });
    with_timeout(state.settings.chat_timeout, call).await
}

// GET /api/chat
pub async fn chat_status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        configured: state.upstream.is_configured(),
        model: state.upstream.model().to_string(),
    })
}
