use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::Arc;
use crate::cache::level_key;
use crate::client::ClientId;
use crate::error::{GatewayError, Result};
use crate::handlers::{admit, apply_rate_headers, with_timeout};
use crate::metrics::REQUEST_TOTAL;
use crate::models::{QuestionSet, parse_level_id};
use crate::prompt::question_prompt;
use crate::questions::{Level, find_level, parse_questions};
use crate::state::AppState;

// POST /api/questions
pub async fn questions_handler(
    State(state): State<Arc<AppState>>,
    client: ClientId,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    REQUEST_TOTAL.inc();

    let level = match body
        .map_err(|_| GatewayError::validation("Request body must be valid JSON"))
        .and_then(|Json(value)| parse_level_id(value))
        .and_then(|id| {
            find_level(id).ok_or_else(|| GatewayError::validation(format!("Unknown level: {id}")))
        }) {
        Ok(level) => level,
        Err(err) => {
            tracing::info!(client = client.as_str(), error = %err, "invalid question request");
            return err.into_response();
        }
    };

    let decision = state
        .rate_limiter
        .check(client.as_str(), &state.settings.rate_limit);
    let outcome = match admit(&decision, client.as_str()) {
        Ok(()) => generate(&state, level).await,
        Err(err) => Err(err),
    };

    let mut response = outcome.map(Json).into_response();
    apply_rate_headers(response.headers_mut(), &decision);
    response
}

async fn generate(state: &AppState, level: &'static Level) -> Result<QuestionSet> {
    if !state.upstream.is_configured() {
        tracing::warn!("questions requested but no upstream api key is configured");
        return Err(GatewayError::NotConfigured);
    }

    let key = level_key(level.id);
    let upstream = Arc::clone(&state.upstream);
    let call = state.questions.get_or_create(&key, move || async move {
        let text = upstream.generate(&question_prompt(level)).await?;
        let questions = parse_questions(&text)?;
        tracing::info!(level = level.id, count = questions.len(), "generated questions");
        Ok::<_, GatewayError>(QuestionSet {
            level_id: level.id,
            topic: level.topic.to_string(),
            questions,
        })
    });
    with_timeout(state.settings.generation_timeout, call).await
}
