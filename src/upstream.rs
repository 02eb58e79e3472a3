use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use crate::error::{GatewayError, Result};
use crate::metrics::{UPSTREAM_ERRORS, UPSTREAM_LATENCY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

// Everything the upstream needs for one generation
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamPrompt {
    pub system: String,
    pub turns: Vec<Turn>, // last one is the new user message
}

/// A generative text backend.
#[async_trait]
pub trait Upstream: Send + Sync {
    fn model(&self) -> &str;

    /// False when no credentials are present; callers must not call `generate` then.
    fn is_configured(&self) -> bool;

    async fn generate(&self, prompt: &UpstreamPrompt) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

// Gemini generateContent over REST
pub struct GeminiClient {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, mut settings: GeminiSettings) -> Self {
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        // blank key behaves like a missing one
        settings.api_key = settings.api_key.filter(|k| !k.trim().is_empty());
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        )
    }

    fn request_body(&self, prompt: &UpstreamPrompt) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: prompt.system.clone() }],
            },
            contents: prompt
                .turns
                .iter()
                .map(|turn| Content {
                    role: Some(turn.role),
                    parts: vec![Part { text: turn.text.clone() }],
                })
                .collect(),
            generation_config: GenerationConfig {
                max_output_tokens: self.settings.max_output_tokens,
                temperature: self.settings.temperature,
            },
        }
    }
}

#[async_trait]
impl Upstream for GeminiClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    async fn generate(&self, prompt: &UpstreamPrompt) -> Result<String> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(GatewayError::NotConfigured)?;

        let start_time = Instant::now();
        let result = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(prompt))
            .send()
            .await;
        UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

        let res = result.map_err(|e| {
            UPSTREAM_ERRORS.inc();
            tracing::error!(error = %e, "upstream request failed");
            GatewayError::UpstreamUnavailable(format!("request failed: {e}"))
        })?;

        let status = res.status();
        if !status.is_success() {
            UPSTREAM_ERRORS.inc();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "upstream returned an error");
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                    GatewayError::UpstreamUnavailable(format!("status {status}"))
                }
                _ => GatewayError::Upstream(format!("status {status}")),
            });
        }

        let body = res.json::<GenerateContentResponse>().await.map_err(|e| {
            UPSTREAM_ERRORS.inc();
            GatewayError::Upstream(format!("parse error: {e}"))
        })?;

        body.first_text().ok_or_else(|| {
            UPSTREAM_ERRORS.inc();
            tracing::warn!("upstream returned no candidate text");
            GatewayError::Upstream("empty response".to_string())
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        let text = text.trim();
        if text.is_empty() { None } else { Some(text.to_string()) }
    }
}
