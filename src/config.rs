use clap::Parser;
use std::time::Duration;
use crate::rate_limit::RateLimitConfig;
use crate::upstream::GeminiSettings;

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "quiz-gateway")]
#[command(about = "Rate-limited AI chat and question gateway for the cyber quiz game")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Upstream API key; without it the AI endpoints answer 503
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub model: String,

    #[arg(long, env = "GEMINI_MAX_OUTPUT_TOKENS", default_value_t = 500)]
    pub max_output_tokens: u32,

    #[arg(long, env = "GEMINI_TEMPERATURE", default_value_t = 0.7)]
    pub temperature: f32,

    #[arg(
        long,
        env = "GEMINI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub base_url: String,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = 60_000)]
    pub rate_window_ms: u64,

    // Budget for one chat call in milliseconds
    #[arg(long, env = "CHAT_TIMEOUT_MS", default_value_t = 10_000)]
    pub chat_timeout_ms: u64,

    // Budget for one question-generation call in milliseconds
    #[arg(long, env = "GENERATION_TIMEOUT_MS", default_value_t = 30_000)]
    pub generation_timeout_ms: u64,

    // Default log filter, RUST_LOG wins when set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

// Runtime knobs of the gateway itself
#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    pub rate_limit: RateLimitConfig,
    pub chat_timeout: Duration,
    pub generation_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            chat_timeout: Duration::from_millis(10_000),
            generation_timeout: Duration::from_millis(30_000),
        }
    }
}

impl Args {
    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            rate_limit: RateLimitConfig {
                max_requests: self.rate_limit,
                window: Duration::from_millis(self.rate_window_ms),
            },
            chat_timeout: Duration::from_millis(self.chat_timeout_ms),
            generation_timeout: Duration::from_millis(self.generation_timeout_ms),
        }
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }
}
