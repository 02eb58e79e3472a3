use std::sync::Arc;
use crate::config::GatewaySettings;
use crate::dedup::Deduplicator;
use crate::models::QuestionSet;
use crate::rate_limit::RateLimiter;
use crate::upstream::Upstream;

// app's shared state, one per process, handed to every handler
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
    pub rate_limiter: RateLimiter,
    pub settings: GatewaySettings,
    pub chats: Deduplicator<String>,         // chat_<sha256> -> reply
    pub questions: Deduplicator<QuestionSet>, // level_<id> -> question set
}

impl AppState {
    pub fn new(upstream: Arc<dyn Upstream>, settings: GatewaySettings) -> Self {
        Self {
            upstream,
            rate_limiter: RateLimiter::new(),
            settings,
            chats: Deduplicator::new(),
            questions: Deduplicator::new(),
        }
    }
}
