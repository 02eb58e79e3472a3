use sha2::{Digest, Sha256};
use serde_json::Value;
use crate::models::ChatRequest;

// Dedup key for question generation
pub fn level_key(level_id: u32) -> String {
    format!("level_{level_id}")
}

// Dedup key for a chat request (hash of action + message + context + history)
pub fn chat_key(req: &ChatRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(req.action.as_str());
    hasher.update([0u8]);
    hasher.update(&req.message);
    hasher.update([0u8]);
    // serde_json maps are sorted, so equal contexts serialize identically
    hasher.update(Value::Object(req.context.clone()).to_string());
    hasher.update([0u8]);
    hasher.update(Value::Array(req.history.clone()).to_string());
    format!("chat_{:x}", hasher.finalize())
}
