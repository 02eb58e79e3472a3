use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::error::{GatewayError, Result};

pub const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatAction {
    #[default]
    Chat,
    Hint,
    Explain,
}

impl ChatAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(Self::Chat),
            "hint" => Some(Self::Hint),
            "explain" => Some(Self::Explain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Hint => "hint",
            Self::Explain => "explain",
        }
    }
}

// Chat body as sent by the browser; every field is checked by `ChatRequest::from_value`
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawChatRequest {
    message: Option<Value>,
    conversation_history: Option<Value>,
    game_context: Option<Value>,
    action: Option<Value>,
}

// Validated chat request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<Value>,
    pub context: Map<String, Value>,
    pub action: ChatAction,
}

impl ChatRequest {
    /// Checks every constraint and reports all violations at once.
    pub fn from_value(body: Value) -> Result<Self> {
        let raw: RawChatRequest = serde_json::from_value(body)
            .map_err(|_| GatewayError::validation("Request body must be a JSON object"))?;

        let mut violations = Vec::new();

        let message = match raw.message {
            Some(Value::String(s)) => {
                if s.trim().is_empty() {
                    violations.push("Message cannot be empty".to_string());
                } else if s.chars().count() > MAX_MESSAGE_CHARS {
                    violations.push(format!(
                        "Message must be {MAX_MESSAGE_CHARS} characters or less"
                    ));
                }
                s
            }
            _ => {
                violations.push("Message is required and must be a string".to_string());
                String::new()
            }
        };

        let history = match raw.conversation_history {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                violations.push("Conversation history must be an array".to_string());
                Vec::new()
            }
        };

        let context = match raw.game_context {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                violations.push("Game context must be an object".to_string());
                Map::new()
            }
        };

        let action = match raw.action {
            None | Some(Value::Null) => Some(ChatAction::default()),
            Some(Value::String(s)) => ChatAction::parse(&s),
            Some(_) => None,
        }
        .unwrap_or_else(|| {
            violations.push("Action must be one of: chat, hint, explain".to_string());
            ChatAction::default()
        });

        if !violations.is_empty() {
            return Err(GatewayError::Validation(violations));
        }

        Ok(Self {
            message: message.trim().to_string(),
            history,
            context,
            action,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub configured: bool,
    pub model: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawQuestionsRequest {
    level_id: Option<Value>,
}

/// Pulls the level id out of a question-generation body.
/// Accepts a positive integer or a numeric string.
pub fn parse_level_id(body: Value) -> Result<u32> {
    let raw: RawQuestionsRequest = serde_json::from_value(body)
        .map_err(|_| GatewayError::validation("Request body must be a JSON object"))?;

    let id = match raw.level_id {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    id.and_then(|id| u32::try_from(id).ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| GatewayError::validation("levelId is required and must be a positive integer"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub level_id: u32,
    pub topic: String,
    pub questions: Vec<Question>,
}
