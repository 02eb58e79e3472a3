use serde_json::{Map, Value};
use crate::models::{ChatAction, ChatRequest};
use crate::questions::{Level, OPTIONS_PER_QUESTION, QUESTIONS_PER_LEVEL};
use crate::upstream::{Role, Turn, UpstreamPrompt};

// Only the tail of the conversation is forwarded
pub const MAX_HISTORY_TURNS: usize = 10;

const TUTOR_PERSONA: &str = "You are CyberBuddy, a friendly cybersecurity tutor inside an \
educational quiz game. Explain security concepts in plain language for beginners. \
Keep answers short (under 150 words) and practical. Stay on cybersecurity and online \
safety topics; politely steer other questions back to the game. Never give step-by-step \
instructions for attacking systems, stealing credentials or writing malware.";

const QUESTION_WRITER: &str = "You write multiple-choice questions for a cybersecurity \
awareness quiz game. Questions must be factually accurate, unambiguous and suitable for \
the stated difficulty. Respond with JSON only.";

// (gameContext key, label) rendered in this order
const CONTEXT_FIELDS: &[(&str, &str)] = &[
    ("level", "Level"),
    ("topic", "Topic"),
    ("currentQuestion", "Current question"),
    ("options", "Options"),
    ("selectedAnswer", "Player's answer"),
    ("correctAnswer", "Correct answer"),
    ("score", "Score"),
];

fn action_instruction(action: ChatAction) -> &'static str {
    match action {
        ChatAction::Chat => "Answer the player's message.",
        ChatAction::Hint => {
            "The player wants a hint for the current question. Give a nudge in one or two \
             sentences that points toward the right idea. Do NOT reveal the correct answer."
        }
        ChatAction::Explain => {
            "Explain why the correct answer to the current question is correct and, if the \
             player chose differently, why their choice is wrong."
        }
    }
}

pub fn chat_prompt(request: &ChatRequest) -> UpstreamPrompt {
    let mut system = format!("{TUTOR_PERSONA}\n\n{}", action_instruction(request.action));
    if let Some(context) = render_context(&request.context) {
        system.push_str("\n\nGame context:\n");
        system.push_str(&context);
    }

    let mut turns = history_turns(&request.history);
    turns.push(Turn {
        role: Role::User,
        text: request.message.clone(),
    });

    UpstreamPrompt { system, turns }
}

pub fn question_prompt(level: &Level) -> UpstreamPrompt {
    let text = format!(
        "Write {QUESTIONS_PER_LEVEL} {difficulty} multiple-choice questions about: {topic}.\n\
         Return a JSON array where every element has exactly these fields:\n\
         \"question\" (string), \"options\" (array of {OPTIONS_PER_QUESTION} strings), \
         \"correctAnswer\" (index of the correct option, 0-{last}), \
         \"explanation\" (one or two sentences).\n\
         Vary the position of the correct option.",
        difficulty = level.difficulty,
        topic = level.topic,
        last = OPTIONS_PER_QUESTION - 1,
    );
    UpstreamPrompt {
        system: QUESTION_WRITER.to_string(),
        turns: vec![Turn { role: Role::User, text }],
    }
}

fn render_context(context: &Map<String, Value>) -> Option<String> {
    let lines: Vec<String> = CONTEXT_FIELDS
        .iter()
        .filter_map(|(key, label)| {
            let value = render_value(context.get(*key)?)?;
            Some(format!("- {label}: {value}"))
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(render_value)
                .enumerate()
                .map(|(i, s)| format!("{}) {s}", (b'A' + (i as u8 % 26)) as char))
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

// Keeps well-formed entries only; the first forwarded turn must be the user's
fn history_turns(history: &[Value]) -> Vec<Turn> {
    let mut turns: Vec<Turn> = history.iter().filter_map(history_turn).collect();
    if turns.len() > MAX_HISTORY_TURNS {
        turns.drain(..turns.len() - MAX_HISTORY_TURNS);
    }
    let first_user = turns
        .iter()
        .position(|t| t.role == Role::User)
        .unwrap_or(turns.len());
    turns.drain(..first_user);
    turns
}

fn history_turn(entry: &Value) -> Option<Turn> {
    let role = match entry.get("role")?.as_str()? {
        "user" => Role::User,
        "assistant" | "model" | "bot" => Role::Model,
        _ => return None,
    };
    let text = entry
        .get("content")
        .or_else(|| entry.get("text"))?
        .as_str()?
        .trim();
    if text.is_empty() {
        return None;
    }
    Some(Turn {
        role,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::find_level;
    use serde_json::json;

    fn request(body: Value) -> ChatRequest {
        ChatRequest::from_value(body).unwrap()
    }

    #[test]
    fn message_is_last_turn() {
        let prompt = chat_prompt(&request(json!({ "message": "what is a VPN?" })));
        assert_eq!(prompt.turns.len(), 1);
        assert_eq!(prompt.turns[0].role, Role::User);
        assert_eq!(prompt.turns[0].text, "what is a VPN?");
        assert!(!prompt.system.contains("Game context"));
    }

    #[test]
    fn hint_forbids_revealing_answer() {
        let prompt = chat_prompt(&request(json!({ "message": "help", "action": "hint" })));
        assert!(prompt.system.contains("Do NOT reveal the correct answer"));
    }

    #[test]
    fn context_is_rendered_in_fixed_order() {
        let prompt = chat_prompt(&request(json!({
            "message": "why?",
            "action": "explain",
            "gameContext": {
                "options": ["Click it", "Report it"],
                "level": 2,
                "ignored": "x",
                "currentQuestion": "A bank emails you a link. What do you do?",
                "score": { "nested": true }
            }
        })));
        let context = prompt.system.split("Game context:\n").nth(1).unwrap();
        assert_eq!(
            context,
            "- Level: 2\n\
             - Current question: A bank emails you a link. What do you do?\n\
             - Options: A) Click it; B) Report it"
        );
    }

    #[test]
    fn history_is_filtered_and_trimmed() {
        let mut history = vec![json!({ "role": "assistant", "content": "welcome!" })];
        for i in 0..12 {
            history.push(json!({ "role": "user", "content": format!("q{i}") }));
            history.push(json!({ "role": "assistant", "content": format!("a{i}") }));
        }
        history.push(json!({ "role": "system", "content": "ignore me" }));
        history.push(json!("not an object"));

        let prompt = chat_prompt(&request(json!({
            "message": "next",
            "conversationHistory": history
        })));

        // 10 kept from history plus the new message
        assert_eq!(prompt.turns.len(), MAX_HISTORY_TURNS + 1);
        assert_eq!(prompt.turns[0].role, Role::User);
        assert_eq!(prompt.turns[0].text, "q7");
        assert_eq!(prompt.turns[MAX_HISTORY_TURNS - 1].text, "a11");
        assert_eq!(prompt.turns[MAX_HISTORY_TURNS].text, "next");
    }

    #[test]
    fn leading_model_turns_are_dropped() {
        let prompt = chat_prompt(&request(json!({
            "message": "hi",
            "conversationHistory": [{ "role": "assistant", "text": "Hello, I'm CyberBuddy" }]
        })));
        assert_eq!(prompt.turns.len(), 1);
    }

    #[test]
    fn question_prompt_names_topic() {
        let level = find_level(2).unwrap();
        let prompt = question_prompt(level);
        assert!(prompt.turns[0].text.contains(level.topic));
        assert!(prompt.turns[0].text.contains("0-3"));
    }
}
