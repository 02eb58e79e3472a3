use serde_json::Value;
use crate::error::{GatewayError, Result};
use crate::models::Question;

pub const QUESTIONS_PER_LEVEL: usize = 5;
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub id: u32,
    pub topic: &'static str,
    pub difficulty: &'static str,
}

pub const LEVELS: &[Level] = &[
    Level { id: 1, topic: "Password security and password managers", difficulty: "beginner" },
    Level { id: 2, topic: "Recognising phishing emails and messages", difficulty: "beginner" },
    Level { id: 3, topic: "Multi-factor authentication", difficulty: "beginner" },
    Level { id: 4, topic: "Safe browsing and HTTPS", difficulty: "intermediate" },
    Level { id: 5, topic: "Social engineering tactics", difficulty: "intermediate" },
    Level { id: 6, topic: "Malware and ransomware", difficulty: "intermediate" },
    Level { id: 7, topic: "Privacy and personal data on social media", difficulty: "advanced" },
    Level { id: 8, topic: "Public Wi-Fi, VPNs and network safety", difficulty: "advanced" },
];

pub fn find_level(id: u32) -> Option<&'static Level> {
    LEVELS.iter().find(|level| level.id == id)
}

/// Parses generated questions out of model output.
///
/// The model is asked for a bare JSON array but often wraps it in a markdown
/// fence or adds prose, so everything outside the outermost brackets is
/// ignored. Malformed questions are dropped; an empty result is an error.
pub fn parse_questions(text: &str) -> Result<Vec<Question>> {
    let json = extract_array(text)
        .ok_or_else(|| GatewayError::Upstream("no JSON array in generated questions".to_string()))?;

    let items: Vec<Value> = serde_json::from_str(json)
        .map_err(|e| GatewayError::Upstream(format!("invalid question JSON: {e}")))?;
    let total = items.len();

    let questions: Vec<Question> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Question>(item).ok())
        .filter_map(normalize)
        .take(QUESTIONS_PER_LEVEL)
        .collect();

    if questions.len() < total.min(QUESTIONS_PER_LEVEL) {
        tracing::warn!(
            kept = questions.len(),
            total,
            "dropped malformed generated questions"
        );
    }
    if questions.is_empty() {
        return Err(GatewayError::Upstream("no valid generated questions".to_string()));
    }
    Ok(questions)
}

fn extract_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

fn normalize(mut q: Question) -> Option<Question> {
    q.question = q.question.trim().to_string();
    q.explanation = q.explanation.trim().to_string();
    for option in q.options.iter_mut() {
        *option = option.trim().to_string();
    }
    let valid = !q.question.is_empty()
        && q.options.len() == OPTIONS_PER_QUESTION
        && q.options.iter().all(|o| !o.is_empty())
        && q.correct_answer < OPTIONS_PER_QUESTION;
    valid.then_some(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = r#"{"question":"What makes a strong password?","options":["Length","Your birthday","123456","Pet name"],"correctAnswer":0,"explanation":"Long passphrases resist guessing."}"#;

    #[test]
    fn catalogue_lookup() {
        assert_eq!(find_level(3).map(|l| l.id), Some(3));
        assert!(find_level(0).is_none());
        assert!(find_level(99).is_none());
    }

    #[test]
    fn parses_fenced_output() {
        let text = format!("Here you go:\n```json\n[{ONE}]\n```\n");
        let questions = parse_questions(&text).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, 0);
        assert_eq!(questions[0].options[0], "Length");
    }

    #[test]
    fn drops_malformed_questions() {
        let text = format!(
            r#"[{ONE},
            {{"question":"Too few options","options":["a","b"],"correctAnswer":0}},
            {{"question":"Bad index","options":["a","b","c","d"],"correctAnswer":7}},
            {{"options":["a","b","c","d"],"correctAnswer":1}}]"#
        );
        let questions = parse_questions(&text).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "What makes a strong password?");
    }

    #[test]
    fn caps_question_count() {
        let text = format!("[{}]", vec![ONE; 8].join(","));
        assert_eq!(parse_questions(&text).unwrap().len(), QUESTIONS_PER_LEVEL);
    }

    #[test]
    fn rejects_output_without_questions() {
        assert!(parse_questions("Sorry, I can't help with that.").is_err());
        assert!(parse_questions("[]").is_err());
        assert!(parse_questions("[not json]").is_err());
    }
}
