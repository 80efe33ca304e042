//! Question validation and sanitizing

use super::{InputValidation, HARMFUL_PATTERNS};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Share of math pattern families a question should hit
const MIN_MATH_SCORE: f64 = 0.3;

static HARMFUL: Lazy<Vec<Regex>> = Lazy::new(|| {
    HARMFUL_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("static harmful pattern"))
        .collect()
});

static MATH_FAMILIES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(solve|calculate|find|compute|evaluate|integrate|differentiate|derive|prove|simplify)\b",
        r"(?i)\b(equation|formula|function|matrix|vector|limit|derivative|integral|angle|mean)\b",
        r"(?i)\b(algebra|calculus|geometry|trigonometry|statistics|probability)\b",
        r"[+\-*/=<>(){}\[\]^√π∫]",
        r"\d",
        r"\b[xyzn]\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static math pattern"))
    .collect()
});

static TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("static tag pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static whitespace"));

/// Rules applied to incoming questions
#[derive(Debug, Clone)]
pub struct InputRules {
    max_length: usize,
}

impl InputRules {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn validate(&self, text: &str) -> InputValidation {
        if text.chars().count() > self.max_length {
            warn!("Rejected question over {} characters", self.max_length);
            return InputValidation::rejected(format!(
                "Input too long. Maximum {} characters allowed.",
                self.max_length
            ));
        }

        if HARMFUL.iter().any(|re| re.is_match(text)) {
            warn!("Rejected question with harmful content");
            return InputValidation::rejected("Potentially harmful content detected.");
        }

        let sanitized = sanitize(text);
        if sanitized.is_empty() {
            return InputValidation::rejected("Input is empty.");
        }

        let mut warnings = Vec::new();
        if math_score(&sanitized) < MIN_MATH_SCORE {
            warnings.push("Input may not be mathematical in nature.".to_string());
        }

        InputValidation {
            accepted: true,
            sanitized,
            warnings,
        }
    }
}

/// Strip markup and control characters and collapse whitespace
pub fn sanitize(text: &str) -> String {
    let without_tags = TAGS.replace_all(text, " ");
    let printable: String = without_tags
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    WHITESPACE.replace_all(&printable, " ").trim().to_string()
}

/// Fraction of math pattern families present in `text`
pub fn math_score(text: &str) -> f64 {
    let hits = MATH_FAMILIES.iter().filter(|re| re.is_match(text)).count();
    hits as f64 / MATH_FAMILIES.len() as f64
}
