//! Solution validation

use super::{OutputValidation, HARMFUL_PATTERNS};
use crate::types::Solution;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static INAPPROPRIATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    HARMFUL_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("static harmful pattern"))
        .collect()
});

static REASONING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(because|since|therefore|thus|hence|so|by|gives|using)\b")
        .expect("static reasoning pattern")
});

static MATH_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d|[=+\-*/^√π∫]|\b[xyzn]\b").expect("static math content pattern"));

/// Rules applied to composed solutions
#[derive(Debug, Clone)]
pub struct OutputRules {
    max_length: usize,
}

impl OutputRules {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn validate(&self, solution: &Solution) -> OutputValidation {
        let text = render(solution);

        if text.chars().count() > self.max_length {
            warn!("Rejected solution over {} characters", self.max_length);
            return rejected(format!(
                "Response too long. Maximum {} characters allowed.",
                self.max_length
            ));
        }

        if INAPPROPRIATE.iter().any(|re| re.is_match(&text)) {
            warn!("Rejected solution with inappropriate content");
            return rejected("Inappropriate content detected in response.".to_string());
        }

        let mut warnings = Vec::new();
        if solution.steps.is_empty() {
            warnings.push("Missing: step-by-step solution".to_string());
        }
        if !REASONING.is_match(&format!("{} {}", solution.steps.join(" "), solution.explanation)) {
            warnings.push("Missing: mathematical reasoning".to_string());
        }
        if solution.answer.trim().is_empty() {
            warnings.push("Missing: final answer".to_string());
        }
        if !MATH_CONTENT.is_match(&text) {
            warnings.push("No mathematical variables or numbers found".to_string());
        }
        if text.matches('(').count() != text.matches(')').count() {
            warnings.push("Unbalanced parentheses in mathematical expressions".to_string());
        }

        OutputValidation {
            accepted: true,
            warnings,
        }
    }
}

fn rejected(warning: String) -> OutputValidation {
    OutputValidation {
        accepted: false,
        warnings: vec![warning],
    }
}

fn render(solution: &Solution) -> String {
    format!(
        "{}\n{}\n{}",
        solution.answer,
        solution.steps.join("\n"),
        solution.explanation
    )
}
