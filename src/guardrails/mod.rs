//! Input and output guardrails.
//!
//! Input validation can veto a question before any retrieval happens. Output
//! validation can veto a composed solution, in which case the caller swaps in
//! a safe template; otherwise its warnings are attached to the solution.

pub mod input;
pub mod output;

pub use input::InputRules;
pub use output::OutputRules;

use crate::config::GuardrailConfig;
use crate::types::Solution;
use serde::{Deserialize, Serialize};

/// Result of validating a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputValidation {
    pub accepted: bool,

    /// Cleaned question text (empty when rejected)
    pub sanitized: String,

    pub warnings: Vec<String>,
}

impl InputValidation {
    pub fn rejected(warning: impl Into<String>) -> Self {
        Self {
            accepted: false,
            sanitized: String::new(),
            warnings: vec![warning.into()],
        }
    }
}

/// Result of validating a composed solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValidation {
    pub accepted: bool,
    pub warnings: Vec<String>,
}

/// Guardrail collaborator used by the agent
#[cfg_attr(test, mockall::automock)]
pub trait GuardrailValidator: Send + Sync {
    fn validate_input(&self, text: &str) -> InputValidation;

    fn validate_output(&self, solution: &Solution) -> OutputValidation;
}

/// Pattern-based guardrails
pub struct RuleGuardrails {
    input: InputRules,
    output: OutputRules,
}

impl RuleGuardrails {
    pub fn new(config: &GuardrailConfig) -> Self {
        Self {
            input: InputRules::new(config.max_input_length),
            output: OutputRules::new(config.max_output_length),
        }
    }
}

impl Default for RuleGuardrails {
    fn default() -> Self {
        Self::new(&GuardrailConfig::default())
    }
}

impl GuardrailValidator for RuleGuardrails {
    fn validate_input(&self, text: &str) -> InputValidation {
        self.input.validate(text)
    }

    fn validate_output(&self, solution: &Solution) -> OutputValidation {
        self.output.validate(solution)
    }
}

/// Patterns that veto both questions and answers
pub(crate) const HARMFUL_PATTERNS: &[&str] = &[
    r"(?i)\b(hack|exploit|bypass|cheat|illegal|harmful|dangerous)\b",
    r"(?is)<script.*?>.*?</script>",
    r"(?i)javascript:",
    r"(?i)data:text/html",
];
