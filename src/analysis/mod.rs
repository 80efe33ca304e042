//! Query analysis: topic classification and complexity estimation.
//!
//! The analyzer is deterministic and total. Unknown questions classify as
//! [`Topic::Other`]; complexity is always a value in [0, 1].

pub mod complexity;
pub mod topic_rules;

pub use complexity::ComplexityIndicators;
pub use topic_rules::{default_topic_rules, CompiledRule, TopicRule};

use crate::config::ConfigError;
use crate::types::{Question, Topic};
use tracing::debug;

/// Classifies a question's topic and estimates its complexity
pub struct QueryAnalyzer {
    rules: Vec<CompiledRule>,
}

impl QueryAnalyzer {
    /// Build an analyzer from an ordered rule table
    pub fn new(rules: &[TopicRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| {
                rule.compile().map_err(|e| {
                    ConfigError::ValidationError(format!("topic rule {}: {}", rule.topic, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// Analyzer with the built-in rule table
    pub fn with_default_rules() -> Self {
        Self {
            rules: default_topic_rules()
                .iter()
                .filter_map(|rule| rule.compile().ok())
                .collect(),
        }
    }

    /// First matching rule wins; `Other` when nothing matches
    pub fn classify(&self, text: &str) -> Topic {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| rule.topic)
            .unwrap_or(Topic::Other)
    }

    /// Analyze a (guardrail-validated) question
    pub fn analyze(&self, text: &str) -> Question {
        let topic = self.classify(text);
        let indicators = ComplexityIndicators::extract(text);
        let complexity = indicators.score();

        debug!(
            "Analyzed question: topic={} complexity={:.2} ({:?})",
            topic, complexity, indicators
        );

        Question::new(text, topic, complexity)
    }
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::with_default_rules()
    }
}
