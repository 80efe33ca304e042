//! Ordered topic classification rules.
//!
//! A rule table maps keyword/symbol patterns to a topic. Rules are evaluated
//! in order and the first rule with any matching pattern wins, so more
//! specific topics must come before broader ones.

use crate::types::Topic;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One entry of the topic rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRule {
    pub topic: Topic,

    /// Case-insensitive regular expressions; any match selects the topic
    pub patterns: Vec<String>,
}

impl TopicRule {
    pub fn new(topic: Topic, patterns: &[&str]) -> Self {
        Self {
            topic,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Compile the patterns into a single case-insensitive alternation
    pub fn compile(&self) -> Result<CompiledRule, regex::Error> {
        let alternation = self
            .patterns
            .iter()
            .map(|p| format!("(?:{})", p))
            .collect::<Vec<_>>()
            .join("|");

        let regex = if alternation.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&alternation)
                    .case_insensitive(true)
                    .build()?,
            )
        };

        Ok(CompiledRule {
            topic: self.topic,
            regex,
        })
    }
}

/// A rule ready for matching
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub topic: Topic,
    regex: Option<Regex>,
}

impl CompiledRule {
    pub fn matches(&self, text: &str) -> bool {
        self.regex.as_ref().map_or(false, |r| r.is_match(text))
    }
}

/// Built-in rule table
///
/// Order matters: calculus and linear algebra are checked before algebra so
/// that "solve the integral" is not classified by the generic "solve".
pub fn default_topic_rules() -> Vec<TopicRule> {
    vec![
        TopicRule::new(
            Topic::Calculus,
            &[
                "∫",
                r"\bintegra(l|te|tion)s?\b",
                r"\bderivatives?\b",
                r"\bdifferentiat(e|ion)\b",
                r"\blimits?\b",
                r"\bd/dx\b",
                r"\bseries\b",
                r"\bconvergen(t|ce)\b",
            ],
        ),
        TopicRule::new(
            Topic::LinearAlgebra,
            &[
                r"\bmatri(x|ces)\b",
                r"\bvectors?\b",
                r"\bdeterminants?\b",
                r"\beigen(value|vector)s?\b",
            ],
        ),
        TopicRule::new(
            Topic::Trigonometry,
            &[
                r"\b(sin|cos|tan|sec|csc|cot)\b",
                r"\btrigonometr(y|ic)\b",
                r"\bradians?\b",
            ],
        ),
        TopicRule::new(
            Topic::Geometry,
            &[
                r"\btriangles?\b",
                r"\bcircles?\b",
                r"\barea\b",
                r"\bperimeter\b",
                r"\bvolume\b",
                r"\bangles?\b",
                r"\bpolygons?\b",
            ],
        ),
        TopicRule::new(
            Topic::Statistics,
            &[
                r"\bmean\b",
                r"\bmedian\b",
                r"\bmode\b",
                r"\bprobabilit(y|ies)\b",
                r"\bdistribution\b",
                r"\bvariance\b",
                r"\bstandard deviation\b",
            ],
        ),
        TopicRule::new(
            Topic::Algebra,
            &[
                r"\bequations?\b",
                r"\bsolve\b",
                r"\bfactor(ise|ize)?\b",
                r"\bpolynomials?\b",
                r"\bvariables?\b",
                r"\b\d*[a-z]\s*[+\-]\s*\d+\s*=",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_compile() {
        for rule in default_topic_rules() {
            assert!(rule.compile().is_ok(), "rule for {} failed", rule.topic);
        }
    }

    #[test]
    fn test_rule_matching_is_case_insensitive() {
        let rule = TopicRule::new(Topic::Geometry, &[r"\btriangle\b"]).compile().unwrap();
        assert!(rule.matches("Area of a TRIANGLE"));
        assert!(!rule.matches("triangles everywhere"));
    }

    #[test]
    fn test_empty_rule_never_matches() {
        let rule = TopicRule::new(Topic::Other, &[]).compile().unwrap();
        assert!(!rule.matches("anything"));
    }
}
