//! Structural complexity estimation.
//!
//! The score is a sum of independent, capped, non-negative terms. Every term
//! is non-decreasing in its indicator, so adding an indicator never lowers
//! the total. The sum of the caps is 1.0.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Families of multi-step operations; each family counts once
static OPERATOR_FAMILIES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(prove|derive|show that|demonstrate)\b",
        r"(?i)(∫|∑|\b(integral|derivative|limit|series|convergence)\b)",
        r"(?i)\b(matrix|matrices|vector|eigenvalue|determinant)\b",
        r"(?i)\b(probability|distribution|hypothesis|statistical)\b",
        r"(?i)\b(optimi[sz]ation|constraint|lagrange|calculus of variations)\b",
        r"(?i)\b(complex|imaginary|real analysis|topology)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static operator pattern"))
    .collect()
});

static CONCEPT_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(equation|function|formula|theorem|lemma)s?\b")
        .expect("static concept pattern")
});

const MATH_SYMBOLS: &str = "+-*/=<>^√∫∑∏πθ∞≤≥≠±()[]{}|!";

const OPERATOR_WEIGHT: f64 = 0.2;
const OPERATOR_CAP: f64 = 0.5;
const CONCEPT_WEIGHT: f64 = 0.1;
const CONCEPT_CAP: f64 = 0.2;
const LENGTH_CAP: f64 = 0.15;
const LENGTH_SATURATION_WORDS: f64 = 60.0;
const SYMBOL_CAP: f64 = 0.15;
const SYMBOL_SATURATION: f64 = 8.0;

/// Raw indicator counts behind a complexity score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityIndicators {
    pub operator_families: usize,
    pub concept_mentions: usize,
    pub word_count: usize,
    pub distinct_symbols: usize,
}

impl ComplexityIndicators {
    /// Count indicators in a question
    pub fn extract(text: &str) -> Self {
        let operator_families = OPERATOR_FAMILIES.iter().filter(|r| r.is_match(text)).count();
        let concept_mentions = CONCEPT_WORDS.find_iter(text).count();
        let word_count = text.split_whitespace().count();
        let distinct_symbols = text
            .chars()
            .filter(|c| MATH_SYMBOLS.contains(*c))
            .collect::<HashSet<_>>()
            .len();

        Self {
            operator_families,
            concept_mentions,
            word_count,
            distinct_symbols,
        }
    }

    /// Normalized score in [0, 1]
    pub fn score(&self) -> f64 {
        let operators = (self.operator_families as f64 * OPERATOR_WEIGHT).min(OPERATOR_CAP);
        let concepts = (self.concept_mentions as f64 * CONCEPT_WEIGHT).min(CONCEPT_CAP);
        let length =
            (self.word_count as f64 / LENGTH_SATURATION_WORDS).min(1.0) * LENGTH_CAP;
        let symbols =
            (self.distinct_symbols as f64 / SYMBOL_SATURATION).min(1.0) * SYMBOL_CAP;

        (operators + concepts + length + symbols).clamp(0.0, 1.0)
    }
}
