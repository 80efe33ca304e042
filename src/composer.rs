//! Solution composition
//!
//! Turns a routing decision and the chosen candidate into the canonical
//! [`Solution`]. Everything here is pure: the payload is copied verbatim and
//! steps keep the order the retriever gave them.

use crate::types::{ChosenSource, RetrievalCandidate, RoutingDecision, Solution};

pub const APOLOGY_ANSWER: &str = "Sorry, no answer could be found for this question right now.";
pub const APOLOGY_EXPLANATION: &str =
    "Neither the knowledge base nor web search returned a usable result. Please try again later or rephrase the question.";

pub const SAFE_ANSWER: &str = "This answer was withheld by the output checks.";
pub const SAFE_EXPLANATION: &str =
    "The generated solution did not pass validation. Please rephrase the question or try again.";

/// Build the solution for a decision from its candidate
pub fn compose(decision: &RoutingDecision, candidate: &RetrievalCandidate) -> Solution {
    let payload = &candidate.payload;

    Solution {
        answer: payload.answer.clone(),
        steps: payload.steps.clone().unwrap_or_default(),
        explanation: payload.explanation.clone(),
        confidence: decision.confidence,
        source: decision.chosen_source,
        degraded: false,
        warnings: Vec::new(),
    }
}

/// Apology solution used when no source produced a candidate
pub fn degraded(decision: &RoutingDecision) -> Solution {
    Solution {
        answer: APOLOGY_ANSWER.to_string(),
        steps: Vec::new(),
        explanation: APOLOGY_EXPLANATION.to_string(),
        confidence: 0.0,
        source: ChosenSource::None,
        degraded: true,
        warnings: vec![decision.reasoning.clone()],
    }
}

/// Safe template replacing a solution the output guardrail vetoed
///
/// The source is kept so the session still records where the rejected
/// content came from.
pub fn output_rejected(decision: &RoutingDecision, warnings: Vec<String>) -> Solution {
    Solution {
        answer: SAFE_ANSWER.to_string(),
        steps: Vec::new(),
        explanation: SAFE_EXPLANATION.to_string(),
        confidence: 0.0,
        source: decision.chosen_source,
        degraded: true,
        warnings,
    }
}

/// Attach output warnings, lowering confidence by `penalty` per warning
pub fn with_output_warnings(mut solution: Solution, warnings: Vec<String>, penalty: f64) -> Solution {
    let cut = penalty * warnings.len() as f64;
    solution.confidence = (solution.confidence - cut).clamp(0.0, 1.0);
    solution.warnings.extend(warnings);
    solution
}
