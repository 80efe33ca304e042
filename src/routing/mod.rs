//! Routing decision engine.
//!
//! Decides per question whether the knowledge base or web search answers it.
//! The engine is pure: given the analyzed question, the candidates the caller
//! fetched and a performance snapshot, it always yields the same decision.
//! Fetching, timeouts and fallbacks on retriever failure live in the agent.

pub mod engine;

pub use engine::{EscalationReason, KbAssessment, RoutingDecisionEngine};

/// Machine-readable reasons recorded on every decision
pub mod reasoning {
    pub const KNOWLEDGE_BASE_ABOVE_THRESHOLD: &str = "knowledge_base_above_threshold";
    pub const KNOWLEDGE_BASE_UNAVAILABLE: &str = "knowledge_base_unavailable";
    pub const WEB_SEARCH_PREFERRED: &str = "web_search_preferred";
    pub const WEB_SEARCH_FAILED_FALLBACK: &str = "web_search_failed_fallback";
    pub const TIE_BREAK_KNOWLEDGE_BASE: &str = "tie_break_knowledge_base";
    pub const TIE_BREAK_WEB_SEARCH: &str = "tie_break_web_search";
    pub const NO_VIABLE_SOURCE: &str = "no_viable_source";
}
