//! Mathroute - Adaptive Math Question Routing
//!
//! Answers math questions with step-by-step solutions drawn from one of two
//! sources, and learns from user ratings which source to prefer:
//! - A curated knowledge base of worked problems (fast, trusted, narrow)
//! - A web search adapter (broad, less reliable)
//!
//! # Architecture
//!
//! - **Analysis**: topic classification and complexity estimation
//! - **Retrieval**: knowledge base and web search adapters
//! - **Routing**: per-topic thresholds, escalation and tie-breaking
//! - **Guardrails**: input sanitization and output checks
//! - **Learning**: feedback folding into per-(topic, source) statistics and
//!   threshold adjustments
//!
//! # Example
//!
//! ```ignore
//! use mathroute_core::{RouterConfig, RoutingAgent};
//!
//! #[tokio::main]
//! async fn main() -> mathroute_core::Result<()> {
//!     let agent = RoutingAgent::builder(RouterConfig::default()).build()?;
//!
//!     let session = agent.ask("Solve the equation 2x + 5 = 13").await?;
//!     println!("{}", session.solution.answer);
//!
//!     agent.submit_feedback(session.id, 5, None).await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod analysis;
pub mod composer;
pub mod config;
pub mod error;
pub mod guardrails;
pub mod insights;
pub mod learning;
pub mod performance;
pub mod retrieval;
pub mod routing;
pub mod session;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use agent::{RoutingAgent, RoutingAgentBuilder};
pub use analysis::QueryAnalyzer;
pub use config::{ConfigError, RouterConfig};
pub use error::{Result, RouterError};
pub use guardrails::{GuardrailValidator, RuleGuardrails};
pub use insights::{InsightsAggregator, LearningInsights, Trend};
pub use learning::{FeedbackLearner, FeedbackOutcome, HeuristicTagger, ImprovementTagger};
pub use performance::{
    InMemoryPerformanceStore, PerformanceBucket, PerformanceSnapshot, PerformanceStore,
    ThresholdAdjustment,
};
pub use retrieval::{
    DisabledWebRetriever, HttpWebRetriever, InMemoryKnowledgeBase, KnowledgeRetriever,
    WebRetriever,
};
pub use routing::RoutingDecisionEngine;
pub use session::{InMemorySessionStore, SessionStore};
pub use state::StateFile;
pub use types::{
    CandidatePayload, ChosenSource, Evaluation, Feedback, Question, RetrievalCandidate,
    RoutingDecision, Session, SessionId, Solution, Source, Topic,
};
