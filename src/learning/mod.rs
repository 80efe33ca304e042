//! Feedback-driven adaptation.
//!
//! [`FeedbackLearner`] turns ratings into bucket updates and threshold moves;
//! [`ImprovementTagger`] labels each rating with improvement tags for the
//! insights rollup.

pub mod feedback;
pub mod tagger;

pub use feedback::{FeedbackLearner, FeedbackOutcome};
pub use tagger::{HeuristicTagger, ImprovementTagger};
