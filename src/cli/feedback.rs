//! Rate a previous answer

use mathroute_core::{error::Result, Evaluation, Feedback, SessionId};
use tracing::debug;

use super::helpers::{load_agent, print_json, save_agent, GlobalOpts};

/// Structured scores passed on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct Scores {
    pub accuracy: Option<f64>,
    pub clarity: Option<f64>,
    pub completeness: Option<f64>,
}

impl Scores {
    /// Evaluation if all three scores were given. Range checks happen in
    /// the learner, so a bad score is reported instead of clamped.
    fn evaluation(self) -> Option<Evaluation> {
        Some(Evaluation {
            accuracy: self.accuracy?,
            clarity: self.clarity?,
            completeness: self.completeness?,
        })
    }
}

/// Handle feedback command
pub async fn handle(
    session_id: String,
    rating: u8,
    comments: Option<String>,
    scores: Scores,
    format: String,
    opts: &GlobalOpts,
) -> Result<()> {
    let session_id = SessionId::from_string(&session_id)?;
    let (agent, state_path) = load_agent(opts)?;

    let mut feedback = Feedback::new(session_id, rating, comments);
    if let Some(evaluation) = scores.evaluation() {
        debug!("Attaching structured evaluation {:?}", evaluation);
        feedback = feedback.with_evaluation(evaluation);
    }

    let outcome = agent.record_feedback(feedback).await?;
    save_agent(&agent, &state_path).await?;

    if format == "json" {
        return print_json(&outcome.snapshot);
    }

    println!("Feedback recorded for session {}", session_id);
    if let Some(bucket) = &outcome.bucket {
        println!(
            "  {}/{}: {} ratings, average {:.2}",
            bucket.topic, bucket.source, bucket.count, bucket.avg_rating
        );
    }
    if let Some(adjustment) = &outcome.adjustment {
        println!(
            "  Threshold adjustment for {} is now {:+.3}",
            adjustment.topic, adjustment.adjustment
        );
    }
    if !outcome.feedback.tags.is_empty() {
        println!("  Tags: {}", outcome.feedback.tags.join(", "));
    }
    Ok(())
}
