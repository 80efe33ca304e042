//! Feedback learner: folds ratings into performance buckets and moves the
//! per-topic threshold adjustment.

use super::tagger::ImprovementTagger;
use crate::config::{LearningConfig, RoutingConfig};
use crate::error::{Result, RouterError};
use crate::performance::{
    Observation, PerformanceBucket, PerformanceSnapshot, PerformanceStore, ThresholdAdjustment,
};
use crate::session::SessionStore;
use crate::types::{Evaluation, Feedback, Source, Topic};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// What recording one feedback entry changed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackOutcome {
    /// The stored feedback, with improvement tags filled in
    pub feedback: Feedback,

    /// Bucket the rating was folded into (`None` for degraded sessions)
    pub bucket: Option<PerformanceBucket>,

    /// New adjustment if the threshold moved
    pub adjustment: Option<ThresholdAdjustment>,

    /// Store state after the update
    pub snapshot: PerformanceSnapshot,
}

/// Sole writer of the performance store
pub struct FeedbackLearner {
    learning: LearningConfig,
    routing: RoutingConfig,
    performance: Arc<dyn PerformanceStore>,
    sessions: Arc<dyn SessionStore>,
    tagger: Arc<dyn ImprovementTagger>,
    log: RwLock<Vec<Feedback>>,
}

impl FeedbackLearner {
    pub fn new(
        learning: LearningConfig,
        routing: RoutingConfig,
        performance: Arc<dyn PerformanceStore>,
        sessions: Arc<dyn SessionStore>,
        tagger: Arc<dyn ImprovementTagger>,
    ) -> Self {
        Self {
            learning,
            routing,
            performance,
            sessions,
            tagger,
            log: RwLock::new(Vec::new()),
        }
    }

    /// Seed the feedback log with previously persisted entries
    pub fn with_log(self, log: Vec<Feedback>) -> Self {
        Self {
            log: RwLock::new(log),
            ..self
        }
    }

    /// All accepted feedback in arrival order
    pub async fn feedback_log(&self) -> Vec<Feedback> {
        self.log.read().await.clone()
    }

    /// Record one rating
    ///
    /// Fails with `InvalidRating`, `InvalidEvaluation`, `SessionNotFound` or
    /// `DuplicateFeedback` without touching the performance store.
    pub async fn record(&self, mut feedback: Feedback) -> Result<FeedbackOutcome> {
        if !(1..=5).contains(&feedback.rating) {
            return Err(RouterError::InvalidRating(feedback.rating));
        }
        if let Some(score) = feedback.evaluation.as_ref().and_then(Evaluation::invalid_score) {
            return Err(RouterError::InvalidEvaluation(score.to_string()));
        }

        let session = self
            .sessions
            .attach_feedback(feedback.session_id, feedback.created_at)
            .await?;

        feedback.tags = self.tagger.tag(&feedback, &session);

        let decision = &session.routing_decision;
        let topic = decision.topic;

        let (bucket, adjustment) = match decision.chosen_source.source() {
            Some(source) => {
                let observation = Observation {
                    rating: f64::from(feedback.rating),
                    confidence: decision.confidence,
                    alpha: self.learning.ema_alpha,
                };
                let bucket = self
                    .performance
                    .fold_observation(topic, source, observation)
                    .await?;
                let adjustment = self.recompute_adjustment(topic).await?;
                (Some(bucket), adjustment)
            }
            None => {
                debug!(
                    "Session {} had no source; feedback stored without folding",
                    session.id
                );
                (None, None)
            }
        };

        info!(
            "Recorded rating {} for session {} ({}/{})",
            feedback.rating, session.id, topic, decision.chosen_source
        );

        self.log.write().await.push(feedback.clone());

        Ok(FeedbackOutcome {
            feedback,
            bucket,
            adjustment,
            snapshot: self.performance.snapshot().await?,
        })
    }

    /// Move the topic's adjustment one step if the two sources' ratings
    /// differ by more than the configured gap
    ///
    /// Retries on version conflicts; a conflict means another writer moved
    /// the adjustment, so the target is recomputed from fresh state.
    async fn recompute_adjustment(&self, topic: Topic) -> Result<Option<ThresholdAdjustment>> {
        for attempt in 1..=self.learning.max_update_retries {
            let kb = self.performance.bucket(topic, Source::KnowledgeBase).await?;
            let web = self.performance.bucket(topic, Source::WebSearch).await?;
            let current = self.performance.adjustment(topic).await?;

            let Some(target) = self.target_adjustment(topic, &kb, &web, current.adjustment) else {
                return Ok(None);
            };
            if (target - current.adjustment).abs() < f64::EPSILON {
                return Ok(None);
            }

            match self
                .performance
                .compare_and_update_adjustment(topic, current.version, target)
                .await?
            {
                Some(updated) => {
                    info!(
                        "Threshold adjustment for {} moved {:+.3} -> {:+.3}",
                        topic, current.adjustment, updated.adjustment
                    );
                    return Ok(Some(updated));
                }
                None => debug!(
                    "Adjustment update for {} lost a race (attempt {}/{})",
                    topic, attempt, self.learning.max_update_retries
                ),
            }
        }

        warn!(
            "Gave up updating threshold adjustment for {} after {} attempts",
            topic, self.learning.max_update_retries
        );
        Ok(None)
    }

    /// Next adjustment, or `None` when either bucket lacks feedback or the
    /// gap is within tolerance
    ///
    /// Web ahead by more than the gap lowers the adjustment; knowledge base
    /// ahead raises it. The result stays within the topic's bounds.
    pub fn target_adjustment(
        &self,
        topic: Topic,
        kb: &PerformanceBucket,
        web: &PerformanceBucket,
        current: f64,
    ) -> Option<f64> {
        if !kb.has_feedback() || !web.has_feedback() {
            return None;
        }

        let gap = web.avg_rating - kb.avg_rating;
        let step = self.learning.adjustment_step;
        let next = if gap > self.learning.rating_gap {
            current - step
        } else if -gap > self.learning.rating_gap {
            current + step
        } else {
            return None;
        };

        let (lo, hi) = self.routing.adjustment_bounds(topic);
        Some(next.clamp(lo, hi))
    }
}
