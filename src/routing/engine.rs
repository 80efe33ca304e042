//! Threshold-based source selection

use super::reasoning;
use crate::config::RoutingConfig;
use crate::performance::PerformanceSnapshot;
use crate::types::{ChosenSource, Question, RetrievalCandidate, RoutingDecision, Source, Topic};
use chrono::Utc;
use tracing::debug;

/// Rating assumed for a bucket with no feedback when only the other side has any
const NEUTRAL_RATING: f64 = 3.0;

/// Why the knowledge base alone was not enough
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationReason {
    NoCandidate,
    BelowThreshold,
    TooComplex,
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscalationReason::NoCandidate => write!(f, "no knowledge base candidate"),
            EscalationReason::BelowThreshold => write!(f, "relevance below threshold"),
            EscalationReason::TooComplex => write!(f, "complexity above topic limit"),
        }
    }
}

/// Outcome of checking the knowledge base candidate on its own
#[derive(Debug, Clone, PartialEq)]
pub enum KbAssessment {
    /// The knowledge base answers; no web call is needed
    Accept(RoutingDecision),

    /// The web result is needed to finish the decision
    Escalate(EscalationReason),
}

/// Pure routing decision function
#[derive(Debug, Clone)]
pub struct RoutingDecisionEngine {
    config: RoutingConfig,
}

impl RoutingDecisionEngine {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// `clamp(base(topic) + adjustment(topic), min, max)`
    pub fn effective_threshold(&self, topic: Topic, snapshot: &PerformanceSnapshot) -> f64 {
        let base = self.config.policy(topic).base_threshold;
        let adjustment = snapshot.adjustment(topic).adjustment;
        (base + adjustment).clamp(self.config.min_threshold, self.config.max_threshold)
    }

    /// Decide whether the knowledge base candidate suffices without web search
    pub fn assess_knowledge_base(
        &self,
        question: &Question,
        kb: Option<&RetrievalCandidate>,
        snapshot: &PerformanceSnapshot,
    ) -> KbAssessment {
        let Some(kb) = kb else {
            return KbAssessment::Escalate(EscalationReason::NoCandidate);
        };

        let topic = question.topic();
        let threshold = self.effective_threshold(topic, snapshot);
        let relevance = self.calibrated(kb);

        if relevance < threshold {
            return KbAssessment::Escalate(EscalationReason::BelowThreshold);
        }
        if question.complexity() > self.config.policy(topic).max_complexity {
            return KbAssessment::Escalate(EscalationReason::TooComplex);
        }

        KbAssessment::Accept(self.decision(
            ChosenSource::KnowledgeBase,
            relevance,
            reasoning::KNOWLEDGE_BASE_ABOVE_THRESHOLD,
            topic,
            threshold,
        ))
    }

    /// Full decision over whatever candidates the retrievers produced
    ///
    /// `None` means the retriever failed, timed out, or had nothing relevant.
    pub fn decide(
        &self,
        question: &Question,
        kb: Option<&RetrievalCandidate>,
        web: Option<&RetrievalCandidate>,
        snapshot: &PerformanceSnapshot,
    ) -> RoutingDecision {
        let topic = question.topic();
        let threshold = self.effective_threshold(topic, snapshot);

        let decision = match self.assess_knowledge_base(question, kb, snapshot) {
            KbAssessment::Accept(decision) => decision,
            KbAssessment::Escalate(reason) => {
                debug!("Escalating {} question to web search: {}", topic, reason);
                self.escalate(topic, threshold, reason, kb, web, snapshot)
            }
        };

        debug!(
            "Routed {} question to {} (confidence {:.3}, threshold {:.3}, {})",
            topic, decision.chosen_source, decision.confidence, threshold, decision.reasoning
        );
        decision
    }

    fn escalate(
        &self,
        topic: Topic,
        threshold: f64,
        reason: EscalationReason,
        kb: Option<&RetrievalCandidate>,
        web: Option<&RetrievalCandidate>,
        snapshot: &PerformanceSnapshot,
    ) -> RoutingDecision {
        match (kb, web) {
            (None, None) => self.decision(
                ChosenSource::None,
                0.0,
                reasoning::NO_VIABLE_SOURCE,
                topic,
                threshold,
            ),
            (None, Some(web)) => self.decision(
                ChosenSource::WebSearch,
                self.web_confidence(topic, web, snapshot),
                reasoning::KNOWLEDGE_BASE_UNAVAILABLE,
                topic,
                threshold,
            ),
            (Some(kb), None) => self.decision(
                ChosenSource::KnowledgeBase,
                self.calibrated(kb) * self.config.degradation_factor,
                reasoning::WEB_SEARCH_FAILED_FALLBACK,
                topic,
                threshold,
            ),
            (Some(kb), Some(web)) => {
                let kb_relevance = self.calibrated(kb);
                let web_relevance = self.calibrated(web);

                // A question over the complexity limit never goes back to the KB on a tie
                if reason != EscalationReason::TooComplex
                    && (kb_relevance - web_relevance).abs() <= self.config.tie_epsilon
                {
                    return self.break_tie(topic, threshold, kb_relevance, web, snapshot);
                }

                self.decision(
                    ChosenSource::WebSearch,
                    self.web_confidence(topic, web, snapshot),
                    reasoning::WEB_SEARCH_PREFERRED,
                    topic,
                    threshold,
                )
            }
        }
    }

    fn break_tie(
        &self,
        topic: Topic,
        threshold: f64,
        kb_relevance: f64,
        web: &RetrievalCandidate,
        snapshot: &PerformanceSnapshot,
    ) -> RoutingDecision {
        let kb_rating = snapshot.avg_rating(topic, Source::KnowledgeBase);
        let web_rating = snapshot.avg_rating(topic, Source::WebSearch);

        let web_wins = match (kb_rating, web_rating) {
            (None, None) => false,
            (kb, web) => web.unwrap_or(NEUTRAL_RATING) > kb.unwrap_or(NEUTRAL_RATING),
        };

        if web_wins {
            self.decision(
                ChosenSource::WebSearch,
                self.web_confidence(topic, web, snapshot),
                reasoning::TIE_BREAK_WEB_SEARCH,
                topic,
                threshold,
            )
        } else {
            self.decision(
                ChosenSource::KnowledgeBase,
                kb_relevance,
                reasoning::TIE_BREAK_KNOWLEDGE_BASE,
                topic,
                threshold,
            )
        }
    }

    /// Weighted blend of calibrated web relevance and the web bucket's
    /// normalized rating; relevance alone while the bucket is empty
    fn web_confidence(
        &self,
        topic: Topic,
        web: &RetrievalCandidate,
        snapshot: &PerformanceSnapshot,
    ) -> f64 {
        let relevance = self.calibrated(web);
        let rating = snapshot
            .bucket(topic, Source::WebSearch)
            .and_then(|b| b.normalized_rating());

        match rating {
            Some(rating) => {
                let w = self.config.web_relevance_weight;
                (w * relevance + (1.0 - w) * rating).clamp(0.0, 1.0)
            }
            None => relevance,
        }
    }

    fn calibrated(&self, candidate: &RetrievalCandidate) -> f64 {
        self.config
            .calibration(candidate.source)
            .apply(candidate.relevance)
    }

    fn decision(
        &self,
        chosen_source: ChosenSource,
        confidence: f64,
        reasoning: &str,
        topic: Topic,
        effective_threshold: f64,
    ) -> RoutingDecision {
        RoutingDecision {
            chosen_source,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.to_string(),
            topic,
            effective_threshold,
            decided_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Calibration;
    use crate::performance::{Observation, PerformanceBucket, ThresholdAdjustment};
    use crate::types::CandidatePayload;
    use proptest::prelude::*;

    fn engine() -> RoutingDecisionEngine {
        RoutingDecisionEngine::new(RoutingConfig::default())
    }

    fn candidate(source: Source, relevance: f64) -> RetrievalCandidate {
        RetrievalCandidate::new(source, relevance, CandidatePayload::default())
    }

    fn question(complexity: f64) -> Question {
        Question::new("Find the derivative of x^2", Topic::Calculus, complexity)
    }

    fn rated(topic: Topic, source: Source, rating: f64) -> PerformanceBucket {
        let mut bucket = PerformanceBucket::empty(topic, source);
        bucket.fold(&Observation {
            rating,
            confidence: 0.8,
            alpha: 0.2,
        });
        bucket
    }

    fn snapshot_with(buckets: Vec<PerformanceBucket>) -> PerformanceSnapshot {
        PerformanceSnapshot {
            buckets,
            ..PerformanceSnapshot::empty()
        }
    }

    #[test]
    fn test_knowledge_base_above_threshold() {
        let kb = candidate(Source::KnowledgeBase, 0.9);
        let decision = engine().decide(&question(0.1), Some(&kb), None, &PerformanceSnapshot::empty());

        assert_eq!(decision.chosen_source, ChosenSource::KnowledgeBase);
        assert!((decision.confidence - 0.9).abs() < 1e-9);
        assert_eq!(decision.reasoning, reasoning::KNOWLEDGE_BASE_ABOVE_THRESHOLD);
        assert!((decision.effective_threshold - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_low_relevance_prefers_web() {
        let kb = candidate(Source::KnowledgeBase, 0.4);
        let web = candidate(Source::WebSearch, 0.8);
        let decision = engine().decide(
            &question(0.1),
            Some(&kb),
            Some(&web),
            &PerformanceSnapshot::empty(),
        );

        assert_eq!(decision.chosen_source, ChosenSource::WebSearch);
        assert_eq!(decision.reasoning, reasoning::WEB_SEARCH_PREFERRED);
        assert!((decision.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_knowledge_base_unavailable() {
        let web = candidate(Source::WebSearch, 0.6);
        let decision = engine().decide(&question(0.1), None, Some(&web), &PerformanceSnapshot::empty());

        assert_eq!(decision.chosen_source, ChosenSource::WebSearch);
        assert_eq!(decision.reasoning, reasoning::KNOWLEDGE_BASE_UNAVAILABLE);
        assert!((decision.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_web_failure_falls_back_to_knowledge_base() {
        let kb = candidate(Source::KnowledgeBase, 0.4);
        let decision = engine().decide(&question(0.1), Some(&kb), None, &PerformanceSnapshot::empty());

        assert_eq!(decision.chosen_source, ChosenSource::KnowledgeBase);
        assert_eq!(decision.reasoning, reasoning::WEB_SEARCH_FAILED_FALLBACK);
        assert!((decision.confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_no_viable_source() {
        let decision = engine().decide(&question(0.1), None, None, &PerformanceSnapshot::empty());

        assert_eq!(decision.chosen_source, ChosenSource::None);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.reasoning, reasoning::NO_VIABLE_SOURCE);
    }

    #[test]
    fn test_complexity_gate_escalates() {
        let kb = candidate(Source::KnowledgeBase, 0.9);
        let assessment =
            engine().assess_knowledge_base(&question(0.9), Some(&kb), &PerformanceSnapshot::empty());
        assert_eq!(assessment, KbAssessment::Escalate(EscalationReason::TooComplex));

        let web = candidate(Source::WebSearch, 0.6);
        let decision = engine().decide(
            &question(0.9),
            Some(&kb),
            Some(&web),
            &PerformanceSnapshot::empty(),
        );
        assert_eq!(decision.chosen_source, ChosenSource::WebSearch);
    }

    #[test]
    fn test_assessment_without_candidate() {
        let assessment = engine().assess_knowledge_base(&question(0.1), None, &PerformanceSnapshot::empty());
        assert_eq!(assessment, KbAssessment::Escalate(EscalationReason::NoCandidate));
    }

    #[test]
    fn test_tie_without_feedback_prefers_knowledge_base() {
        let kb = candidate(Source::KnowledgeBase, 0.7);
        let web = candidate(Source::WebSearch, 0.72);
        let decision = engine().decide(
            &question(0.1),
            Some(&kb),
            Some(&web),
            &PerformanceSnapshot::empty(),
        );

        assert_eq!(decision.chosen_source, ChosenSource::KnowledgeBase);
        assert_eq!(decision.reasoning, reasoning::TIE_BREAK_KNOWLEDGE_BASE);
        assert!((decision.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_tie_prefers_better_rated_source() {
        let kb = candidate(Source::KnowledgeBase, 0.7);
        let web = candidate(Source::WebSearch, 0.72);
        let snapshot = snapshot_with(vec![
            rated(Topic::Calculus, Source::KnowledgeBase, 2.0),
            rated(Topic::Calculus, Source::WebSearch, 5.0),
        ]);

        let decision = engine().decide(&question(0.1), Some(&kb), Some(&web), &snapshot);
        assert_eq!(decision.chosen_source, ChosenSource::WebSearch);
        assert_eq!(decision.reasoning, reasoning::TIE_BREAK_WEB_SEARCH);
        // 0.7 * 0.72 + 0.3 * 1.0
        assert!((decision.confidence - 0.804).abs() < 1e-9);
    }

    #[test]
    fn test_too_complex_skips_tie_break() {
        let kb = candidate(Source::KnowledgeBase, 0.9);
        let web = candidate(Source::WebSearch, 0.88);
        let snapshot = snapshot_with(vec![rated(Topic::Calculus, Source::KnowledgeBase, 5.0)]);

        let decision = engine().decide(&question(0.95), Some(&kb), Some(&web), &snapshot);
        assert_eq!(decision.chosen_source, ChosenSource::WebSearch);
        assert_eq!(decision.reasoning, reasoning::WEB_SEARCH_PREFERRED);
        assert!((decision.confidence - 0.88).abs() < 1e-9);
    }

    #[test]
    fn test_too_complex_without_web_is_degraded() {
        let kb = candidate(Source::KnowledgeBase, 0.9);
        let decision = engine().decide(&question(0.95), Some(&kb), None, &PerformanceSnapshot::empty());

        assert_eq!(decision.chosen_source, ChosenSource::KnowledgeBase);
        assert_eq!(decision.reasoning, reasoning::WEB_SEARCH_FAILED_FALLBACK);
        assert!((decision.confidence - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_tie_with_one_sided_feedback() {
        let kb = candidate(Source::KnowledgeBase, 0.7);
        let web = candidate(Source::WebSearch, 0.7);

        let poor_web = snapshot_with(vec![rated(Topic::Calculus, Source::WebSearch, 2.0)]);
        let decision = engine().decide(&question(0.1), Some(&kb), Some(&web), &poor_web);
        assert_eq!(decision.chosen_source, ChosenSource::KnowledgeBase);

        let good_web = snapshot_with(vec![rated(Topic::Calculus, Source::WebSearch, 4.5)]);
        let decision = engine().decide(&question(0.1), Some(&kb), Some(&web), &good_web);
        assert_eq!(decision.chosen_source, ChosenSource::WebSearch);
    }

    #[test]
    fn test_adjustment_raises_threshold() {
        let kb = candidate(Source::KnowledgeBase, 0.8);
        let snapshot = PerformanceSnapshot {
            adjustments: vec![ThresholdAdjustment {
                topic: Topic::Calculus,
                adjustment: 0.1,
                version: 5,
            }],
            ..PerformanceSnapshot::empty()
        };

        let engine = engine();
        assert!((engine.effective_threshold(Topic::Calculus, &snapshot) - 0.85).abs() < 1e-9);
        assert_eq!(
            engine.assess_knowledge_base(&question(0.1), Some(&kb), &snapshot),
            KbAssessment::Escalate(EscalationReason::BelowThreshold)
        );
    }

    #[test]
    fn test_calibration_applied_before_comparison() {
        let mut config = RoutingConfig::default();
        config.knowledge_base_calibration = Calibration {
            scale: 1.0,
            offset: 0.2,
        };
        let engine = RoutingDecisionEngine::new(config);

        // 0.6 raw becomes 0.8 after calibration
        let kb = candidate(Source::KnowledgeBase, 0.6);
        let decision = engine.decide(&question(0.1), Some(&kb), None, &PerformanceSnapshot::empty());
        assert_eq!(decision.chosen_source, ChosenSource::KnowledgeBase);
        assert_eq!(decision.reasoning, reasoning::KNOWLEDGE_BASE_ABOVE_THRESHOLD);
    }

    proptest! {
        #[test]
        fn test_effective_threshold_clamped(adjustment in -2.0f64..2.0) {
            let engine = engine();
            let snapshot = PerformanceSnapshot {
                adjustments: vec![ThresholdAdjustment { topic: Topic::Geometry, adjustment, version: 1 }],
                ..PerformanceSnapshot::empty()
            };
            let t = engine.effective_threshold(Topic::Geometry, &snapshot);
            prop_assert!((0.5..=0.95).contains(&t));
        }

        #[test]
        fn test_decision_is_deterministic(
            kb_rel in proptest::option::of(0.0f64..=1.0),
            web_rel in proptest::option::of(0.0f64..=1.0),
            complexity in 0.0f64..=1.0,
            kb_rating in proptest::option::of(1.0f64..=5.0),
            web_rating in proptest::option::of(1.0f64..=5.0),
        ) {
            let engine = engine();
            let q = question(complexity);
            let kb = kb_rel.map(|r| candidate(Source::KnowledgeBase, r));
            let web = web_rel.map(|r| candidate(Source::WebSearch, r));

            let mut buckets = Vec::new();
            if let Some(r) = kb_rating {
                buckets.push(rated(Topic::Calculus, Source::KnowledgeBase, r));
            }
            if let Some(r) = web_rating {
                buckets.push(rated(Topic::Calculus, Source::WebSearch, r));
            }
            let snapshot = snapshot_with(buckets);

            let first = engine.decide(&q, kb.as_ref(), web.as_ref(), &snapshot);
            let second = engine.decide(&q, kb.as_ref(), web.as_ref(), &snapshot);

            prop_assert_eq!(first.chosen_source, second.chosen_source);
            prop_assert_eq!(first.confidence, second.confidence);
            prop_assert_eq!(&first.reasoning, &second.reasoning);
            prop_assert!((0.0..=1.0).contains(&first.confidence));
            prop_assert_eq!(first.chosen_source == ChosenSource::None, kb.is_none() && web.is_none());
        }
    }
}
