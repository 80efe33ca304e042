//! Improvement tags for rated sessions

use crate::types::{Feedback, Session};
use std::collections::BTreeSet;

/// Score below which a structured evaluation dimension counts as weak
const WEAK_SCORE: f64 = 0.7;

/// Categorizes feedback into improvement tags
///
/// Tags are counted and ranked by the insights rollup; the learner never
/// interprets them.
pub trait ImprovementTagger: Send + Sync {
    fn tag(&self, feedback: &Feedback, session: &Session) -> Vec<String>;
}

/// Keyword and score based tagger
#[derive(Debug, Clone, Default)]
pub struct HeuristicTagger;

impl ImprovementTagger for HeuristicTagger {
    fn tag(&self, feedback: &Feedback, session: &Session) -> Vec<String> {
        let mut tags = BTreeSet::new();

        if feedback.rating <= 2 {
            tags.insert("improve_accuracy");
            tags.insert("add_more_explanations");
        }

        if let Some(evaluation) = &feedback.evaluation {
            if evaluation.accuracy < WEAK_SCORE {
                tags.insert("verify_mathematical_correctness");
            }
            if evaluation.clarity < WEAK_SCORE {
                tags.insert("simplify_explanations");
            }
            if evaluation.completeness < WEAK_SCORE {
                tags.insert("add_more_steps");
            }
        }

        if let Some(comments) = &feedback.comments {
            let comments = comments.to_lowercase();
            for (keyword, tag) in [
                ("confusing", "improve_clarity"),
                ("unclear", "improve_clarity"),
                ("incomplete", "add_more_details"),
                ("missing", "add_more_details"),
                ("wrong", "verify_solution"),
                ("incorrect", "verify_solution"),
            ] {
                if comments.contains(keyword) {
                    tags.insert(tag);
                }
            }
        }

        if session.solution.steps.is_empty() && feedback.rating <= 3 {
            tags.insert("add_more_steps");
        }

        let mut result: Vec<String> = feedback.tags.clone();
        for tag in tags {
            if !result.iter().any(|t| t == tag) {
                result.push(tag.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ChosenSource, Evaluation, Question, RoutingDecision, SessionId, Solution, Topic,
    };
    use chrono::Utc;

    fn session(steps: Vec<String>) -> Session {
        Session {
            id: SessionId::new(),
            question: Question::new("Solve x + 1 = 2", Topic::Algebra, 0.1),
            routing_decision: RoutingDecision {
                chosen_source: ChosenSource::WebSearch,
                confidence: 0.7,
                reasoning: "web_search_preferred".to_string(),
                topic: Topic::Algebra,
                effective_threshold: 0.75,
                decided_at: Utc::now(),
            },
            solution: Solution {
                answer: "x = 1".to_string(),
                steps,
                explanation: String::new(),
                confidence: 0.7,
                source: ChosenSource::WebSearch,
                degraded: false,
                warnings: vec![],
            },
            input_warnings: vec![],
            created_at: Utc::now(),
            feedback_received_at: None,
        }
    }

    #[test]
    fn test_high_rating_has_no_tags() {
        let s = session(vec!["Subtract 1".to_string()]);
        let feedback = Feedback::new(s.id, 5, Some("Great, thanks".to_string()));
        assert!(HeuristicTagger.tag(&feedback, &s).is_empty());
    }

    #[test]
    fn test_low_rating_with_comments() {
        let s = session(vec!["Subtract 1".to_string()]);
        let feedback = Feedback::new(s.id, 1, Some("The answer is WRONG and confusing".to_string()));
        let tags = HeuristicTagger.tag(&feedback, &s);

        for expected in [
            "improve_accuracy",
            "add_more_explanations",
            "verify_solution",
            "improve_clarity",
        ] {
            assert!(tags.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_evaluation_scores() {
        let s = session(vec![]);
        let feedback = Feedback::new(s.id, 3, None).with_evaluation(Evaluation {
            accuracy: 0.9,
            clarity: 0.5,
            completeness: 0.4,
        });
        let tags = HeuristicTagger.tag(&feedback, &s);
        assert_eq!(
            tags,
            vec!["add_more_steps".to_string(), "simplify_explanations".to_string()]
        );
    }

    #[test]
    fn test_caller_tags_kept_first() {
        let s = session(vec![]);
        let mut feedback = Feedback::new(s.id, 2, None);
        feedback.tags = vec!["improve_accuracy".to_string(), "custom".to_string()];

        let tags = HeuristicTagger.tag(&feedback, &s);
        assert_eq!(tags[0], "improve_accuracy");
        assert_eq!(tags[1], "custom");
        assert_eq!(tags.iter().filter(|t| *t == "improve_accuracy").count(), 1);
    }
}
