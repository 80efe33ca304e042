//! Read-only learning rollups over sessions, feedback and the performance store

use crate::performance::PerformanceSnapshot;
use crate::types::{ChosenSource, Feedback, Session, Source, Topic};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const DEFAULT_TOP_TAGS: usize = 5;
const DEFAULT_TREND_WINDOW: usize = 5;

/// Metrics for one (topic, source) bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketMetrics {
    pub topic: Topic,
    pub source: Source,
    pub count: u64,
    pub avg_rating: f64,
    pub avg_confidence: f64,

    /// Current threshold adjustment for the bucket's topic
    pub threshold_adjustment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUsage {
    pub source: ChosenSource,
    pub count: usize,
}

/// Averages of structured evaluations, when any were submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationAverages {
    pub samples: usize,
    pub accuracy: f64,
    pub clarity: f64,
    pub completeness: f64,
}

/// Recent ratings compared with everything before them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trend", rename_all = "snake_case")]
pub enum Trend {
    InsufficientData,
    Improving { recent: f64, previous: f64 },
    Declining { recent: f64, previous: f64 },
    Stable { recent: f64, previous: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningInsights {
    pub total_interactions: usize,
    pub feedback_count: usize,

    /// Mean of all ratings (`None` without feedback)
    pub average_rating: Option<f64>,

    /// Rating (1-5) to number of times given
    pub rating_distribution: BTreeMap<u8, usize>,

    pub buckets: Vec<BucketMetrics>,
    pub source_usage: Vec<SourceUsage>,

    /// Most frequent improvement tags, most common first
    pub common_improvements: Vec<TagCount>,

    pub evaluation: Option<EvaluationAverages>,
    pub trend: Trend,
}

/// Builds [`LearningInsights`]; never mutates its inputs
#[derive(Debug, Clone)]
pub struct InsightsAggregator {
    top_tags: usize,
    trend_window: usize,
}

impl Default for InsightsAggregator {
    fn default() -> Self {
        Self {
            top_tags: DEFAULT_TOP_TAGS,
            trend_window: DEFAULT_TREND_WINDOW,
        }
    }
}

impl InsightsAggregator {
    pub fn new(top_tags: usize, trend_window: usize) -> Self {
        Self {
            top_tags,
            trend_window: trend_window.max(1),
        }
    }

    pub fn summarize(
        &self,
        history: &[Session],
        feedbacks: &[Feedback],
        snapshot: &PerformanceSnapshot,
    ) -> LearningInsights {
        let ratings: Vec<f64> = feedbacks.iter().map(|f| f64::from(f.rating)).collect();

        let mut rating_distribution = BTreeMap::new();
        for feedback in feedbacks {
            *rating_distribution.entry(feedback.rating).or_insert(0) += 1;
        }

        let buckets = snapshot
            .buckets
            .iter()
            .map(|b| BucketMetrics {
                topic: b.topic,
                source: b.source,
                count: b.count,
                avg_rating: b.avg_rating,
                avg_confidence: b.avg_confidence,
                threshold_adjustment: snapshot.adjustment(b.topic).adjustment,
            })
            .collect();

        LearningInsights {
            total_interactions: history.len(),
            feedback_count: feedbacks.len(),
            average_rating: mean(&ratings),
            rating_distribution,
            buckets,
            source_usage: source_usage(history),
            common_improvements: self.rank_tags(feedbacks),
            evaluation: evaluation_averages(feedbacks),
            trend: self.trend(&ratings),
        }
    }

    fn rank_tags(&self, feedbacks: &[Feedback]) -> Vec<TagCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for tag in feedbacks.iter().flat_map(|f| f.tags.iter()) {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }

        let mut ranked: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag: tag.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        ranked.truncate(self.top_tags);
        ranked
    }

    fn trend(&self, ratings: &[f64]) -> Trend {
        if ratings.len() <= self.trend_window {
            return Trend::InsufficientData;
        }

        let (older, recent) = ratings.split_at(ratings.len() - self.trend_window);
        let (Some(recent), Some(previous)) = (mean(recent), mean(older)) else {
            return Trend::InsufficientData;
        };

        if (recent - previous).abs() < 1e-9 {
            Trend::Stable { recent, previous }
        } else if recent > previous {
            Trend::Improving { recent, previous }
        } else {
            Trend::Declining { recent, previous }
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn source_usage(history: &[Session]) -> Vec<SourceUsage> {
    [ChosenSource::KnowledgeBase, ChosenSource::WebSearch, ChosenSource::None]
        .into_iter()
        .map(|source| SourceUsage {
            source,
            count: history
                .iter()
                .filter(|s| s.routing_decision.chosen_source == source)
                .count(),
        })
        .collect()
}

fn evaluation_averages(feedbacks: &[Feedback]) -> Option<EvaluationAverages> {
    let evaluations: Vec<_> = feedbacks.iter().filter_map(|f| f.evaluation).collect();
    let n = evaluations.len();
    if n == 0 {
        return None;
    }

    let avg = |f: fn(&crate::types::Evaluation) -> f64| {
        evaluations.iter().map(f).sum::<f64>() / n as f64
    };
    Some(EvaluationAverages {
        samples: n,
        accuracy: avg(|e| e.accuracy),
        clarity: avg(|e| e.clarity),
        completeness: avg(|e| e.completeness),
    })
}
