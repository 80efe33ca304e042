//! Performance store: routing outcome statistics and adaptive thresholds.
//!
//! Two kinds of state live here:
//! - **Buckets** keyed by (topic, source) with EMA rating/confidence.
//!   Writes to one bucket are serialized; independent buckets update
//!   concurrently.
//! - **Threshold adjustments** keyed by topic. Each carries a version and is
//!   written with compare-and-update, so a writer that read a stale value
//!   retries instead of overwriting a concurrent change.
//!
//! Readers take a [`PerformanceSnapshot`]. A snapshot may lag behind
//! concurrent feedback; that only biases future routing, never the answer
//! currently being composed.

pub mod bucket;
pub mod store;

pub use bucket::{Observation, PerformanceBucket};
pub use store::{InMemoryPerformanceStore, PerformanceStore};

use crate::types::{Source, Topic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed offset applied to a topic's base routing threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAdjustment {
    pub topic: Topic,
    pub adjustment: f64,

    /// Incremented on every successful update
    pub version: u64,
}

impl ThresholdAdjustment {
    pub fn initial(topic: Topic) -> Self {
        Self {
            topic,
            adjustment: 0.0,
            version: 0,
        }
    }
}

/// Point-in-time copy of the performance store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// Buckets sorted by (topic, source)
    pub buckets: Vec<PerformanceBucket>,

    /// Adjustments sorted by topic
    pub adjustments: Vec<ThresholdAdjustment>,

    pub taken_at: DateTime<Utc>,
}

impl PerformanceSnapshot {
    /// Snapshot of a store with no recorded feedback
    pub fn empty() -> Self {
        Self {
            buckets: Vec::new(),
            adjustments: Vec::new(),
            taken_at: Utc::now(),
        }
    }

    pub fn bucket(&self, topic: Topic, source: Source) -> Option<&PerformanceBucket> {
        self.buckets
            .iter()
            .find(|b| b.topic == topic && b.source == source)
    }

    /// Average rating, if the bucket has any feedback
    pub fn avg_rating(&self, topic: Topic, source: Source) -> Option<f64> {
        self.bucket(topic, source)
            .filter(|b| b.has_feedback())
            .map(|b| b.avg_rating)
    }

    pub fn adjustment(&self, topic: Topic) -> ThresholdAdjustment {
        self.adjustments
            .iter()
            .find(|a| a.topic == topic)
            .copied()
            .unwrap_or_else(|| ThresholdAdjustment::initial(topic))
    }

    /// Total feedback folded across all buckets
    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

impl Default for PerformanceSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_lookups() {
        let snapshot = PerformanceSnapshot::empty();
        assert!(snapshot.bucket(Topic::Algebra, Source::KnowledgeBase).is_none());
        assert_eq!(snapshot.avg_rating(Topic::Algebra, Source::WebSearch), None);
        assert_eq!(
            snapshot.adjustment(Topic::Calculus),
            ThresholdAdjustment::initial(Topic::Calculus)
        );
        assert_eq!(snapshot.total_count(), 0);
    }

    #[test]
    fn test_snapshot_ignores_empty_bucket_rating() {
        let snapshot = PerformanceSnapshot {
            buckets: vec![PerformanceBucket::empty(Topic::Algebra, Source::WebSearch)],
            adjustments: vec![],
            taken_at: Utc::now(),
        };
        assert!(snapshot.bucket(Topic::Algebra, Source::WebSearch).is_some());
        assert_eq!(snapshot.avg_rating(Topic::Algebra, Source::WebSearch), None);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut bucket = PerformanceBucket::empty(Topic::Statistics, Source::KnowledgeBase);
        bucket.fold(&Observation {
            rating: 4.0,
            confidence: 0.8,
            alpha: 0.2,
        });
        let snapshot = PerformanceSnapshot {
            buckets: vec![bucket],
            adjustments: vec![ThresholdAdjustment {
                topic: Topic::Statistics,
                adjustment: 0.02,
                version: 1,
            }],
            taken_at: Utc::now(),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"statistics\""));
        let parsed: PerformanceSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
