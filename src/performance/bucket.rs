//! Per-(topic, source) aggregate statistics.

use crate::types::{Source, Topic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One rated outcome to fold into a bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// User rating on the 1-5 scale
    pub rating: f64,

    /// Confidence the routing decision reported
    pub confidence: f64,

    /// EMA decay in (0, 1)
    pub alpha: f64,
}

/// Aggregate routing performance for one (topic, source) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBucket {
    pub topic: Topic,
    pub source: Source,

    /// Number of feedback entries folded into this bucket
    pub count: u64,

    /// Exponential moving average of ratings (1-5)
    pub avg_rating: f64,

    /// Exponential moving average of decision confidence
    pub avg_confidence: f64,

    pub last_updated: Option<DateTime<Utc>>,
}

impl PerformanceBucket {
    pub fn empty(topic: Topic, source: Source) -> Self {
        Self {
            topic,
            source,
            count: 0,
            avg_rating: 0.0,
            avg_confidence: 0.0,
            last_updated: None,
        }
    }

    pub fn has_feedback(&self) -> bool {
        self.count > 0
    }

    /// Fold one observation using an exponential moving average
    ///
    /// `avg' = avg + alpha * (x - avg)`; the first observation sets the value
    /// directly.
    pub fn fold(&mut self, observation: &Observation) {
        if self.count == 0 {
            self.avg_rating = observation.rating;
            self.avg_confidence = observation.confidence;
        } else {
            self.avg_rating += observation.alpha * (observation.rating - self.avg_rating);
            self.avg_confidence +=
                observation.alpha * (observation.confidence - self.avg_confidence);
        }
        self.count += 1;
        self.last_updated = Some(Utc::now());
    }

    /// Average rating mapped from [1, 5] to [0, 1]
    pub fn normalized_rating(&self) -> Option<f64> {
        self.has_feedback()
            .then(|| ((self.avg_rating - 1.0) / 4.0).clamp(0.0, 1.0))
    }
}
