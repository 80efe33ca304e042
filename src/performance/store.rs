//! Performance store repository trait and in-memory implementation.

use super::{Observation, PerformanceBucket, PerformanceSnapshot, ThresholdAdjustment};
use crate::error::Result;
use crate::types::{Source, Topic};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Repository for routing performance state
///
/// Injected into the routing agent and the feedback learner. The learner is
/// the only writer.
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    /// Consistent-enough copy of all buckets and adjustments
    async fn snapshot(&self) -> Result<PerformanceSnapshot>;

    /// Current state of one bucket (empty if never written)
    async fn bucket(&self, topic: Topic, source: Source) -> Result<PerformanceBucket>;

    /// Fold an observation into one bucket; serialized per (topic, source)
    async fn fold_observation(
        &self,
        topic: Topic,
        source: Source,
        observation: Observation,
    ) -> Result<PerformanceBucket>;

    /// Current adjustment for a topic (version 0 if never written)
    async fn adjustment(&self, topic: Topic) -> Result<ThresholdAdjustment>;

    /// Replace the adjustment if its version still equals `expected_version`
    ///
    /// Returns the stored value on success, `None` on a version conflict.
    async fn compare_and_update_adjustment(
        &self,
        topic: Topic,
        expected_version: u64,
        adjustment: f64,
    ) -> Result<Option<ThresholdAdjustment>>;
}

type BucketKey = (Topic, Source);

/// In-process performance store
///
/// Each bucket sits behind its own mutex, so updates to one (topic, source)
/// pair never wait on another.
pub struct InMemoryPerformanceStore {
    buckets: RwLock<HashMap<BucketKey, Arc<Mutex<PerformanceBucket>>>>,
    adjustments: Mutex<HashMap<Topic, ThresholdAdjustment>>,
}

impl InMemoryPerformanceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            adjustments: Mutex::new(HashMap::new()),
        }
    }

    /// Restore a store from a previously taken snapshot
    pub fn from_snapshot(snapshot: PerformanceSnapshot) -> Self {
        let buckets = snapshot
            .buckets
            .into_iter()
            .map(|b| ((b.topic, b.source), Arc::new(Mutex::new(b))))
            .collect();
        let adjustments = snapshot
            .adjustments
            .into_iter()
            .map(|a| (a.topic, a))
            .collect();

        Self {
            buckets: RwLock::new(buckets),
            adjustments: Mutex::new(adjustments),
        }
    }

    async fn bucket_handle(&self, key: BucketKey) -> Arc<Mutex<PerformanceBucket>> {
        if let Some(handle) = self.buckets.read().await.get(&key) {
            return Arc::clone(handle);
        }

        let mut buckets = self.buckets.write().await;
        Arc::clone(
            buckets
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(PerformanceBucket::empty(key.0, key.1)))),
        )
    }
}

impl Default for InMemoryPerformanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PerformanceStore for InMemoryPerformanceStore {
    async fn snapshot(&self) -> Result<PerformanceSnapshot> {
        let handles: Vec<_> = self.buckets.read().await.values().cloned().collect();

        let mut buckets = Vec::with_capacity(handles.len());
        for handle in handles {
            buckets.push(handle.lock().await.clone());
        }
        buckets.sort_by_key(|b| (b.topic, b.source));

        let mut adjustments: Vec<_> = self.adjustments.lock().await.values().copied().collect();
        adjustments.sort_by_key(|a| a.topic);

        Ok(PerformanceSnapshot {
            buckets,
            adjustments,
            taken_at: Utc::now(),
        })
    }

    async fn bucket(&self, topic: Topic, source: Source) -> Result<PerformanceBucket> {
        let handle = self.buckets.read().await.get(&(topic, source)).cloned();
        Ok(match handle {
            Some(handle) => handle.lock().await.clone(),
            None => PerformanceBucket::empty(topic, source),
        })
    }

    async fn fold_observation(
        &self,
        topic: Topic,
        source: Source,
        observation: Observation,
    ) -> Result<PerformanceBucket> {
        let handle = self.bucket_handle((topic, source)).await;
        let mut bucket = handle.lock().await;
        bucket.fold(&observation);

        debug!(
            "Folded rating {:.1} into {}/{}: count={} avg_rating={:.3}",
            observation.rating, topic, source, bucket.count, bucket.avg_rating
        );

        Ok(bucket.clone())
    }

    async fn adjustment(&self, topic: Topic) -> Result<ThresholdAdjustment> {
        Ok(self
            .adjustments
            .lock()
            .await
            .get(&topic)
            .copied()
            .unwrap_or_else(|| ThresholdAdjustment::initial(topic)))
    }

    async fn compare_and_update_adjustment(
        &self,
        topic: Topic,
        expected_version: u64,
        adjustment: f64,
    ) -> Result<Option<ThresholdAdjustment>> {
        let mut adjustments = self.adjustments.lock().await;
        let current = adjustments
            .entry(topic)
            .or_insert_with(|| ThresholdAdjustment::initial(topic));

        if current.version != expected_version {
            debug!(
                "Adjustment version conflict for {}: expected {}, found {}",
                topic, expected_version, current.version
            );
            return Ok(None);
        }

        current.adjustment = adjustment;
        current.version += 1;
        Ok(Some(*current))
    }
}
