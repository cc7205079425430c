//! Reader configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub use contracts::DropPolicy;
use contracts::{LinkConfig, PipelineConfig};

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Channel capacity
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

impl BackpressureConfig {
    /// Create new backpressure configuration
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

impl From<&PipelineConfig> for BackpressureConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self::new(config.queue_capacity, config.drop_policy)
    }
}

/// Link reader loop settings
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    /// Bytes requested per read
    pub read_chunk: usize,

    /// Largest accumulation without a tail before it is discarded
    pub max_frame_len: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            read_chunk: 64,
            max_frame_len: 256,
        }
    }
}

impl ReaderSettings {
    pub fn from_config(link: &LinkConfig, pipeline: &PipelineConfig) -> Self {
        Self {
            read_chunk: link.read_chunk,
            max_frame_len: pipeline.max_frame_len,
        }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Bytes read from the link
    pub bytes_read: AtomicU64,

    /// Candidate frames cut from the stream
    pub frames_received: AtomicU64,

    /// Candidates discarded because the queue was full
    pub frames_dropped: AtomicU64,

    /// Accumulations discarded for exceeding the max frame length
    pub overflows: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record bytes read
    pub fn record_bytes(&self, n: usize) {
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Record candidate frame received
    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record candidate frame dropped
    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record discarded accumulations
    pub fn record_overflows(&self, n: u64) {
        self.overflows.fetch_add(n, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub overflows: u64,
    pub queue_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_blueprint() {
        let blueprint = contracts::RadarBlueprint::default();
        let settings = ReaderSettings::from_config(&blueprint.link, &blueprint.pipeline);
        assert_eq!(settings.read_chunk, 64);
        assert_eq!(settings.max_frame_len, 256);

        let backpressure = BackpressureConfig::from(&blueprint.pipeline);
        assert_eq!(backpressure.drop_policy, DropPolicy::DropOldest);
        assert_eq!(backpressure.channel_capacity, 100);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = IngestionMetrics::new();
        metrics.record_bytes(30);
        metrics.record_received();
        metrics.record_dropped();
        metrics.record_overflows(2);
        metrics.update_queue_len(5);

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                bytes_read: 30,
                frames_received: 1,
                frames_dropped: 1,
                overflows: 2,
                queue_len: 5,
            }
        );
    }
}
