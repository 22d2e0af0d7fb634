//! Metric sample store
//!
//! Bounded in-memory store for ingested resource samples:
//! - FIFO eviction once `max_size` is reached
//! - Retention-based eviction of stale samples on write
//! - Lifetime cpu/memory totals that eviction never reduces

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::HealResult;
use crate::models::MetricSample;

/// Default retention period (24 hours)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum number of samples kept
pub const DEFAULT_MAX_SIZE: usize = 10_000;

/// Storage port for metric samples
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Validate and store one sample
    async fn record(&self, sample: MetricSample) -> HealResult<()>;

    /// Up to `limit` samples, most recent first
    async fn recent(&self, limit: usize) -> HealResult<Vec<MetricSample>>;

    /// All retained samples in arrival order
    async fn all(&self) -> HealResult<Vec<MetricSample>>;

    /// Totals over every sample ever recorded, evicted ones included
    async fn totals(&self) -> HealResult<SampleTotals>;

    async fn len(&self) -> usize;
}

/// Running count and sums of recorded samples
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleTotals {
    pub count: u64,
    pub cpu_sum: f64,
    pub memory_sum: f64,
}

impl SampleTotals {
    pub fn add(&mut self, sample: &MetricSample) {
        self.count += 1;
        self.cpu_sum += sample.cpu;
        self.memory_sum += sample.memory;
    }

    /// Mean cpu, 0 when nothing was recorded
    pub fn average_cpu(&self) -> f64 {
        self.mean(self.cpu_sum)
    }

    /// Mean memory, 0 when nothing was recorded
    pub fn average_memory(&self) -> f64 {
        self.mean(self.memory_sum)
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            sum / self.count as f64
        }
    }
}


/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct MetricsStoreConfig {
    pub max_retention: Duration,
    pub max_size: usize,
}

impl Default for MetricsStoreConfig {
    fn default() -> Self {
        Self {
            max_retention: DEFAULT_RETENTION,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredSample {
    sample: MetricSample,
    stored_at: DateTime<Utc>,
}

#[derive(Debug)]
struct StoreState {
    samples: VecDeque<StoredSample>,
    totals: SampleTotals,
}

/// Ring buffer of recent samples
pub struct MemoryMetricsStore {
    state: RwLock<StoreState>,
    config: MetricsStoreConfig,
}

impl MemoryMetricsStore {
    pub fn new(max_retention: Duration, max_size: usize) -> Self {
        Self::with_config(MetricsStoreConfig {
            max_retention,
            max_size,
        })
    }

    pub fn with_config(config: MetricsStoreConfig) -> Self {
        Self {
            state: RwLock::new(StoreState {
                samples: VecDeque::with_capacity(config.max_size.min(DEFAULT_MAX_SIZE)),
                totals: SampleTotals::default(),
            }),
            config,
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.max_size
    }

    /// Drop samples older than the retention window
    fn evict_expired(&self, samples: &mut VecDeque<StoredSample>, now: DateTime<Utc>) {
        let Ok(retention) = chrono::Duration::from_std(self.config.max_retention) else {
            return;
        };
        let cutoff = now - retention;
        let before = samples.len();

        while let Some(front) = samples.front() {
            if front.stored_at < cutoff {
                samples.pop_front();
            } else {
                break;
            }
        }

        let evicted = before - samples.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired metric samples");
        }
    }
}

impl Default for MemoryMetricsStore {
    fn default() -> Self {
        Self::with_config(MetricsStoreConfig::default())
    }
}

#[async_trait]
impl MetricsStore for MemoryMetricsStore {
    async fn record(&self, sample: MetricSample) -> HealResult<()> {
        sample.validate()?;

        let now = Utc::now();
        let mut state = self.state.write().await;
        self.evict_expired(&mut state.samples, now);

        while state.samples.len() >= self.config.max_size.max(1) {
            state.samples.pop_front();
        }

        state.totals.add(&sample);
        state.samples.push_back(StoredSample {
            sample,
            stored_at: now,
        });
        Ok(())
    }

    async fn recent(&self, limit: usize) -> HealResult<Vec<MetricSample>> {
        let state = self.state.read().await;
        Ok(state
            .samples
            .iter()
            .rev()
            .take(limit)
            .map(|s| s.sample.clone())
            .collect())
    }

    async fn all(&self) -> HealResult<Vec<MetricSample>> {
        let state = self.state.read().await;
        Ok(state.samples.iter().map(|s| s.sample.clone()).collect())
    }

    async fn totals(&self) -> HealResult<SampleTotals> {
        Ok(self.state.read().await.totals)
    }

    async fn len(&self) -> usize {
        self.state.read().await.samples.len()
    }
}
