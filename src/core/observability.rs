//! Metrics for the bus and the relay.
//!
//! Counters and durations are keyed by name plus a sorted label set, e.g.
//! `bus_dispatch_total{outcome=success,plugin=ledger-controller}`.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

pub type Labels<'a> = &'a [(&'a str, &'a str)];

/// Metric names emitted by this crate
pub mod names {
    pub const BUS_DISPATCH_TOTAL: &str = "bus_dispatch_total";
    pub const BUS_DISPATCH_DURATION_MS: &str = "bus_dispatch_duration_ms";
    pub const BUS_UNCLAIMED_TOTAL: &str = "bus_unclaimed_total";
    pub const RELAY_CONNECTIONS_TOTAL: &str = "relay_connections_total";
    pub const RELAY_FRAMES_TOTAL: &str = "relay_frames_total";
    pub const RELAY_FRAMES_DROPPED_TOTAL: &str = "relay_frames_dropped_total";
}

pub trait MetricsSink: Send + Sync + 'static {
    fn incr_counter(&self, name: &str, value: u64, labels: Labels<'_>);
    fn observe_duration_ms(&self, name: &str, duration_ms: u64, labels: Labels<'_>);
}

/// Discards everything; the bus default
#[derive(Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr_counter(&self, _name: &str, _value: u64, _labels: Labels<'_>) {}

    fn observe_duration_ms(&self, _name: &str, _duration_ms: u64, _labels: Labels<'_>) {}
}

/// Aggregate of one duration series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationStats {
    pub count: u64,
    pub sum_ms: u64,
    pub max_ms: u64,
}

impl DurationStats {
    fn record(&mut self, duration_ms: u64) {
        self.count = self.count.saturating_add(1);
        self.sum_ms = self.sum_ms.saturating_add(duration_ms);
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn mean_ms(&self) -> u64 {
        self.sum_ms.checked_div(self.count).unwrap_or(0)
    }
}

/// Point-in-time copy of an [`InMemoryMetrics`], sorted by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(String, u64)>,
    pub durations: Vec<(String, DurationStats)>,
}

impl MetricsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.durations.is_empty()
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.counters {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{key}={value}")?;
        }
        for (key, stats) in &self.durations {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(
                f,
                "{key}=n:{},mean:{}ms,max:{}ms",
                stats.count,
                stats.mean_ms(),
                stats.max_ms
            )?;
        }
        Ok(())
    }
}

/// Process-local metrics store, shared between the bus and the relay
#[derive(Default)]
pub struct InMemoryMetrics {
    counters: DashMap<String, u64>,
    durations: DashMap<String, DurationStats>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of one counter
    pub fn counter(&self, name: &str, labels: Labels<'_>) -> u64 {
        self.counters
            .get(&metric_key(name, labels))
            .map_or(0, |v| *v.value())
    }

    pub fn duration(&self, name: &str, labels: Labels<'_>) -> Option<DurationStats> {
        self.durations
            .get(&metric_key(name, labels))
            .map(|v| *v.value())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut counters: Vec<_> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        counters.sort_by(|a, b| a.0.cmp(&b.0));

        let mut durations: Vec<_> = self
            .durations
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        durations.sort_by(|a, b| a.0.cmp(&b.0));

        MetricsSnapshot {
            counters,
            durations,
        }
    }
}

impl MetricsSink for InMemoryMetrics {
    fn incr_counter(&self, name: &str, value: u64, labels: Labels<'_>) {
        let mut counter = self.counters.entry(metric_key(name, labels)).or_insert(0);
        *counter = counter.saturating_add(value);
    }

    fn observe_duration_ms(&self, name: &str, duration_ms: u64, labels: Labels<'_>) {
        self.durations
            .entry(metric_key(name, labels))
            .or_default()
            .record(duration_ms);
    }
}

/// Log a snapshot every `interval` until the returned task is aborted.
/// Nothing is logged while the store is empty.
pub fn spawn_metrics_log_reporter(
    metrics: Arc<InMemoryMetrics>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let snapshot = metrics.snapshot();
            if !snapshot.is_empty() {
                info!("metrics: {}", snapshot);
            }
        }
    })
}

/// `name{k1=v1,k2=v2}` with labels sorted by key
pub fn metric_key(name: &str, labels: Labels<'_>) -> String {
    if labels.is_empty() {
        return name.to_string();
    }

    let mut sorted = labels.to_vec();
    sorted.sort_unstable_by_key(|(k, _)| *k);
    let pairs: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{}{{{}}}", name, pairs.join(","))
}

pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
