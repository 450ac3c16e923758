//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the rating engine and the
//! registration/match-recording service built on it.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the rating service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Rating engine metrics
    engine_metrics: EngineMetrics,

    /// Service-level metrics
    service_metrics: ServiceMetrics,
}

/// Rating engine metrics
#[derive(Clone)]
pub struct EngineMetrics {
    /// Applied rating changes by direction (up, down, none)
    pub rating_changes_total: IntCounterVec,

    /// Changes reduced by the daily cap
    pub daily_cap_hits_total: IntCounter,

    /// Changes reduced by the global rating bounds
    pub global_clamp_hits_total: IntCounter,

    /// Current number of daily ledger entries
    pub ledger_entries: IntGauge,

    /// Ledger entries dropped by pruning
    pub ledger_entries_pruned_total: IntCounter,

    /// Ratings after each applied change
    pub rating_distribution: Histogram,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Matches settled
    pub matches_settled_total: IntCounter,

    /// Matches rejected, by reason
    pub matches_rejected_total: IntCounterVec,

    /// Players registered through trial matches
    pub players_registered_total: IntCounter,

    /// Time spent settling a match
    pub settlement_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let engine_metrics = EngineMetrics::new(&registry)?;
        let service_metrics = ServiceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            engine_metrics,
            service_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get engine metrics
    pub fn engine(&self) -> &EngineMetrics {
        &self.engine_metrics
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Record one applied rating change
    pub fn record_rating_change(&self, actual_change: f64, new_rating: f64) {
        let direction = if actual_change > 0.0 {
            "up"
        } else if actual_change < 0.0 {
            "down"
        } else {
            "none"
        };

        self.engine_metrics
            .rating_changes_total
            .with_label_values(&[direction])
            .inc();
        self.engine_metrics.rating_distribution.observe(new_rating);
    }

    /// Record a change that the daily cap reduced
    pub fn record_daily_cap_hit(&self) {
        self.engine_metrics.daily_cap_hits_total.inc();
    }

    /// Record a change that the global bounds reduced
    pub fn record_global_clamp_hit(&self) {
        self.engine_metrics.global_clamp_hits_total.inc();
    }

    /// Record ledger pruning and the resulting ledger size
    pub fn record_ledger_state(&self, entries: usize, pruned: usize) {
        self.engine_metrics.ledger_entries.set(entries as i64);
        if pruned > 0 {
            self.engine_metrics
                .ledger_entries_pruned_total
                .inc_by(pruned as u64);
        }
    }

    /// Record a settled match
    pub fn record_match_settled(&self, duration: Duration) {
        self.service_metrics.matches_settled_total.inc();
        self.service_metrics
            .settlement_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a match that failed validation or lookup
    pub fn record_match_rejected(&self, reason: &str) {
        self.service_metrics
            .matches_rejected_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record a newly registered player
    pub fn record_player_registered(&self) {
        self.service_metrics.players_registered_total.inc();
    }

    /// Start a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop timer and return elapsed duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl EngineMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rating_changes_total = IntCounterVec::new(
            Opts::new(
                "padel_rating_changes_total",
                "Applied rating changes by direction",
            ),
            &["direction"],
        )?;
        registry.register(Box::new(rating_changes_total.clone()))?;

        let daily_cap_hits_total = IntCounter::new(
            "padel_rating_daily_cap_hits_total",
            "Rating changes reduced by the daily cap",
        )?;
        registry.register(Box::new(daily_cap_hits_total.clone()))?;

        let global_clamp_hits_total = IntCounter::new(
            "padel_rating_global_clamp_hits_total",
            "Rating changes reduced by the global rating bounds",
        )?;
        registry.register(Box::new(global_clamp_hits_total.clone()))?;

        let ledger_entries = IntGauge::new(
            "padel_rating_ledger_entries",
            "Entries currently held in the daily change ledger",
        )?;
        registry.register(Box::new(ledger_entries.clone()))?;

        let ledger_entries_pruned_total = IntCounter::new(
            "padel_rating_ledger_entries_pruned_total",
            "Daily ledger entries dropped by pruning",
        )?;
        registry.register(Box::new(ledger_entries_pruned_total.clone()))?;

        let rating_distribution = Histogram::with_opts(
            HistogramOpts::new(
                "padel_rating_distribution",
                "Player ratings after each applied change",
            )
            .buckets(vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 5.5, 6.0, 6.5, 7.0]),
        )?;
        registry.register(Box::new(rating_distribution.clone()))?;

        Ok(Self {
            rating_changes_total,
            daily_cap_hits_total,
            global_clamp_hits_total,
            ledger_entries,
            ledger_entries_pruned_total,
            rating_distribution,
        })
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_settled_total =
            IntCounter::new("padel_matches_settled_total", "Matches settled")?;
        registry.register(Box::new(matches_settled_total.clone()))?;

        let matches_rejected_total = IntCounterVec::new(
            Opts::new("padel_matches_rejected_total", "Matches rejected by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(matches_rejected_total.clone()))?;

        let players_registered_total = IntCounter::new(
            "padel_players_registered_total",
            "Players registered through trial matches",
        )?;
        registry.register(Box::new(players_registered_total.clone()))?;

        let settlement_duration = Histogram::with_opts(
            HistogramOpts::new(
                "padel_match_settlement_duration_seconds",
                "Time spent settling a match",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1]),
        )?;
        registry.register(Box::new(settlement_duration.clone()))?;

        Ok(Self {
            matches_settled_total,
            matches_rejected_total,
            players_registered_total,
            settlement_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
