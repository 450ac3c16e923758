//! Metrics for the padel-rating service
//!
//! This module provides Prometheus metrics collection for rating activity.
//! The engine and service record into a [`MetricsCollector`] when one is
//! attached; nothing is exported over the network.

pub mod collector;

pub use collector::{EngineMetrics, MetricsCollector, MetricsTimer, ServiceMetrics};
