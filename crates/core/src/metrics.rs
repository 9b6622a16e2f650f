//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Notification broker (publishes, dropped deliveries, live subscribers)
//! - Processing pipeline (runs by result, stage failures)
//! - Rendition encoding (per-variant encode duration)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Broker Metrics
// =============================================================================

/// Messages handed to the broker for publishing.
pub static BROKER_MESSAGES_PUBLISHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vodpipe_broker_messages_published_total",
        "Total messages published to the notification broker",
    )
    .unwrap()
});

/// Deliveries dropped because a subscriber inbox was full.
pub static BROKER_DELIVERIES_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vodpipe_broker_deliveries_dropped_total",
        "Deliveries dropped because the subscriber inbox was full",
    )
    .unwrap()
});

/// Subscribers currently registered across all topics.
pub static BROKER_ACTIVE_SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "vodpipe_broker_active_subscribers",
        "Number of subscribers currently registered with the broker",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Pipeline runs by terminal result.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vodpipe_pipeline_runs_total", "Total processing pipeline runs"),
        &["result"], // "ready", "error"
    )
    .unwrap()
});

/// Pipeline failures by stage.
pub static PIPELINE_STAGE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vodpipe_pipeline_stage_failures_total",
            "Total pipeline failures by stage",
        ),
        &["stage"],
    )
    .unwrap()
});

/// Duration of a single rendition encode.
pub static RENDITION_ENCODE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vodpipe_rendition_encode_duration_seconds",
            "Duration of encoding one rendition variant",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["variant", "result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Broker
        Box::new(BROKER_MESSAGES_PUBLISHED.clone()),
        Box::new(BROKER_DELIVERIES_DROPPED.clone()),
        Box::new(BROKER_ACTIVE_SUBSCRIBERS.clone()),
        // Pipeline
        Box::new(PIPELINE_RUNS.clone()),
        Box::new(PIPELINE_STAGE_FAILURES.clone()),
        // Renditions
        Box::new(RENDITION_ENCODE_DURATION.clone()),
    ]
}
