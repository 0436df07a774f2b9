//! Prometheus metrics for the dispatcher.
//!
//! - Pipeline metrics (runs by outcome, run and fetch latency)
//! - Link metrics (links extracted, mentions dispatched)
//! - Channel metrics (dispatches per channel)
//! - Consumer metrics (entries received, redelivered, dropped)
//! - Redis connection status

mod helpers;

pub use helpers::{encode_metrics, ConsumerMetrics, PipelineMetrics, RedisMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "mention_dispatcher";

lazy_static! {
    // ============================================================================
    // Pipeline Metrics
    // ============================================================================

    /// Pipeline runs by outcome ("acknowledged" or the failing step)
    pub static ref RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_runs_total", METRIC_PREFIX),
        "Pipeline runs by outcome",
        &["outcome"]
    ).unwrap();

    /// Duration of a full pipeline run
    pub static ref RUN_DURATION: Histogram = register_histogram!(
        format!("{}_run_duration_seconds", METRIC_PREFIX),
        "Pipeline run duration in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    /// Duration of document fetches
    pub static ref FETCH_DURATION: Histogram = register_histogram!(
        format!("{}_fetch_duration_seconds", METRIC_PREFIX),
        "Document fetch duration in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0]
    ).unwrap();

    // ============================================================================
    // Link Metrics
    // ============================================================================

    /// Qualifying links found in fetched documents
    pub static ref LINKS_EXTRACTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_links_extracted_total", METRIC_PREFIX),
        "Qualifying outbound links extracted"
    ).unwrap();

    /// Mentions successfully dispatched
    pub static ref MENTIONS_DISPATCHED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_mentions_dispatched_total", METRIC_PREFIX),
        "Mentions dispatched to the webmention channel"
    ).unwrap();

    // ============================================================================
    // Channel Metrics
    // ============================================================================

    /// Dispatch attempts per channel and result
    pub static ref DISPATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatches_total", METRIC_PREFIX),
        "Dispatch attempts by channel and result",
        &["channel", "result"]
    ).unwrap();

    // ============================================================================
    // Consumer Metrics
    // ============================================================================

    /// Entries read from the incoming stream
    pub static ref NOTIFICATIONS_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_received_total", METRIC_PREFIX),
        "Inbound notifications received"
    ).unwrap();

    /// Entries reclaimed for redelivery after sitting unacknowledged
    pub static ref NOTIFICATIONS_REDELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_redelivered_total", METRIC_PREFIX),
        "Inbound notifications reclaimed for redelivery"
    ).unwrap();

    /// Entries dropped because they carried no body
    pub static ref NOTIFICATIONS_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_dropped_total", METRIC_PREFIX),
        "Inbound entries dropped without a body"
    ).unwrap();

    // ============================================================================
    // Redis Metrics
    // ============================================================================

    /// Redis connection status (1 = connected, 0 = disconnected)
    pub static ref REDIS_CONNECTION_STATUS: IntGauge = register_int_gauge!(
        format!("{}_redis_connection_status", METRIC_PREFIX),
        "Redis connection status (1=connected, 0=disconnected)"
    ).unwrap();
}
