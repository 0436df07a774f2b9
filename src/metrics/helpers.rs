//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::notification::ChannelIdentity;

use super::{
    DISPATCHES_TOTAL, FETCH_DURATION, LINKS_EXTRACTED_TOTAL, MENTIONS_DISPATCHED_TOTAL,
    NOTIFICATIONS_DROPPED_TOTAL, NOTIFICATIONS_RECEIVED_TOTAL, NOTIFICATIONS_REDELIVERED_TOTAL,
    REDIS_CONNECTION_STATUS, RUNS_TOTAL, RUN_DURATION,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording pipeline metrics
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record a finished run. `outcome` is "acknowledged" or an error kind.
    pub fn record_run(outcome: &str, elapsed: Duration) {
        RUNS_TOTAL.with_label_values(&[outcome]).inc();
        RUN_DURATION.observe(elapsed.as_secs_f64());
    }

    pub fn record_fetch(elapsed: Duration) {
        FETCH_DURATION.observe(elapsed.as_secs_f64());
    }

    pub fn record_links(count: usize) {
        LINKS_EXTRACTED_TOTAL.inc_by(count as u64);
    }

    pub fn record_dispatch(channel: ChannelIdentity, success: bool) {
        let result = if success { "ok" } else { "error" };
        DISPATCHES_TOTAL
            .with_label_values(&[channel.as_str(), result])
            .inc();
        if success && channel == ChannelIdentity::Webmention {
            MENTIONS_DISPATCHED_TOTAL.inc();
        }
    }
}

/// Helper struct for recording incoming consumer metrics
pub struct ConsumerMetrics;

impl ConsumerMetrics {
    pub fn record_received(count: usize) {
        NOTIFICATIONS_RECEIVED_TOTAL.inc_by(count as u64);
    }

    pub fn record_redelivered(count: usize) {
        NOTIFICATIONS_REDELIVERED_TOTAL.inc_by(count as u64);
    }

    pub fn record_dropped() {
        NOTIFICATIONS_DROPPED_TOTAL.inc();
    }
}

/// Helper struct for Redis connection metrics
pub struct RedisMetrics;

impl RedisMetrics {
    pub fn set_connected(connected: bool) {
        REDIS_CONNECTION_STATUS.set(if connected { 1 } else { 0 });
    }
}
