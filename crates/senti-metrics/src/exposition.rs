//! Prometheus text exposition of the collector summary

use crate::collector::MetricsSummary;
use crate::{MetricsError, Result};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

/// Content type of the Prometheus text format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub const REQUESTS_TOTAL: &str = "app_requests_total";
pub const ERRORS_TOTAL: &str = "app_errors_total";
pub const REQUEST_DURATION_MS: &str = "app_request_duration_ms";
pub const MODEL_LOADED: &str = "app_model_loaded";

/// Render `summary` and the model readiness flag in the Prometheus text format.
///
/// All four series are always present, zero-valued when there has been no
/// traffic.
pub fn render_prometheus(summary: &MetricsSummary, model_loaded: bool) -> Result<String> {
    let registry = Registry::new();

    let requests = IntCounter::new(REQUESTS_TOTAL, "Total number of requests")?;
    requests.inc_by(summary.requests_total);
    registry.register(Box::new(requests))?;

    let errors = IntCounter::new(ERRORS_TOTAL, "Total number of errors")?;
    errors.inc_by(summary.errors_total);
    registry.register(Box::new(errors))?;

    let duration = Gauge::new(
        REQUEST_DURATION_MS,
        "Average request duration in milliseconds over the latency window",
    )?;
    duration.set(summary.average_latency_ms);
    registry.register(Box::new(duration))?;

    let loaded = IntGauge::new(MODEL_LOADED, "Whether the model is loaded (1) or not (0)")?;
    loaded.set(i64::from(model_loaded));
    registry.register(Box::new(loaded))?;

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| MetricsError::Export(format!("Failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| MetricsError::Export(format!("Failed to convert metrics to string: {}", e)))
}
