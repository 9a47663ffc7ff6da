//! # senti-metrics
//!
//! Request metrics for senti.
//!
//! This crate provides:
//! - A mutex-guarded [`MetricsCollector`] for request/error counts and a
//!   bounded rolling latency window
//! - A [`RequestTimer`] drop guard that records a request however it ends
//! - Prometheus text exposition of the collector summary

pub mod collector;
pub mod exposition;

// Re-export commonly used types
pub use collector::{MetricsCollector, MetricsSummary, RequestTimer, DEFAULT_LATENCY_WINDOW};
pub use exposition::{render_prometheus, CONTENT_TYPE};

// Error handling
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Registry error: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("Export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
