//! Thread-safe request metrics collector

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Number of latency samples retained by default
pub const DEFAULT_LATENCY_WINDOW: usize = 1000;

/// Collects request volume, error volume and a bounded window of latencies.
///
/// All state lives behind a single mutex so a summary never observes a
/// half-applied update.
#[derive(Debug)]
pub struct MetricsCollector {
    state: Mutex<CollectorState>,
    window: usize,
}

#[derive(Debug, Default)]
struct CollectorState {
    requests_total: u64,
    errors_total: u64,
    latencies: VecDeque<f64>,
}

impl CollectorState {
    fn push_latency(&mut self, window: usize, duration_ms: f64) {
        if self.latencies.len() == window {
            self.latencies.pop_front();
        }
        self.latencies.push_back(duration_ms);
    }
}

/// Point-in-time projection of the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub requests_total: u64,
    pub errors_total: u64,

    /// Arithmetic mean over the current latency window, 0.0 when empty
    pub average_latency_ms: f64,

    /// Number of latency samples currently retained
    pub sample_count: usize,
}

impl MetricsCollector {
    /// Create a collector retaining the last [`DEFAULT_LATENCY_WINDOW`] latencies
    pub fn new() -> Self {
        Self::with_window(DEFAULT_LATENCY_WINDOW)
    }

    /// Create a collector retaining the last `window` latencies (at least one)
    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            state: Mutex::new(CollectorState {
                latencies: VecDeque::with_capacity(window),
                ..Default::default()
            }),
            window,
        }
    }

    /// Increment total request count
    pub fn increment_requests(&self) {
        self.state.lock().requests_total += 1;
    }

    /// Increment total error count
    pub fn increment_errors(&self) {
        self.state.lock().errors_total += 1;
    }

    /// Record a request latency in milliseconds, evicting the oldest sample
    /// once the window is full
    pub fn record_latency(&self, duration_ms: f64) {
        self.state.lock().push_latency(self.window, duration_ms);
    }

    /// Count one finished request and record its latency under one lock
    fn record_request(&self, duration_ms: f64) {
        let mut state = self.state.lock();
        state.requests_total += 1;
        state.push_latency(self.window, duration_ms);
    }

    /// Capacity of the latency window
    pub fn window(&self) -> usize {
        self.window
    }

    /// Get current metrics summary
    pub fn summary(&self) -> MetricsSummary {
        let state = self.state.lock();
        let sample_count = state.latencies.len();
        let average_latency_ms = if sample_count == 0 {
            0.0
        } else {
            state.latencies.iter().sum::<f64>() / sample_count as f64
        };

        MetricsSummary {
            requests_total: state.requests_total,
            errors_total: state.errors_total,
            average_latency_ms,
            sample_count,
        }
    }

    /// Start timing a request.
    ///
    /// The request is counted and its latency recorded when the returned
    /// timer is dropped, whichever way the request ends.
    pub fn start_timer(self: &Arc<Self>) -> RequestTimer {
        RequestTimer {
            collector: Arc::clone(self),
            start: Instant::now(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop guard performing a request's exit-side bookkeeping
#[derive(Debug)]
pub struct RequestTimer {
    collector: Arc<MetricsCollector>,
    start: Instant,
}

impl RequestTimer {
    /// Count a response as an error when its status is a server error
    pub fn observe_status(&self, status: u16) {
        if status >= 500 {
            self.collector.increment_errors();
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.collector.record_request(duration_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let collector = MetricsCollector::new();
        let summary = collector.summary();

        assert_eq!(summary.requests_total, 0);
        assert_eq!(summary.errors_total, 0);
        assert_eq!(summary.average_latency_ms, 0.0);
        assert_eq!(summary.sample_count, 0);
    }

    #[test]
    fn test_counters() {
        let collector = MetricsCollector::new();
        collector.increment_requests();
        collector.increment_requests();
        collector.increment_errors();

        let summary = collector.summary();
        assert_eq!(summary.requests_total, 2);
        assert_eq!(summary.errors_total, 1);
    }

    #[test]
    fn test_latency_window_keeps_last_samples() {
        let collector = MetricsCollector::new();
        for i in 0..1500 {
            collector.record_latency(i as f64);
        }

        let summary = collector.summary();
        assert_eq!(summary.sample_count, 1000);
        // samples 500..=1499 remain
        assert_eq!(summary.average_latency_ms, 999.5);
    }

    #[test]
    fn test_average_latency() {
        let collector = MetricsCollector::with_window(3);
        collector.record_latency(10.0);
        collector.record_latency(20.0);
        assert_eq!(collector.summary().average_latency_ms, 15.0);

        collector.record_latency(30.0);
        collector.record_latency(40.0);
        let summary = collector.summary();
        assert_eq!(summary.sample_count, 3);
        assert_eq!(summary.average_latency_ms, 30.0);
    }

    #[test]
    fn test_zero_window_is_clamped() {
        let collector = MetricsCollector::with_window(0);
        assert_eq!(collector.window(), 1);
        collector.record_latency(5.0);
        collector.record_latency(7.0);
        assert_eq!(collector.summary().average_latency_ms, 7.0);
    }

    #[test]
    fn test_timer_records_on_drop() {
        let collector = Arc::new(MetricsCollector::new());
        {
            let timer = collector.start_timer();
            timer.observe_status(200);
        }
        {
            let timer = collector.start_timer();
            timer.observe_status(503);
        }

        let summary = collector.summary();
        assert_eq!(summary.requests_total, 2);
        assert_eq!(summary.errors_total, 1);
        assert_eq!(summary.sample_count, 2);
    }

    #[test]
    fn test_timer_records_during_unwind() {
        let collector = Arc::new(MetricsCollector::new());
        let cloned = collector.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let timer = cloned.start_timer();
            timer.observe_status(500);
            panic!("handler blew up");
        }));

        assert!(result.is_err());
        let summary = collector.summary();
        assert_eq!(summary.requests_total, 1);
        assert_eq!(summary.errors_total, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timer_count_matches_samples_under_contention() {
        let collector = Arc::new(MetricsCollector::with_window(10_000));
        let reader = collector.clone();
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let stop_reader = stop.clone();

        let watcher = tokio::task::spawn_blocking(move || {
            while !stop_reader.load(std::sync::atomic::Ordering::Relaxed) {
                let summary = reader.summary();
                assert_eq!(summary.requests_total as usize, summary.sample_count);
            }
        });

        let mut handles = Vec::new();
        for _ in 0..4 {
            let collector = collector.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..500 {
                    drop(collector.start_timer());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        watcher.await.unwrap();

        let summary = collector.summary();
        assert_eq!(summary.requests_total, 2000);
        assert_eq!(summary.sample_count, 2000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let collector = Arc::new(MetricsCollector::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let collector = collector.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..500 {
                    collector.increment_requests();
                    collector.increment_errors();
                    collector.record_latency(1.0);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let summary = collector.summary();
        assert_eq!(summary.requests_total, 4000);
        assert_eq!(summary.errors_total, 4000);
        assert_eq!(summary.sample_count, 1000);
        assert_eq!(summary.average_latency_ms, 1.0);
    }
}
