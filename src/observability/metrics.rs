//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Keep the pipeline's lock-free counters ([`MetricsAggregator`])
//! - Mirror every update to the `metrics` facade
//! - Expose a Prometheus scrape endpoint when enabled
//!
//! # Metrics
//! - `chat_requests_total` (counter): accepted submissions
//! - `chat_errors_total` (counter): rejected or invalid submissions
//! - `chat_nlp_calls_total` / `chat_nlp_errors_total` (counter): enrichment step
//! - `chat_writes_total` / `chat_write_errors_total` (counter): write step
//! - `chat_queue_depth`, `chat_active_workers` (gauge)
//! - `chat_request_latency_seconds` (histogram): submit latency
//! - `chat_circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//!
//! # Design Decisions
//! - Counters are independent atomics; cross-counter reads are not a snapshot
//! - Relaxed ordering everywhere; values may be slightly stale when read

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;

use crate::resilience::CircuitState;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_circuit_state(state: CircuitState) {
    gauge!("chat_circuit_breaker_state").set(f64::from(state.as_u8()));
}

pub fn record_circuit_rejection() {
    counter!("chat_circuit_breaker_rejections_total").increment(1);
}

/// Pipeline counters.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    requests_total: AtomicU64,
    errors_total: AtomicU64,
    nlp_calls_total: AtomicU64,
    nlp_errors_total: AtomicU64,
    writes_total: AtomicU64,
    write_errors_total: AtomicU64,
    queue_depth: AtomicI64,
    active_workers: AtomicI64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

/// Point-in-time view of every counter.
///
/// Each field is read independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub errors_total: u64,
    pub nlp_calls_total: u64,
    pub nlp_errors_total: u64,
    pub writes_total: u64,
    pub write_errors_total: u64,
    pub queue_depth: i64,
    pub active_workers: i64,
    pub latency_sum_ms: u64,
    pub latency_count: u64,
    pub average_latency_ms: u64,
}

impl MetricsAggregator {
    pub const fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            nlp_calls_total: AtomicU64::new(0),
            nlp_errors_total: AtomicU64::new(0),
            writes_total: AtomicU64::new(0),
            write_errors_total: AtomicU64::new(0),
            queue_depth: AtomicI64::new(0),
            active_workers: AtomicI64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }

    /// Record an accepted submission and its latency.
    pub fn record_request(&self, latency: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);

        counter!("chat_requests_total").increment(1);
        histogram!("chat_request_latency_seconds").record(latency.as_secs_f64());
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
        counter!("chat_errors_total").increment(1);
    }

    pub fn record_nlp_call(&self, success: bool) {
        self.nlp_calls_total.fetch_add(1, Ordering::Relaxed);
        counter!("chat_nlp_calls_total").increment(1);
        if !success {
            self.nlp_errors_total.fetch_add(1, Ordering::Relaxed);
            counter!("chat_nlp_errors_total").increment(1);
        }
    }

    pub fn record_write(&self) {
        self.writes_total.fetch_add(1, Ordering::Relaxed);
        counter!("chat_writes_total").increment(1);
    }

    pub fn record_write_error(&self) {
        self.write_errors_total.fetch_add(1, Ordering::Relaxed);
        counter!("chat_write_errors_total").increment(1);
    }

    /// A message entered the queue.
    pub fn record_enqueued(&self) {
        let depth = self.queue_depth.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!("chat_queue_depth").set(depth as f64);
    }

    /// A worker took a message off the queue.
    pub fn record_dequeued(&self) {
        let depth = self.queue_depth.fetch_sub(1, Ordering::Relaxed) - 1;
        gauge!("chat_queue_depth").set(depth as f64);
    }

    /// Queued messages dropped when the queue was closed.
    pub fn record_discarded(&self, count: u64) {
        let depth = self.queue_depth.fetch_sub(count as i64, Ordering::Relaxed) - count as i64;
        gauge!("chat_queue_depth").set(depth as f64);
        counter!("chat_discarded_total").increment(count);
    }

    pub fn worker_started_message(&self) {
        let active = self.active_workers.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!("chat_active_workers").set(active as f64);
    }

    pub fn worker_finished_message(&self) {
        let active = self.active_workers.fetch_sub(1, Ordering::Relaxed) - 1;
        gauge!("chat_active_workers").set(active as f64);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn errors_total(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    pub fn nlp_calls_total(&self) -> u64 {
        self.nlp_calls_total.load(Ordering::Relaxed)
    }

    pub fn nlp_errors_total(&self) -> u64 {
        self.nlp_errors_total.load(Ordering::Relaxed)
    }

    pub fn writes_total(&self) -> u64 {
        self.writes_total.load(Ordering::Relaxed)
    }

    pub fn write_errors_total(&self) -> u64 {
        self.write_errors_total.load(Ordering::Relaxed)
    }

    pub fn queue_depth(&self) -> i64 {
        self.queue_depth.load(Ordering::Relaxed)
    }

    pub fn active_workers(&self) -> i64 {
        self.active_workers.load(Ordering::Relaxed)
    }

    /// Mean submit latency in whole milliseconds, 0 without samples.
    pub fn average_latency_ms(&self) -> u64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0;
        }
        self.latency_sum_ms.load(Ordering::Relaxed) / count
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total(),
            errors_total: self.errors_total(),
            nlp_calls_total: self.nlp_calls_total(),
            nlp_errors_total: self.nlp_errors_total(),
            writes_total: self.writes_total(),
            write_errors_total: self.write_errors_total(),
            queue_depth: self.queue_depth(),
            active_workers: self.active_workers(),
            latency_sum_ms: self.latency_sum_ms.load(Ordering::Relaxed),
            latency_count: self.latency_count.load(Ordering::Relaxed),
            average_latency_ms: self.average_latency_ms(),
        }
    }
}
