//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline, breaker and HTTP handlers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (atomic counters, mirrored to the metrics facade)
//!
//! Consumers:
//!     → stdout log stream
//!     → GET /metrics (JSON view of the counters)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsAggregator, MetricsSnapshot};
