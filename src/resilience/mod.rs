//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Enrichment call:
//!     → circuit_breaker.rs (fail fast while the analyzer is down)
//!
//! Write call:
//!     → backoff.rs (retry failed writes with jittered exponential delay)
//! ```
//!
//! # Design Decisions
//! - One breaker per service, shared by every worker
//! - Breaker rejections are not retried; the worker falls back instead
//! - Write retries are bounded; exhausted writes are dropped

pub mod backoff;
pub mod circuit_breaker;

pub use backoff::RetryPolicy;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
