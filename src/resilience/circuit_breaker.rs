//! Circuit breaker for the sentiment-analysis dependency.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: reset_timeout elapsed since the last failure
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails
//! ```
//!
//! # Design Decisions
//! - State tag and failure count are independent atomics
//! - Last failure time is the only field behind a lock
//! - Trial calls are not serialized; concurrent callers may probe together

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use thiserror::Error;

use crate::observability::metrics;

/// Circuit state (0=Closed, 1=Open, 2=Half-Open on the wire).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(val: u8) -> Self {
        match val {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl CircuitState {
    /// Numeric encoding used by the metrics endpoint.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker is open; the operation was not invoked.
    #[error("circuit breaker open")]
    Open,

    /// The operation ran and failed.
    #[error("operation failed: {0}")]
    Operation(E),
}

impl<E> CircuitBreakerError<E> {
    /// True when the call was short-circuited.
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open)
    }
}

/// A consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u64,
    reset_timeout: Duration,
    state: AtomicU8,
    failures: AtomicU64,
    last_failure: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    ///
    /// A threshold of zero is treated as one.
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold: u64::from(failure_threshold.max(1)),
            reset_timeout,
            state: AtomicU8::new(CircuitState::Closed as u8),
            failures: AtomicU64::new(0),
            last_failure: RwLock::new(None),
        }
    }

    /// Current stored state.
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::SeqCst))
    }

    /// Current consecutive-failure count.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn failure_threshold(&self) -> u64 {
        self.failure_threshold
    }

    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// Run `operation` unless the breaker is open.
    ///
    /// Once the reset timeout has elapsed an open breaker lets the call through
    /// as a trial; its outcome decides between Closed and Open.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut observed = self.state();

        if observed == CircuitState::Open {
            if self.reset_timeout_elapsed() {
                self.set_state(CircuitState::HalfOpen);
                observed = CircuitState::HalfOpen;
            } else {
                metrics::record_circuit_rejection();
                return Err(CircuitBreakerError::Open);
            }
        }

        match operation().await {
            Ok(value) => {
                self.on_success(observed);
                Ok(value)
            }
            Err(err) => {
                self.on_failure(observed);
                Err(CircuitBreakerError::Operation(err))
            }
        }
    }

    fn reset_timeout_elapsed(&self) -> bool {
        match *self.last_failure.read() {
            Some(at) => at.elapsed() > self.reset_timeout,
            None => true,
        }
    }

    fn on_success(&self, observed: CircuitState) {
        match observed {
            CircuitState::HalfOpen => {
                self.failures.store(0, Ordering::SeqCst);
                self.set_state(CircuitState::Closed);
            }
            CircuitState::Closed => {
                self.failures.store(0, Ordering::SeqCst);
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, observed: CircuitState) {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_failure.write() = Some(Instant::now());

        if observed == CircuitState::HalfOpen || failures >= self.failure_threshold {
            self.set_state(CircuitState::Open);
        }
    }

    fn set_state(&self, next: CircuitState) {
        let prev = CircuitState::from(self.state.swap(next as u8, Ordering::SeqCst));
        if prev == next {
            return;
        }

        match next {
            CircuitState::Open => tracing::warn!(
                from = %prev,
                failures = self.failures(),
                threshold = self.failure_threshold,
                "Circuit breaker opened"
            ),
            _ => tracing::info!(from = %prev, to = %next, "Circuit breaker state changed"),
        }
        metrics::record_circuit_state(next);
    }
}
