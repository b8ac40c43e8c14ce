//! Pipeline error types.

use thiserror::Error;

/// Errors surfaced to producers submitting messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A required field was missing or the payload could not be decoded.
    #[error("invalid message: {0}")]
    Validation(String),

    /// The queue is at capacity; the message was dropped.
    #[error("queue full")]
    QueueFull,

    /// Shutdown has begun; no new work is accepted.
    #[error("service is shutting down")]
    ShuttingDown,
}
