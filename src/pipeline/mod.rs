//! Ingestion pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Producer (HTTP ingest handler)
//!     → service.rs submit() (non-blocking; full → QueueFull)
//!     → queue.rs (bounded FIFO)
//!     → worker.rs (N workers, one message at a time)
//!         → enrichment.rs SentimentAnalyzer, through the circuit breaker
//!           (failure or open circuit → "unknown", score 0)
//!         → enrichment.rs MessageSink, retried with backoff
//!     → metrics updated at every stage
//! ```
//!
//! # Design Decisions
//! - Backpressure is rejection; producers never wait
//! - No ordering across workers; each worker handles its messages in dequeue order
//! - Shutdown: cancel → join workers → close queue; queued leftovers are dropped

pub mod enrichment;
pub mod error;
pub mod message;
pub mod queue;
pub mod service;
mod worker;

pub use enrichment::{
    AnalyzerError, MessageSink, SentimentAnalyzer, SimulatedAnalyzer, SimulatedSink, SinkError,
};
pub use error::PipelineError;
pub use message::{EnrichedMessage, Message, Sentiment};
pub use queue::MessageQueue;
pub use service::Service;
