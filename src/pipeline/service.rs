//! The ingestion service: queue, worker pool, breaker and metrics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::lifecycle::Shutdown;
use crate::observability::MetricsAggregator;
use crate::pipeline::enrichment::{MessageSink, SentimentAnalyzer, SimulatedAnalyzer, SimulatedSink};
use crate::pipeline::error::PipelineError;
use crate::pipeline::message::Message;
use crate::pipeline::queue::{MessageQueue, PushError};
use crate::pipeline::worker::Worker;
use crate::resilience::{CircuitBreaker, RetryPolicy};

/// Default consecutive failures before the breaker opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 50;
/// Default cooldown before a trial call.
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded queue drained by a fixed pool of workers.
///
/// Configure with the `with_*` methods, then share behind an `Arc` and call
/// [`Service::start`].
pub struct Service {
    queue: MessageQueue,
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<MetricsAggregator>,
    analyzer: Arc<dyn SentimentAnalyzer>,
    sink: Arc<dyn MessageSink>,
    retry: RetryPolicy,
    worker_count: usize,
    shutdown: Shutdown,
    started: AtomicBool,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    /// Serializes `shutdown` so a second caller waits for the first.
    shutdown_gate: tokio::sync::Mutex<()>,
}

impl Service {
    /// Create a service with the default breaker and simulated collaborators.
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        Self {
            queue: MessageQueue::bounded(queue_capacity),
            breaker: Arc::new(CircuitBreaker::new(
                DEFAULT_FAILURE_THRESHOLD,
                DEFAULT_RESET_TIMEOUT,
            )),
            metrics: Arc::new(MetricsAggregator::new()),
            analyzer: Arc::new(SimulatedAnalyzer::default()),
            sink: Arc::new(SimulatedSink::default()),
            retry: RetryPolicy::default(),
            worker_count,
            shutdown: Shutdown::new(),
            started: AtomicBool::new(false),
            workers: parking_lot::Mutex::new(Vec::new()),
            shutdown_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Build a service from validated configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.pipeline.worker_count, config.pipeline.queue_capacity)
            .with_circuit_breaker(
                config.circuit_breaker.failure_threshold,
                config.circuit_breaker.reset_timeout(),
            )
            .with_analyzer(Arc::new(SimulatedAnalyzer::from_config(&config.analyzer)))
            .with_sink(Arc::new(SimulatedSink::from_config(&config.sink)))
            .with_retry_policy(RetryPolicy::from_config(&config.sink))
    }

    pub fn with_circuit_breaker(mut self, failure_threshold: u32, reset_timeout: Duration) -> Self {
        self.breaker = Arc::new(CircuitBreaker::new(failure_threshold, reset_timeout));
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn SentimentAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Spawn the worker pool. Must be called from within a Tokio runtime.
    ///
    /// A second call is a no-op; a call after shutdown is refused.
    pub fn start(&self) -> Result<(), PipelineError> {
        if self.shutdown.is_triggered() {
            return Err(PipelineError::ShuttingDown);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("Worker pool already started");
            return Ok(());
        }

        let mut handles = self.workers.lock();
        for id in 0..self.worker_count {
            let worker = Worker {
                id,
                queue: self.queue.receiver(),
                breaker: self.breaker.clone(),
                metrics: self.metrics.clone(),
                analyzer: self.analyzer.clone(),
                sink: self.sink.clone(),
                retry: self.retry,
            };
            // Subscribe before spawning so an early trigger is not missed.
            let shutdown = self.shutdown.subscribe();
            handles.push(tokio::spawn(worker.run(shutdown)));
        }

        tracing::info!(
            workers = self.worker_count,
            queue_capacity = self.queue.capacity(),
            "Started workers"
        );
        Ok(())
    }

    /// Offer a message to the queue without waiting.
    pub fn submit(&self, message: Message) -> Result<(), PipelineError> {
        let start = Instant::now();

        if self.shutdown.is_triggered() {
            self.metrics.record_error();
            return Err(PipelineError::ShuttingDown);
        }

        match self.queue.try_push(message) {
            Ok(()) => {
                self.metrics.record_enqueued();
                self.metrics.record_request(start.elapsed());
                Ok(())
            }
            Err(PushError::Full(message)) => {
                self.metrics.record_error();
                tracing::debug!(
                    bot_id = message.bot_id(),
                    capacity = self.queue.capacity(),
                    "Queue full, rejecting message"
                );
                Err(PipelineError::QueueFull)
            }
            Err(PushError::Closed(_)) => {
                self.metrics.record_error();
                Err(PipelineError::ShuttingDown)
            }
        }
    }

    /// Stop the pool: cancel workers, wait for in-flight messages, close the queue.
    ///
    /// Messages still queued are discarded. Later calls wait for the first
    /// one to finish and then return.
    pub async fn shutdown(&self) {
        let _gate = self.shutdown_gate.lock().await;

        if self.shutdown.trigger() {
            tracing::info!("Shutting down worker pool");
        }

        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task failed");
            }
        }

        let discarded = self.queue.close().await;
        if discarded > 0 {
            tracing::warn!(discarded, "Discarded queued messages during shutdown");
            self.metrics.record_discarded(discarded as u64);
        }

        tracing::info!("Shutdown complete");
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Messages currently buffered in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue.capacity())
            .field("breaker_state", &self.breaker.state())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(bot: &str) -> Message {
        Message::new(bot, "hello", None).unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let service = Service::new(4, 8);
        assert_eq!(service.worker_count(), 4);
        assert_eq!(service.queue_capacity(), 8);
        assert_eq!(service.circuit_breaker().failure_threshold(), 50);
        assert_eq!(service.circuit_breaker().reset_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_queue_full_without_workers() {
        let service = Service::new(0, 1);
        service.start().unwrap();

        assert_eq!(service.submit(message("bot-a")), Ok(()));
        assert_eq!(service.submit(message("bot-b")), Err(PipelineError::QueueFull));

        assert_eq!(service.metrics().queue_depth(), 1);
        assert_eq!(service.metrics().requests_total(), 1);
        assert_eq!(service.metrics().errors_total(), 1);
    }

    #[tokio::test]
    async fn test_start_after_shutdown_refused() {
        let service = Service::new(1, 1);
        service.shutdown().await;
        assert_eq!(service.start(), Err(PipelineError::ShuttingDown));
        assert_eq!(service.submit(message("late")), Err(PipelineError::ShuttingDown));
        assert_eq!(service.metrics().errors_total(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_discards_queued_messages() {
        let service = Service::new(0, 4);
        service.submit(message("a")).unwrap();
        service.submit(message("b")).unwrap();
        assert_eq!(service.queue_len(), 2);
        assert_eq!(service.metrics().queue_depth(), 2);

        service.shutdown().await;
        assert_eq!(service.metrics().queue_depth(), 0);
        assert_eq!(service.submit(message("c")), Err(PipelineError::ShuttingDown));
    }
}
