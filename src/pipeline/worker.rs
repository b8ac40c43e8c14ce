//! Worker loop and the per-message processing cycle.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::observability::MetricsAggregator;
use crate::pipeline::enrichment::{MessageSink, SentimentAnalyzer};
use crate::pipeline::message::{EnrichedMessage, Message, Sentiment};
use crate::pipeline::queue::QueueReceiver;
use crate::resilience::{CircuitBreaker, RetryPolicy};

/// One long-lived consumer of the shared queue.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) queue: QueueReceiver,
    pub(crate) breaker: Arc<CircuitBreaker>,
    pub(crate) metrics: Arc<MetricsAggregator>,
    pub(crate) analyzer: Arc<dyn SentimentAnalyzer>,
    pub(crate) sink: Arc<dyn MessageSink>,
    pub(crate) retry: RetryPolicy,
}

impl Worker {
    /// Drain the queue until shutdown fires or the queue closes.
    ///
    /// Cancellation is only observed between messages; a message that has
    /// been dequeued is always processed to completion.
    pub(crate) async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(worker = self.id, "Worker started");

        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                message = self.queue.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            self.metrics.worker_started_message();
            self.metrics.record_dequeued();

            self.process(message).await;

            self.metrics.worker_finished_message();
        }

        tracing::debug!(worker = self.id, "Worker stopped");
    }

    /// Enrich one message, then write it.
    pub(crate) async fn process(&self, message: Message) {
        let mut enriched = EnrichedMessage::new(message);

        let analyzer = &self.analyzer;
        let source = &enriched.message;
        let outcome = self.breaker.call(|| analyzer.analyze(source)).await;

        match outcome {
            Ok(sentiment) => {
                self.metrics.record_nlp_call(true);
                enriched.sentiment = sentiment;
            }
            Err(e) => {
                if e.is_open() {
                    tracing::debug!(worker = self.id, "Circuit open, skipping sentiment analysis");
                } else {
                    tracing::warn!(
                        worker = self.id,
                        bot_id = enriched.message.bot_id(),
                        error = %e,
                        "Sentiment analysis failed"
                    );
                }
                self.metrics.record_nlp_call(false);
                enriched.sentiment = Sentiment::unknown();
            }
        }

        self.write(&enriched).await;
    }

    async fn write(&self, enriched: &EnrichedMessage) {
        let mut attempt = 1;
        loop {
            match self.sink.write(enriched).await {
                Ok(()) => {
                    self.metrics.record_write();
                    return;
                }
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::debug!(
                        worker = self.id,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Retrying write"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.metrics.record_write_error();
                    tracing::error!(
                        worker = self.id,
                        bot_id = enriched.message.bot_id(),
                        attempts = attempt,
                        error = %e,
                        "Write failed, dropping message"
                    );
                    return;
                }
            }
        }
    }
}
