//! Downstream collaborators: sentiment analysis and message storage.
//!
//! The pipeline only depends on the traits. The simulated implementations
//! stand in for the real NLP service and database with configurable latency
//! and random failure injection.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

use crate::config::{AnalyzerConfig, SinkConfig};
use crate::pipeline::message::{EnrichedMessage, Message, Sentiment};

#[derive(Debug, Clone, Error)]
pub enum AnalyzerError {
    #[error("nlp api error: {0}")]
    Api(String),
}

#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Write(String),
}

/// Enrichment step. Called through the circuit breaker.
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, message: &Message) -> Result<Sentiment, AnalyzerError>;
}

/// Write step for enriched messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn write(&self, message: &EnrichedMessage) -> Result<(), SinkError>;
}

/// Clamp a probability to [0, 1]; NaN and infinities become 0.
fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Analyzer with jittered latency and a random failure rate.
#[derive(Debug, Clone)]
pub struct SimulatedAnalyzer {
    base_latency: Duration,
    jitter: Duration,
    failure_rate: f64,
}

impl SimulatedAnalyzer {
    pub fn new(base_latency: Duration, jitter: Duration, failure_rate: f64) -> Self {
        Self {
            base_latency,
            jitter,
            failure_rate: sanitize_rate(failure_rate),
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_latency_ms),
            Duration::from_millis(config.jitter_ms),
            config.failure_rate,
        )
    }
}

impl Default for SimulatedAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}

#[async_trait]
impl SentimentAnalyzer for SimulatedAnalyzer {
    async fn analyze(&self, _message: &Message) -> Result<Sentiment, AnalyzerError> {
        // ThreadRng is !Send; draw everything before the first await.
        let (delay, fail) = {
            let mut rng = rand::thread_rng();
            let jitter_ms = self.jitter.as_millis() as u64;
            let extra = if jitter_ms > 0 { rng.gen_range(0..jitter_ms) } else { 0 };
            (
                self.base_latency + Duration::from_millis(extra),
                rng.gen_bool(self.failure_rate),
            )
        };

        tokio::time::sleep(delay).await;

        if fail {
            return Err(AnalyzerError::Api("injected failure".to_string()));
        }
        Ok(Sentiment::new("positive", 0.85))
    }
}

/// Sink with fixed latency and a random failure rate.
#[derive(Debug, Clone)]
pub struct SimulatedSink {
    latency: Duration,
    failure_rate: f64,
}

impl SimulatedSink {
    pub fn new(latency: Duration, failure_rate: f64) -> Self {
        Self {
            latency,
            failure_rate: sanitize_rate(failure_rate),
        }
    }

    pub fn from_config(config: &SinkConfig) -> Self {
        Self::new(Duration::from_millis(config.latency_ms), config.failure_rate)
    }
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::from_config(&SinkConfig::default())
    }
}

#[async_trait]
impl MessageSink for SimulatedSink {
    async fn write(&self, message: &EnrichedMessage) -> Result<(), SinkError> {
        let fail = rand::thread_rng().gen_bool(self.failure_rate);
        tokio::time::sleep(self.latency).await;

        if fail {
            return Err(SinkError::Write("injected failure".to_string()));
        }

        tracing::trace!(
            bot_id = message.message.bot_id(),
            sentiment = %message.sentiment.label,
            "Message stored"
        );
        Ok(())
    }
}
