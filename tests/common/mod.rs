//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chat_analytics::config::AppConfig;
use chat_analytics::http::HttpServer;
use chat_analytics::lifecycle::Shutdown;
use chat_analytics::pipeline::{
    AnalyzerError, EnrichedMessage, Message, MessageSink, Sentiment, SentimentAnalyzer, Service,
    SinkError,
};
use parking_lot::Mutex;

/// Analyzer with programmable latency and a failure switch.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    pub delay: Duration,
    pub failing: AtomicBool,
    pub calls: AtomicU32,
}

impl ScriptedAnalyzer {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, _message: &Message) -> Result<Sentiment, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AnalyzerError::Api("injected failure".to_string()));
        }
        Ok(Sentiment::new("positive", 0.85))
    }
}

/// Sink that keeps everything written to it.
#[derive(Default)]
pub struct RecordingSink {
    pub failing: AtomicBool,
    pub attempts: AtomicU32,
    written: Mutex<Vec<EnrichedMessage>>,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<EnrichedMessage> {
        self.written.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.written.lock().len()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn write(&self, message: &EnrichedMessage) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Write("injected failure".to_string()));
        }
        self.written.lock().push(message.clone());
        Ok(())
    }
}

pub fn message(bot_id: &str, content: &str) -> Message {
    Message::new(bot_id, content, None).unwrap()
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Serve `service` on an ephemeral port until `shutdown` is triggered.
pub async fn start_server(config: &AppConfig, service: Arc<Service>, shutdown: &Shutdown) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, service);
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server
            .run(listener, async move {
                let _ = stop.recv().await;
            })
            .await;
    });

    addr
}
