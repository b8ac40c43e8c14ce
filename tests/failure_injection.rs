//! Failure injection tests for the analyzer and the sink.

use std::sync::Arc;
use std::time::Duration;

use chat_analytics::pipeline::Service;
use chat_analytics::resilience::{CircuitState, RetryPolicy};

mod common;
use common::{message, wait_for, RecordingSink, ScriptedAnalyzer};

#[tokio::test]
async fn test_breaker_opens_and_messages_still_written() {
    let analyzer = Arc::new(ScriptedAnalyzer::failing());
    let sink = Arc::new(RecordingSink::default());
    let service = Service::new(1, 10)
        .with_circuit_breaker(3, Duration::from_secs(30))
        .with_analyzer(analyzer.clone())
        .with_sink(sink.clone());
    service.start().unwrap();

    for i in 0..5 {
        service.submit(message("bot-1", &i.to_string())).unwrap();
    }
    assert!(wait_for(Duration::from_secs(5), || sink.len() == 5).await);

    // Only the first three reached the analyzer.
    assert_eq!(analyzer.calls(), 3);
    assert_eq!(service.circuit_breaker().state(), CircuitState::Open);
    assert_eq!(service.metrics().nlp_calls_total(), 5);
    assert_eq!(service.metrics().nlp_errors_total(), 5);
    assert!(sink
        .written()
        .iter()
        .all(|m| m.sentiment.is_unknown() && m.sentiment.score == 0.0));

    service.shutdown().await;
}

#[tokio::test]
async fn test_breaker_recovers_after_reset_timeout() {
    let analyzer = Arc::new(ScriptedAnalyzer::failing());
    let sink = Arc::new(RecordingSink::default());
    let service = Service::new(1, 10)
        .with_circuit_breaker(2, Duration::from_millis(50))
        .with_analyzer(analyzer.clone())
        .with_sink(sink.clone());
    service.start().unwrap();

    service.submit(message("bot-1", "a")).unwrap();
    service.submit(message("bot-1", "b")).unwrap();
    assert!(wait_for(Duration::from_secs(2), || sink.len() == 2).await);
    assert_eq!(service.circuit_breaker().state(), CircuitState::Open);

    analyzer.set_failing(false);
    tokio::time::sleep(Duration::from_millis(80)).await;

    service.submit(message("bot-1", "c")).unwrap();
    assert!(wait_for(Duration::from_secs(2), || sink.len() == 3).await);

    assert_eq!(service.circuit_breaker().state(), CircuitState::Closed);
    assert_eq!(service.circuit_breaker().failures(), 0);
    assert_eq!(sink.written()[2].sentiment.label, "positive");

    service.shutdown().await;
}

#[tokio::test]
async fn test_failed_trial_reopens_breaker() {
    let analyzer = Arc::new(ScriptedAnalyzer::failing());
    let sink = Arc::new(RecordingSink::default());
    let service = Service::new(1, 10)
        .with_circuit_breaker(1, Duration::from_millis(50))
        .with_analyzer(analyzer.clone())
        .with_sink(sink.clone());
    service.start().unwrap();

    service.submit(message("bot-1", "a")).unwrap();
    assert!(wait_for(Duration::from_secs(2), || sink.len() == 1).await);
    tokio::time::sleep(Duration::from_millis(80)).await;

    service.submit(message("bot-1", "b")).unwrap();
    assert!(wait_for(Duration::from_secs(2), || sink.len() == 2).await);

    assert_eq!(analyzer.calls(), 2);
    assert_eq!(service.circuit_breaker().state(), CircuitState::Open);

    service.shutdown().await;
}

#[tokio::test]
async fn test_sink_failures_counted_after_retries() {
    let sink = Arc::new(RecordingSink::failing());
    let service = Service::new(2, 10)
        .with_analyzer(Arc::new(ScriptedAnalyzer::default()))
        .with_sink(sink.clone())
        .with_retry_policy(RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(5),
        ));
    service.start().unwrap();

    service.submit(message("bot-1", "a")).unwrap();
    service.submit(message("bot-2", "b")).unwrap();

    let metrics = service.metrics().clone();
    assert!(wait_for(Duration::from_secs(5), || metrics.write_errors_total() == 2).await);

    assert_eq!(sink.attempts.load(std::sync::atomic::Ordering::SeqCst), 6);
    assert_eq!(metrics.writes_total(), 0);
    assert_eq!(metrics.nlp_calls_total(), 2);

    service.shutdown().await;
}
