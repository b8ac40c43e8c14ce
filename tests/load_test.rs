//! Load testing for the ingestion pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chat_analytics::pipeline::{PipelineError, Service};

mod common;
use common::{message, wait_for, RecordingSink, ScriptedAnalyzer};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_keep_counters_consistent() {
    let sink = Arc::new(RecordingSink::default());
    let service = Arc::new(
        Service::new(8, 100)
            .with_analyzer(Arc::new(ScriptedAnalyzer::with_delay(Duration::from_millis(1))))
            .with_sink(sink.clone()),
    );
    service.start().unwrap();

    let concurrency = 20;
    let messages_per_task = 50;
    let total = concurrency * messages_per_task;
    let start = Instant::now();

    let mut tasks = Vec::new();
    for t in 0..concurrency {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            let (mut accepted, mut rejected) = (0u64, 0u64);
            for i in 0..messages_per_task {
                match service.submit(message(&format!("bot-{t}"), &i.to_string())) {
                    Ok(()) => accepted += 1,
                    Err(PipelineError::QueueFull) => rejected += 1,
                    Err(e) => panic!("unexpected error: {e}"),
                }
                tokio::task::yield_now().await;
            }
            (accepted, rejected)
        }));
    }

    let (mut accepted, mut rejected) = (0u64, 0u64);
    for task in tasks {
        let (a, r) = task.await.unwrap();
        accepted += a;
        rejected += r;
    }

    assert_eq!(accepted + rejected, total as u64);
    assert!(accepted > 0);

    let metrics = service.metrics().clone();
    assert_eq!(metrics.requests_total(), accepted);
    assert_eq!(metrics.errors_total(), rejected);

    assert!(wait_for(Duration::from_secs(10), || metrics.writes_total() == accepted).await);
    assert_eq!(sink.len() as u64, accepted);
    assert_eq!(metrics.nlp_calls_total(), accepted);

    service.shutdown().await;
    assert_eq!(metrics.queue_depth(), 0);
    assert_eq!(metrics.active_workers(), 0);

    println!("\n--- Load Test Results ---");
    println!("Submitted:      {}", total);
    println!("Accepted:       {}", accepted);
    println!("Rejected:       {}", rejected);
    println!("Total Duration: {:?}", start.elapsed());
    println!("Avg submit ms:  {}", metrics.average_latency_ms());
    println!("-------------------------\n");
}
