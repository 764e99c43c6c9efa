use core_logic::{retry_with_backoff, LinearBackoff, ReconnectBackoff, RetryError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn always_retry(_: &anyhow::Error) -> bool {
    true
}

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = Arc::new(AtomicUsize::new(0));
    let policy = LinearBackoff::new(3, Duration::from_millis(10));

    let result: Result<String, RetryError<anyhow::Error>> = retry_with_backoff(
        policy,
        "test_op",
        |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("success".to_string())
            }
        },
        always_retry,
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_success_after_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let policy = LinearBackoff::new(5, Duration::from_secs(2));

    let start = tokio::time::Instant::now();
    let result: Result<u32, RetryError<anyhow::Error>> = retry_with_backoff(
        policy,
        "test_op",
        |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(anyhow::anyhow!("temporary error"))
                } else {
                    Ok(attempt)
                }
            }
        },
        always_retry,
    )
    .await;

    assert_eq!(result.ok(), Some(3));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    // 2s after the first failure, 4s after the second
    assert!(start.elapsed() >= Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_retry_all_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let policy = LinearBackoff::default();

    let result: Result<(), RetryError<anyhow::Error>> = retry_with_backoff(
        policy,
        "test_op",
        |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("permanent error"))
            }
        },
        always_retry,
    )
    .await;

    let err = result.expect_err("should exhaust");
    assert!(matches!(err, RetryError::Exhausted { attempts: 5, .. }));
    assert_eq!(counter.load(Ordering::SeqCst), 5);
    assert_eq!(err.into_inner().to_string(), "permanent error");
}

#[tokio::test]
async fn test_non_retryable_stops_immediately() {
    let counter = Arc::new(AtomicUsize::new(0));
    let policy = LinearBackoff::new(5, Duration::from_secs(60));

    let result: Result<(), RetryError<anyhow::Error>> = retry_with_backoff(
        policy,
        "test_op",
        |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("unauthorized"))
            }
        },
        |e: &anyhow::Error| !e.to_string().contains("unauthorized"),
    )
    .await;

    let err = result.expect_err("should be fatal");
    assert_eq!(err.attempts(), 1);
    assert!(matches!(err, RetryError::Fatal { .. }));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reconnect_backoff_sequence() {
    let mut backoff = ReconnectBackoff::default();
    let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
    assert_eq!(delays, vec![5, 10, 20, 30, 30, 30]);
}
