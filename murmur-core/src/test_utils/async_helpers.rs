//! Async test helpers

use std::future::Future;
use tokio::time::{timeout, Duration};

use crate::consent::MemoryConsentBackend;
use crate::group::MessageStream;

/// Default timeout duration for tests (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Short timeout for checks that expect nothing to happen (100ms)
pub const SHORT_TEST_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutError {
    Elapsed,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimeoutError {}

/// Run a future with a timeout, returning Ok(result) or Err on timeout
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    timeout(duration, future).await.map_err(|_| TimeoutError::Elapsed)
}

/// Helper to assert a future completes within duration
pub async fn assert_completes_within<F, T>(duration: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => panic!("Future did not complete within {:?}", duration),
    }
}

/// Collect `count` items from a message stream, waiting at most `per_item` for each
pub async fn collect_stream<T>(
    stream: &mut MessageStream<T>,
    count: usize,
    per_item: Duration,
) -> Result<Vec<T>, TimeoutError> {
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        match with_timeout(per_item, stream.next()).await? {
            Some(item) => items.push(item),
            None => break,
        }
    }
    Ok(items)
}

/// Assert that the stream yields nothing more and ends
pub async fn assert_stream_ends<T: std::fmt::Debug>(stream: &mut MessageStream<T>) {
    match timeout(DEFAULT_TEST_TIMEOUT, stream.next()).await {
        Ok(None) => (),
        Ok(Some(item)) => panic!("Expected stream to end, got {:?}", item),
        Err(_) => panic!("Stream did not end within {:?}", DEFAULT_TEST_TIMEOUT),
    }
}

/// Run `future` and assert it never queried the consent backend
pub async fn assert_no_backend_query<F, T>(backend: &MemoryConsentBackend, future: F) -> T
where
    F: Future<Output = T>,
{
    let before = backend.query_count();
    let result = future.await;
    let after = backend.query_count();
    assert_eq!(before, after, "expected no consent backend queries, saw {}", after - before);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(Duration::from_secs(1), async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_with_timeout_elapsed() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .await;
        assert_eq!(result, Err(TimeoutError::Elapsed));
    }
}
