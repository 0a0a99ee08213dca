//! Live message streams: lenient decoding, self-echo, ending and replacement

use murmur_core::config::ClientConfig;
use murmur_core::engine::{EngineError, EngineOp};
use murmur_core::test_utils::{
    assert_completes_within, assert_stream_ends, collect_stream, encoded_text, undecodable_content, TestGroupBuilder, ALICE,
    BOB, DEFAULT_TEST_TIMEOUT,
};
use murmur_core::ClientError;
use tokio::time::Duration;

#[tokio::test]
async fn test_stream_drops_undecodable_and_keeps_order() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).with_member(BOB).build();
    let mut stream = fixture.group.stream_messages().await?;

    // M = 6 emissions, K = 2 undecodable
    fixture.engine.receive(BOB, encoded_text("one"));
    fixture.engine.receive(BOB, undecodable_content());
    fixture.engine.receive(BOB, encoded_text("two"));
    fixture.engine.receive(BOB, encoded_text("three"));
    fixture.engine.receive(BOB, undecodable_content());
    fixture.engine.receive(BOB, encoded_text("four"));

    let received = collect_stream(&mut stream, 4, DEFAULT_TEST_TIMEOUT).await.unwrap();
    let texts: Vec<_> = received.iter().filter_map(|m| m.text()).collect();
    assert_eq!(texts, vec!["one", "two", "three", "four"]);

    fixture.group.end_stream();
    assert_stream_ends(&mut stream).await;
    Ok(())
}

#[tokio::test]
async fn test_own_sends_are_echoed() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).build();
    let mut stream = fixture.group.stream_messages().await?;

    let id = fixture.group.send("echo", None).await?;

    let received = collect_stream(&mut stream, 1, DEFAULT_TEST_TIMEOUT).await.unwrap();
    assert_eq!(received[0].id, id);
    assert_eq!(received[0].sender_address, ALICE);

    fixture.group.end_stream();
    Ok(())
}

#[tokio::test]
async fn test_end_stream_terminates_without_error() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).build();
    let mut stream = fixture.group.stream_messages().await?;
    assert!(fixture.group.is_streaming());

    fixture.group.end_stream();
    assert!(!fixture.group.is_streaming());
    assert_eq!(fixture.engine.closed_subscriptions(), 1);
    assert_stream_ends(&mut stream).await;

    // Nothing held any more
    fixture.group.end_stream();
    assert_eq!(fixture.engine.closed_subscriptions(), 1);
    Ok(())
}

#[tokio::test]
async fn test_end_stream_without_stream_is_noop() {
    let fixture = TestGroupBuilder::new(ALICE).build();
    fixture.group.end_stream();
    assert!(!fixture.group.is_streaming());
    assert_eq!(fixture.engine.closed_subscriptions(), 0);
}

#[tokio::test]
async fn test_new_stream_closes_previous() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).with_member(BOB).build();
    let mut first = fixture.group.stream_messages().await?;
    let mut second = fixture.group.stream_messages().await?;

    assert_eq!(fixture.engine.closed_subscriptions(), 1);
    assert_eq!(fixture.engine.open_subscriptions(), 1);
    assert_stream_ends(&mut first).await;

    fixture.engine.receive(BOB, encoded_text("only once"));
    let received = collect_stream(&mut second, 1, DEFAULT_TEST_TIMEOUT).await.unwrap();
    assert_eq!(received[0].text(), Some("only once"));

    fixture.group.end_stream();
    assert_stream_ends(&mut second).await;
    Ok(())
}

#[tokio::test]
async fn test_dropped_stream_releases_subscription() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).build();
    let stream = fixture.group.stream_messages().await?;
    assert!(fixture.group.is_streaming());

    drop(stream);
    assert_completes_within(DEFAULT_TEST_TIMEOUT, async {
        while fixture.group.is_streaming() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    assert_eq!(fixture.engine.closed_subscriptions(), 1);
    assert_eq!(fixture.engine.open_subscriptions(), 0);

    // Slot is free again
    let mut again = fixture.group.stream_messages().await?;
    fixture.group.end_stream();
    assert_stream_ends(&mut again).await;
    assert_eq!(fixture.engine.closed_subscriptions(), 2);
    Ok(())
}

#[tokio::test]
async fn test_dropping_replaced_stream_keeps_current() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).with_member(BOB).build();
    let first = fixture.group.stream_messages().await?;
    let mut second = fixture.group.stream_messages().await?;

    drop(first);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(fixture.group.is_streaming());
    assert_eq!(fixture.engine.open_subscriptions(), 1);

    fixture.engine.receive(BOB, encoded_text("still here"));
    let received = collect_stream(&mut second, 1, DEFAULT_TEST_TIMEOUT).await.unwrap();
    assert_eq!(received[0].text(), Some("still here"));

    fixture.group.end_stream();
    Ok(())
}

#[tokio::test]
async fn test_clones_share_stream_slot() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).build();
    let mut stream = fixture.group.stream_messages().await?;

    let handle = fixture.group.clone();
    assert!(handle.is_streaming());
    handle.end_stream();

    assert!(!fixture.group.is_streaming());
    assert_stream_ends(&mut stream).await;
    Ok(())
}

#[tokio::test]
async fn test_decrypted_stream() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).build();
    let mut stream = fixture.group.stream_decrypted_messages().await?;

    fixture.engine.receive(BOB, undecodable_content());
    fixture.engine.receive(BOB, encoded_text("raw"));

    let received = collect_stream(&mut stream, 1, DEFAULT_TEST_TIMEOUT).await.unwrap();
    assert_eq!(received[0].raw, encoded_text("raw"));
    assert_eq!(received[0].sender_address, BOB);

    fixture.group.end_stream();
    assert_stream_ends(&mut stream).await;
    Ok(())
}

#[tokio::test]
async fn test_stream_open_failure_keeps_previous() -> Result<(), ClientError> {
    let fixture = TestGroupBuilder::new(ALICE).build();
    let mut stream = fixture.group.stream_messages().await?;

    fixture.engine.fail(EngineOp::Stream, EngineError::Unavailable("busy".to_string()));
    let result = fixture.group.stream_messages().await;
    assert!(matches!(result, Err(ClientError::Engine(EngineError::Unavailable(_)))));
    assert!(fixture.group.is_streaming());

    fixture.engine.receive(BOB, encoded_text("still here"));
    let received = collect_stream(&mut stream, 1, DEFAULT_TEST_TIMEOUT).await.unwrap();
    assert_eq!(received[0].text(), Some("still here"));

    fixture.group.end_stream();
    Ok(())
}

#[tokio::test]
async fn test_small_buffer_delivers_everything() -> Result<(), ClientError> {
    let mut config = ClientConfig::default();
    config.stream.buffer_capacity = 1;
    let fixture = TestGroupBuilder::new(ALICE).with_config(config).build();
    let mut stream = fixture.group.stream_messages().await?;

    for i in 0..20 {
        fixture.engine.receive(BOB, encoded_text(&format!("m{}", i)));
    }

    let received = collect_stream(&mut stream, 20, DEFAULT_TEST_TIMEOUT).await.unwrap();
    let expected: Vec<String> = (0..20).map(|i| format!("m{}", i)).collect();
    let texts: Vec<String> = received.iter().filter_map(|m| m.text().map(str::to_string)).collect();
    assert_eq!(texts, expected);

    fixture.group.end_stream();
    Ok(())
}

#[tokio::test]
async fn test_stream_as_futures_stream() -> Result<(), ClientError> {
    use futures::StreamExt;

    let fixture = TestGroupBuilder::new(ALICE).build();
    let stream = fixture.group.stream_messages().await?;

    fixture.group.send("a", None).await?;
    fixture.group.send("b", None).await?;

    let texts: Vec<String> = stream
        .take(2)
        .map(|m| m.text().unwrap_or_default().to_string())
        .collect()
        .await;
    assert_eq!(texts, vec!["a", "b"]);

    fixture.group.end_stream();
    Ok(())
}
