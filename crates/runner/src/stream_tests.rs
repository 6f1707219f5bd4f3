use super::*;
use ar_core::ResumeToken;

fn sample_event() -> UnifiedEvent {
    UnifiedEvent::Completed {
        engine: "codex".to_string(),
        ok: true,
        answer: "done".to_string(),
        resume: Some(ResumeToken::new("codex", "t1")),
        error: None,
        usage: None,
    }
}

#[tokio::test]
async fn terminates_exactly_once() {
    let (tx, rx) = EventStream::new_pair();
    tx.finish(None).await;
    tx.finish_fatal("ignored_second_terminal", None).await;

    let item = rx.next().await.unwrap();
    assert!(matches!(item, StreamItem::AgentEnd { .. }));
    // no second terminal item was queued behind it
    assert!(rx.next().await.is_none());
}

#[tokio::test]
async fn pushes_after_terminal_are_dropped() {
    let (tx, rx) = EventStream::new_pair();
    tx.finish_fatal("session_locked", None).await;
    tx.push(sample_event()).await;

    let item = rx.next().await.unwrap();
    assert!(matches!(item, StreamItem::Error { .. }));
    assert!(rx.next().await.is_none());
}

#[tokio::test]
async fn cancel_is_not_terminal_and_is_followed_by_completion() {
    let (tx, rx) = EventStream::new_pair();
    tx.note_canceled("user").await;
    tx.push(sample_event()).await;
    tx.finish(None).await;

    let mut items = Vec::new();
    while let Some(item) = rx.next().await {
        items.push(item);
    }
    assert_eq!(items.len(), 3);
    assert!(matches!(items[0], StreamItem::Canceled { .. }));
    assert!(matches!(items[1], StreamItem::CliEvent(_)));
    assert!(matches!(items[2], StreamItem::AgentEnd { .. }));
}

#[tokio::test]
async fn preserves_fifo_order() {
    let (tx, rx) = EventStream::new_pair();
    tx.push(sample_event()).await;
    tx.push(sample_event()).await;
    tx.finish(None).await;

    let mut items = Vec::new();
    while let Some(item) = rx.next().await {
        items.push(item);
    }
    assert_eq!(items.len(), 3);
    assert!(matches!(items[0], StreamItem::CliEvent(_)));
    assert!(matches!(items[1], StreamItem::CliEvent(_)));
    assert!(matches!(items[2], StreamItem::AgentEnd { .. }));
}

#[tokio::test]
async fn next_timeout_elapses_without_terminating_other_consumers() {
    let (_tx, rx) = EventStream::new_pair();
    let other = rx.clone();

    let err = rx
        .next_timeout(std::time::Duration::from_millis(20))
        .await
        .unwrap_err();
    assert_eq!(err, RecvTimeoutError::Elapsed);

    // the stream is still open for the other handle
    drop(other);
}

#[tokio::test]
async fn fatal_terminator_wakes_blocked_consumer() {
    let (tx, rx) = EventStream::new_pair();
    tx.finish_fatal("runner_crashed: producer panicked", Some("partial answer".to_string()))
        .await;

    let item = rx.next().await.unwrap();
    match item {
        StreamItem::Error { reason, partial } => {
            assert!(reason.contains("runner_crashed"));
            assert_eq!(partial.as_deref(), Some("partial answer"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn try_push_emits_backpressure_error_when_full() {
    let (tx, tx_internal_cap) = EventStream::new_pair();
    // Fill the bounded channel beyond capacity using try_push, without a consumer draining.
    let mut dropped_at = None;
    for i in 0..10_000 {
        if tx.try_push(sample_event()).is_err() {
            dropped_at = Some(i);
            break;
        }
    }
    assert!(dropped_at.is_some(), "expected a backpressure drop eventually");
    drop(tx_internal_cap);
}
