#![allow(clippy::unwrap_used)]
// Reconnect policy of the event stream loop, on a paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use flagwire_core::{EvaluationContext, ProviderEventKind, RawFlagValue, StreamPhase};

use common::{FakeService, Session, config, next_event, ready, resolver_with};

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

// ── Backoff ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_after_each_failure() {
    let service = Arc::new(FakeService::new());
    for _ in 0..3 {
        service.push_session(Session::Refuse);
    }
    let _feed = service.push_live();
    let (resolver, mut events) = resolver_with(config(5), Arc::clone(&service));
    let mut phase = resolver.stream_phase();

    resolver.init().await;
    phase
        .wait_for(|p| *p == StreamPhase::Streaming)
        .await
        .unwrap();

    assert_eq!(service.open_count(), 4);
    assert_eq!(service.open_gaps(), vec![secs(1), secs(2), secs(4)]);
    for _ in 0..3 {
        assert_eq!(next_event(&mut events).await.kind, ProviderEventKind::Error);
    }
    assert_ne!(*phase.borrow(), StreamPhase::Stopped);

    resolver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_backing_off_phase_reports_attempt_and_delay() {
    let service = Arc::new(FakeService::new());
    let (resolver, _events) = resolver_with(config(5), Arc::clone(&service));
    let mut phase = resolver.stream_phase();

    resolver.init().await;
    let observed = *phase
        .wait_for(|p| matches!(p, StreamPhase::BackingOff { attempt: 2, .. }))
        .await
        .unwrap();
    assert_eq!(
        observed,
        StreamPhase::BackingOff {
            attempt: 2,
            delay: secs(2)
        }
    );

    resolver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stops_permanently_after_retry_ceiling() {
    let service = Arc::new(FakeService::new());
    let (resolver, mut events) = resolver_with(config(5), Arc::clone(&service));
    let mut phase = resolver.stream_phase();

    resolver.init().await;
    tokio::time::timeout(secs(3600), phase.wait_for(|p| *p == StreamPhase::Stopped))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(service.open_count(), 6);
    assert_eq!(
        service.open_gaps(),
        vec![secs(1), secs(2), secs(4), secs(8), secs(16)]
    );

    // Nothing else happens, however long we wait.
    tokio::time::sleep(secs(24 * 3600)).await;
    assert_eq!(service.open_count(), 6);

    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.kind, ProviderEventKind::Error);
        errors.push(event);
    }
    assert_eq!(errors.len(), 6);
    assert!(
        errors
            .last()
            .and_then(|e| e.message.as_deref())
            .is_some_and(|m| m.contains("giving up"))
    );

    // Degraded, not dead: resolution still goes to the service.
    service.answer("beta", RawFlagValue::Bool(true), "on", "STATIC");
    assert!(
        resolver
            .resolve_boolean("beta", &EvaluationContext::new())
            .await
            .unwrap()
            .value
    );
    resolver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_ready_resets_backoff() {
    let service = Arc::new(FakeService::new());
    service.push_session(Session::Refuse);
    service.push_session(Session::Refuse);
    let feed = service.push_live();
    let _next = service.push_live();
    let (resolver, mut events) = resolver_with(config(5), Arc::clone(&service));
    let mut phase = resolver.stream_phase();

    resolver.init().await;
    feed.send(Ok(ready())).unwrap();

    // Two refusals, then ready on the third connection.
    for _ in 0..2 {
        assert_eq!(next_event(&mut events).await.kind, ProviderEventKind::Error);
    }
    assert_eq!(next_event(&mut events).await.kind, ProviderEventKind::Ready);

    // Drop the live stream: the next delay starts from the base again.
    drop(feed);
    assert_eq!(next_event(&mut events).await.kind, ProviderEventKind::Error);
    phase
        .wait_for(|p| *p == StreamPhase::Streaming)
        .await
        .unwrap();

    assert_eq!(service.open_count(), 4);
    assert_eq!(service.open_gaps(), vec![secs(1), secs(2), secs(1)]);

    resolver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_server_closing_stream_counts_as_failure() {
    let service = Arc::new(FakeService::new());
    service.push_session(Session::Finite(vec![ready()]));
    let _feed = service.push_live();
    let (resolver, mut events) = resolver_with(config(0), Arc::clone(&service));

    resolver.init().await;
    assert_eq!(next_event(&mut events).await.kind, ProviderEventKind::Ready);

    // With no retries allowed, the first close is terminal.
    let event = next_event(&mut events).await;
    assert_eq!(event.kind, ProviderEventKind::Error);
    assert!(event.message.unwrap().contains("closed by server"));

    let mut phase = resolver.stream_phase();
    phase.wait_for(|p| *p == StreamPhase::Stopped).await.unwrap();
    assert_eq!(service.open_count(), 1);
    assert!(!resolver.is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_backoff() {
    let service = Arc::new(FakeService::new());
    let (resolver, _events) = resolver_with(config(5), Arc::clone(&service));
    let mut phase = resolver.stream_phase();

    resolver.init().await;
    phase
        .wait_for(|p| matches!(p, StreamPhase::BackingOff { .. }))
        .await
        .unwrap();

    resolver.shutdown().await;
    assert_eq!(*phase.borrow(), StreamPhase::Stopped);

    tokio::time::sleep(secs(60)).await;
    assert_eq!(service.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_event_types_are_ignored() {
    let service = Arc::new(FakeService::new());
    let feed = service.push_live();
    let (resolver, mut events) = resolver_with(config(5), Arc::clone(&service));

    resolver.init().await;
    feed.send(Ok(flagwire_api::proto::EventStreamResponse {
        r#type: "keep_alive".into(),
        data: None,
    }))
    .unwrap();
    feed.send(Ok(ready())).unwrap();

    // The keep-alive produced nothing; the first event is the ready.
    assert_eq!(next_event(&mut events).await.kind, ProviderEventKind::Ready);
    resolver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stream_error_status_triggers_reconnect() {
    let service = Arc::new(FakeService::new());
    let feed = service.push_live();
    let _next = service.push_live();
    let (resolver, mut events) = resolver_with(config(5), Arc::clone(&service));

    resolver.init().await;
    feed.send(Err(tonic::Status::internal("stream reset"))).unwrap();

    let event = next_event(&mut events).await;
    assert_eq!(event.kind, ProviderEventKind::Error);
    assert!(event.message.unwrap().contains("stream reset"));

    let mut phase = resolver.stream_phase();
    phase
        .wait_for(|p| *p == StreamPhase::Streaming)
        .await
        .unwrap();
    assert_eq!(service.open_count(), 2);
    resolver.shutdown().await;
}
