//! # Resilience Scenarios
//!
//! Behavior under an uncooperative counterpart and during teardown: call
//! timeouts, bounded retries with backoff, handshake exhaustion, stale
//! acknowledgments, late responses, and destruction mid-flight.

#[cfg(test)]
mod tests {
    use crate::support::{
        connected_pair, quick_config, scripted_peer, silent_peer, spawn_bridge, CHILD, HOST,
    };
    use bridge_channel::pair;
    use bridge_core::{
        CallOptions, ConnectionState, HandlerFailure, MethodRegistry, RetryPolicy,
    };
    use bridge_types::{BridgeError, ErrorCode};
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_call_times_out_against_silent_peer() {
        let (host_endpoint, child_endpoint) = pair(HOST, CHILD);
        let (requests_seen, _script) = silent_peer(host_endpoint);
        let child = spawn_bridge(child_endpoint, quick_config(HOST), MethodRegistry::empty());
        child.connect().await.unwrap();

        let started = Instant::now();
        let error = child
            .invoke_with(
                "ping",
                json!(null),
                CallOptions::default().with_timeout(Duration::from_millis(100)),
            )
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::Timeout);
        assert!(error.to_string().contains("ping"));
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(requests_seen.load(Ordering::SeqCst), 1);
        assert_eq!(child.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_retry_sends_bounded_attempts_with_backoff() {
        let (host_endpoint, child_endpoint) = pair(HOST, CHILD);
        let (requests_seen, _script) = silent_peer(host_endpoint);
        let child = spawn_bridge(child_endpoint, quick_config(HOST), MethodRegistry::empty());
        child.connect().await.unwrap();

        let options = CallOptions::default()
            .with_timeout(Duration::from_millis(80))
            .with_retry(RetryPolicy::new(
                3,
                Duration::from_millis(50),
                2.0,
                Duration::from_secs(1),
            ));

        let started = Instant::now();
        let error = child.invoke_with("ping", json!(null), options).await.unwrap_err();
        let elapsed = started.elapsed();

        // Exactly three requests hit the wire, separated by 50ms and 100ms
        // backoff; the final outcome is the last attempt's timeout.
        assert_eq!(error.code(), ErrorCode::Timeout);
        assert_eq!(requests_seen.load(Ordering::SeqCst), 3);
        assert!(elapsed >= Duration::from_millis(80 + 50 + 80 + 100 + 80));
        assert_eq!(child.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_not_connected_rejects_immediately_without_retry() {
        let (host_endpoint, child_endpoint) = pair(HOST, CHILD);
        let (requests_seen, _script) = silent_peer(host_endpoint);
        let child = spawn_bridge(child_endpoint, quick_config(HOST), MethodRegistry::empty());
        // No connect().

        let started = Instant::now();
        let error = child
            .invoke_with(
                "ping",
                json!(null),
                CallOptions::default().with_retry(RetryPolicy::new(
                    5,
                    Duration::from_millis(100),
                    2.0,
                    Duration::from_secs(1),
                )),
            )
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::NotConnected);
        // No attempt was made and no retry schedule ran.
        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(requests_seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_default_predicate_does_not_retry_remote_errors() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let registry = MethodRegistry::builder()
            .method_sync("flaky", {
                let calls = calls.clone();
                move |_: Value| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(HandlerFailure::new("still broken"))
                }
            })
            .build();
        let (_host, child) = connected_pair(registry, MethodRegistry::empty()).await;

        let options = CallOptions::default().with_retry(RetryPolicy::new(
            3,
            Duration::from_millis(10),
            2.0,
            Duration::from_millis(100),
        ));
        let error = child.invoke_with("flaky", json!(null), options).await.unwrap_err();

        // The responder answered (with an error); that is not a timeout, so
        // the default predicate does not replay it.
        assert_eq!(error.code(), ErrorCode::HandlerError);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_predicate_retries_remote_errors() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let registry = MethodRegistry::builder()
            .method_sync("flaky", {
                let calls = calls.clone();
                move |_: Value| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(HandlerFailure::new("still broken"))
                }
            })
            .build();
        let (_host, child) = connected_pair(registry, MethodRegistry::empty()).await;

        let options = CallOptions::default().with_retry(
            RetryPolicy::new(3, Duration::from_millis(10), 2.0, Duration::from_millis(100))
                .with_predicate(|error| error.code() == ErrorCode::HandlerError),
        );
        let error = child.invoke_with("flaky", json!(null), options).await.unwrap_err();

        assert_eq!(error.code(), ErrorCode::HandlerError);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_destroy_settles_pending_and_blocks_future_ops() {
        let registry = MethodRegistry::builder()
            .method("hang", |_: Value| async {
                sleep(Duration::from_secs(30)).await;
                Ok(json!(null))
            })
            .build();
        let (_host, child) = connected_pair(registry, MethodRegistry::empty()).await;

        let pending = tokio::spawn({
            let child = child.clone();
            async move { child.invoke("hang", json!(null)).await }
        });
        sleep(Duration::from_millis(50)).await;
        assert_eq!(child.pending_calls(), 1);

        child.destroy();

        // The pending call settles with DESTROYED, exactly once.
        let outcome = pending.await.unwrap();
        assert_eq!(outcome.unwrap_err().code(), ErrorCode::Destroyed);
        assert_eq!(child.pending_calls(), 0);
        assert_eq!(child.state(), ConnectionState::Destroyed);

        // Everything after destruction rejects immediately.
        let error = child.invoke("hang", json!(null)).await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::Destroyed);
        let error = child.connect().await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::Destroyed);
        let error = child.notify("hang", json!(null)).await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::Destroyed);

        // And destroy() again is a no-op.
        child.destroy();
    }

    #[tokio::test]
    async fn test_destroy_during_retry_backoff() {
        let (host_endpoint, child_endpoint) = pair(HOST, CHILD);
        let (requests_seen, _script) = silent_peer(host_endpoint);
        let child = spawn_bridge(child_endpoint, quick_config(HOST), MethodRegistry::empty());
        child.connect().await.unwrap();

        let options = CallOptions::default()
            .with_timeout(Duration::from_millis(80))
            .with_retry(RetryPolicy::new(
                3,
                Duration::from_millis(300),
                2.0,
                Duration::from_secs(1),
            ));
        let call = tokio::spawn({
            let child = child.clone();
            async move { child.invoke_with("ping", json!(null), options).await }
        });

        // First attempt times out at ~80ms; destroy lands in the backoff
        // window and must win over the second attempt.
        sleep(Duration::from_millis(150)).await;
        child.destroy();

        let outcome = call.await.unwrap();
        assert_eq!(outcome.unwrap_err().code(), ErrorCode::Destroyed);
        assert_eq!(requests_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handshake_exhaustion_rejects_connect() {
        let (host_endpoint, child_endpoint) = pair(HOST, CHILD);
        // Keep the counterpart alive but completely unresponsive.
        let _host_inbound = host_endpoint.take_inbound();

        let child = spawn_bridge(child_endpoint, quick_config(HOST), MethodRegistry::empty());

        let started = Instant::now();
        let error = child.connect().await.unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(error.code(), ErrorCode::HandshakeFailed);
        match error {
            BridgeError::HandshakeFailed {
                attempts,
                cause: Some(cause),
                ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(cause.code(), ErrorCode::Timeout);
            }
            other => panic!("unexpected error shape: {other:?}"),
        }
        // Three 200ms attempts plus two 20ms inter-attempt delays.
        assert!(elapsed >= Duration::from_millis(3 * 200 + 2 * 20));
        assert_eq!(child.state(), ConnectionState::Disconnected);
        assert_eq!(child.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_ack_never_connects() {
        let (host_endpoint, child_endpoint) = pair(HOST, CHILD);

        // A confused (or spoofing) peer that acks with the wrong request id.
        let mut host_inbound = host_endpoint.take_inbound().unwrap();
        tokio::spawn(async move {
            while let Some(delivery) = host_inbound.recv().await {
                if delivery.payload["type"] == "handshake_request" {
                    let bogus = json!({
                        "version": 1,
                        "id": "bogus-ack",
                        "timestamp_ms": 0,
                        "type": "handshake_ack",
                        "request_id": "attempt-that-never-was",
                        "advertised_methods": [],
                    });
                    let _ = host_endpoint.send_raw(bogus).await;
                }
            }
        });

        let child = spawn_bridge(child_endpoint, quick_config(HOST), MethodRegistry::empty());
        let error = child.connect().await.unwrap_err();

        // Every bogus ack was ignored outright; the handshake ran its full
        // retry schedule and the state never left the connecting cycle.
        assert_eq!(error.code(), ErrorCode::HandshakeFailed);
        assert_eq!(child.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_late_response_is_discarded() {
        let (host_endpoint, child_endpoint) = pair(HOST, CHILD);

        // Scripted peer that answers correctly, but far too late.
        let mut host_inbound = host_endpoint.take_inbound().unwrap();
        tokio::spawn(async move {
            while let Some(delivery) = host_inbound.recv().await {
                let value = delivery.payload;
                match value["type"].as_str() {
                    Some("handshake_request") => {
                        let ack = json!({
                            "version": 1,
                            "id": "late-ack",
                            "timestamp_ms": 0,
                            "type": "handshake_ack",
                            "request_id": value["id"],
                            "advertised_methods": [],
                        });
                        let _ = host_endpoint.send_raw(ack).await;
                    }
                    Some("request") => {
                        sleep(Duration::from_millis(300)).await;
                        let response = json!({
                            "version": 1,
                            "id": "late-response",
                            "timestamp_ms": 0,
                            "type": "response",
                            "request_id": value["id"],
                            "success": true,
                            "data": { "too": "late" },
                        });
                        let _ = host_endpoint.send_raw(response).await;
                    }
                    _ => {}
                }
            }
        });

        let child = spawn_bridge(child_endpoint, quick_config(HOST), MethodRegistry::empty());
        child.connect().await.unwrap();

        let error = child
            .invoke_with(
                "ping",
                json!(null),
                CallOptions::default().with_timeout(Duration::from_millis(100)),
            )
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::Timeout);

        // Let the late response arrive; it finds no pending entry and is
        // silently discarded.
        sleep(Duration::from_millis(350)).await;
        assert_eq!(child.pending_calls(), 0);
        assert_eq!(child.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_scripted_peer_can_answer() {
        // Sanity check on the scripted-peer fixture itself: a response built
        // from the request settles the call.
        let (host_endpoint, child_endpoint) = pair(HOST, CHILD);
        let (requests_seen, _script) = scripted_peer(host_endpoint, |request| {
            Some(json!({
                "version": 1,
                "id": "script-response",
                "timestamp_ms": 0,
                "type": "response",
                "request_id": request["id"],
                "success": true,
                "data": { "pong": true },
            }))
        });
        let child = spawn_bridge(child_endpoint, quick_config(HOST), MethodRegistry::empty());
        child.connect().await.unwrap();

        let result = child.invoke("ping", json!(null)).await.unwrap();
        assert_eq!(result, json!({ "pong": true }));
        assert_eq!(requests_seen.load(Ordering::SeqCst), 1);
    }
}
