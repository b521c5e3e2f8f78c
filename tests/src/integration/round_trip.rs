//! # Round-Trip Scenarios
//!
//! Happy-path behavior of the connected bridge pair: handshake, calls in
//! both directions, structural fidelity of payloads, typed calls,
//! notifications, and out-of-order settlement of concurrent calls.

#[cfg(test)]
mod tests {
    use crate::support::{adder_registry, connected_pair, counting_registry};
    use bridge_core::{ConnectionState, HandlerFailure, MethodRegistry};
    use bridge_types::ErrorCode;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_connect_is_symmetric_and_advertises_methods() {
        let (host, child) = connected_pair(adder_registry(), MethodRegistry::empty()).await;

        assert_eq!(host.state(), ConnectionState::Connected);
        assert_eq!(child.state(), ConnectionState::Connected);
        assert_eq!(child.peer_methods(), Some(vec!["add".to_string()]));
        assert_eq!(host.peer_methods(), Some(vec![]));

        // connect() while connected is an idempotent success.
        child.connect().await.unwrap();
    }

    #[tokio::test]
    async fn test_add_round_trip() {
        let (_host, child) = connected_pair(adder_registry(), MethodRegistry::empty()).await;

        let result = child.invoke("add", json!({ "a": 2, "b": 3 })).await.unwrap();
        assert_eq!(result, json!({ "result": 5 }));
        assert_eq!(child.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_structure() {
        let registry = MethodRegistry::builder()
            .method_sync("echo", |payload: Value| Ok(payload))
            .build();
        let (_host, child) = connected_pair(registry, MethodRegistry::empty()).await;

        let value = json!({
            "nested": { "list": [1, 2.5, "three", null, true] },
            "unicode": "Ünïcödé ✓",
            "empty": {},
        });
        let result = child.invoke("echo", value.clone()).await.unwrap();
        assert_eq!(result, value);
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let (_host, child) = connected_pair(adder_registry(), MethodRegistry::empty()).await;

        let error = child.invoke("missing", json!({})).await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::MethodNotFound);
        assert!(error.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_handler_error_propagates_with_details() {
        let registry = MethodRegistry::builder()
            .method_sync("divide", |payload: Value| {
                let b = payload["b"].as_i64().unwrap_or(0);
                if b == 0 {
                    return Err(HandlerFailure::new("division by zero")
                        .with_details(json!({ "dividend": payload["a"] })));
                }
                Ok(json!(payload["a"].as_i64().unwrap_or(0) / b))
            })
            .build();
        let (_host, child) = connected_pair(registry, MethodRegistry::empty()).await;

        let error = child
            .invoke("divide", json!({ "a": 4, "b": 0 }))
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::HandlerError);
        assert!(error.to_string().contains("divide"));
        assert!(error.to_string().contains("division by zero"));
        match error {
            bridge_types::BridgeError::Remote { details, .. } => {
                assert_eq!(details, Some(json!({ "dividend": 4 })));
            }
            other => panic!("unexpected error shape: {other:?}"),
        }
    }

    #[derive(Debug, Serialize)]
    struct AddParams {
        a: i64,
        b: i64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct AddResult {
        result: i64,
    }

    #[tokio::test]
    async fn test_invoke_typed_round_trip() {
        let (_host, child) = connected_pair(adder_registry(), MethodRegistry::empty()).await;

        let result: AddResult = child
            .invoke_typed("add", &AddParams { a: 20, b: 22 })
            .await
            .unwrap();
        assert_eq!(result, AddResult { result: 42 });
    }

    #[tokio::test]
    async fn test_bidirectional_calls() {
        let (host_registry, _host_calls) = counting_registry("host_echo");
        let (child_registry, _child_calls) = counting_registry("child_echo");
        let (host, child) = connected_pair(host_registry, child_registry).await;

        let from_child = child.invoke("host_echo", json!("up")).await.unwrap();
        assert_eq!(from_child, json!("up"));

        let from_host = host.invoke("child_echo", json!("down")).await.unwrap();
        assert_eq!(from_host, json!("down"));
    }

    #[tokio::test]
    async fn test_concurrent_calls_settle_once_each_out_of_order() {
        // Handler sleeps for the requested number of milliseconds before
        // echoing, so earlier requests finish later.
        let registry = MethodRegistry::builder()
            .method("delay_echo", |payload: Value| async move {
                let ms = payload["ms"].as_u64().unwrap_or(0);
                sleep(Duration::from_millis(ms)).await;
                Ok(payload)
            })
            .build();
        let (_host, child) = connected_pair(registry, MethodRegistry::empty()).await;

        let slow = child.invoke("delay_echo", json!({ "ms": 120, "tag": "slow" }));
        let fast = child.invoke("delay_echo", json!({ "ms": 5, "tag": "fast" }));
        let (slow_result, fast_result) = tokio::join!(slow, fast);

        // Each call settled exactly once with its own payload, despite the
        // responses arriving in reverse order.
        assert_eq!(slow_result.unwrap()["tag"], "slow");
        assert_eq!(fast_result.unwrap()["tag"], "fast");
        assert_eq!(child.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_notification_invokes_handler_without_response() {
        let (registry, calls) = counting_registry("tick");
        let (_host, child) = connected_pair(registry, MethodRegistry::empty()).await;

        child.notify("tick", json!({ "n": 1 })).await.unwrap();

        // The handler runs, but nothing ever settles on the caller side.
        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(child.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_is_swallowed() {
        let registry = MethodRegistry::builder()
            .method_sync("explode", |_| Err(HandlerFailure::new("boom")))
            .build();
        let (_host, child) = connected_pair(registry, MethodRegistry::empty()).await;

        child.notify("explode", json!(null)).await.unwrap();
        child.notify("not_registered", json!(null)).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        // Both sides still healthy; a real call still works afterwards.
        assert_eq!(child.state(), ConnectionState::Connected);
        let error = child.invoke("missing", json!({})).await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::MethodNotFound);
    }

    #[tokio::test]
    async fn test_connect_idempotent_keeps_pair_working() {
        let (host, child) = connected_pair(adder_registry(), MethodRegistry::empty()).await;
        assert_eq!(host.state(), ConnectionState::Connected);

        child.connect().await.unwrap();
        let result = child.invoke("add", json!({ "a": 1, "b": 1 })).await.unwrap();
        assert_eq!(result, json!({ "result": 2 }));
    }
}
