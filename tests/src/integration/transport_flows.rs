//! Transport flows: correlation, timeouts, subscriptions and shutdown over
//! a real WebSocket session.

#[cfg(test)]
mod tests {
    use crate::fixtures::{eventually, Chain, FakeNode};
    use futures_util::future::join_all;
    use futures_util::{SinkExt, StreamExt};
    use rand::seq::SliceRandom;
    use serde_json::{json, Value};
    use shared_types::{quantity, Header};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use sw_01_rpc_transport::codec::{self, encode_response, Frame};
    use sw_01_rpc_transport::error::codes;
    use sw_01_rpc_transport::{RpcClient, Session, TransportConfig, TransportError};
    use tokio_tungstenite::tungstenite::{protocol::Role, Message};
    use tokio_tungstenite::WebSocketStream;

    // =========================================================================
    // CORRELATION
    // =========================================================================

    /// Node that waits for `batch` requests and answers them in random order,
    /// echoing each request's first parameter.
    async fn shuffling_node(batch: usize) -> RpcClient {
        let (client_io, server_io) = tokio::io::duplex(256 * 1024);
        let client_ws = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let mut server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

        tokio::spawn(async move {
            let mut received = Vec::with_capacity(batch);
            while received.len() < batch {
                let Some(Ok(Message::Text(text))) = server.next().await else {
                    return;
                };
                if let Ok(Frame::Request { id, params, .. }) = codec::decode(text.as_str()) {
                    received.push((id, params.first().cloned().unwrap_or(Value::Null)));
                }
            }
            received.shuffle(&mut rand::thread_rng());
            for (id, echo) in received {
                let reply = encode_response(id, &echo);
                if server.send(Message::Text(reply.into())).await.is_err() {
                    return;
                }
            }
            while server.next().await.is_some() {}
        });

        let config = TransportConfig::default();
        RpcClient::from_session(
            Arc::new(Session::from_stream(client_ws, &config)),
            config.default_timeout,
        )
    }

    #[tokio::test]
    async fn test_concurrent_calls_receive_their_own_results() {
        let client = shuffling_node(32).await;

        let calls = (0..32u64).map(|i| {
            let client = client.clone();
            async move {
                let result: u64 = client.call("echo", vec![json!(i)]).await.unwrap();
                (i, result)
            }
        });

        for (sent, received) in join_all(calls).await {
            assert_eq!(sent, received);
        }
        assert_eq!(client.session().pending_calls(), 0);
    }

    // =========================================================================
    // TIMEOUTS AND REMOTE ERRORS
    // =========================================================================

    #[tokio::test]
    async fn test_timeout_only_affects_the_silent_call() {
        let (node, client) = FakeNode::start(Chain::new(4, 3)).await;
        node.silence("eth_getBlockByNumber");

        let started = Instant::now();
        let result: Result<Option<Header>, _> = client
            .call_with_timeout(
                "eth_getBlockByNumber",
                vec![json!("latest"), json!(false)],
                Duration::from_millis(20),
            )
            .await;
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(client.session().pending_calls(), 0);

        let validators: Vec<String> = client
            .call("istanbul_getValidators", vec![json!("latest")])
            .await
            .unwrap();
        assert_eq!(validators.len(), 4);
    }

    #[tokio::test]
    async fn test_remote_error_is_returned_to_caller() {
        let (_node, client) = FakeNode::start(Chain::new(4, 1)).await;

        let err = client
            .call::<Value>("debug_traceBlock", vec![])
            .await
            .unwrap_err();

        match err {
            TransportError::Remote(remote) => {
                assert_eq!(remote.code, codes::METHOD_NOT_FOUND);
                assert!(remote.message.contains("debug_traceBlock"));
            }
            other => panic!("expected a remote error, got {:?}", other),
        }
        assert!(!client.session().is_closed());
    }

    #[tokio::test]
    async fn test_absent_block_is_null_result() {
        let (_node, client) = FakeNode::start(Chain::new(4, 2)).await;

        let header: Option<Header> = client
            .call("eth_getBlockByNumber", vec![json!("0x3e8"), json!(false)])
            .await
            .unwrap();
        assert!(header.is_none());

        let err = client
            .call::<Header>("eth_getBlockByNumber", vec![json!("0x3e8"), json!(false)])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_raw_result_is_exact_text() {
        let (_node, client) = FakeNode::start(Chain::new(4, 2)).await;

        let raw = client
            .call_raw(
                "eth_getBlockByNumber",
                vec![json!("0x2"), json!(false)],
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        let header: Header = serde_json::from_slice(&raw).unwrap();
        assert_eq!(header.number, 2);
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    #[tokio::test]
    async fn test_new_heads_arrive_in_order() {
        let (node, client) = FakeNode::start(Chain::new(4, 5)).await;

        let mut heads = client.subscribe("newHeads").await.unwrap();
        assert_eq!(heads.id(), crate::fixtures::SUBSCRIPTION_ID);
        assert_eq!(client.session().subscription_count(), 1);

        for _ in 0..3 {
            node.mine_and_announce();
        }

        for expected in 6..=8u64 {
            let payload = heads.recv().await.unwrap();
            let number = quantity::parse(payload["number"].as_str().unwrap()).unwrap();
            assert_eq!(number, expected);
        }
    }

    #[tokio::test]
    async fn test_notification_for_unknown_subscription_is_dropped() {
        let (node, client) = FakeNode::start(Chain::new(4, 1)).await;
        let mut heads = client.subscribe("newHeads").await.unwrap();

        node.push_raw(codec::encode_notification("0xdeadbeef", &json!({"number": "0x63"})));
        node.mine_and_announce();

        let payload = heads.recv().await.unwrap();
        assert_eq!(payload["number"], json!("0x2"));
    }

    // =========================================================================
    // SHUTDOWN AND CONNECTION LOSS
    // =========================================================================

    #[tokio::test]
    async fn test_close_resolves_pending_calls() {
        let (node, client) = FakeNode::start(Chain::new(4, 1)).await;
        node.silence("eth_getBlockByNumber");

        let pending = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .call_with_timeout::<Option<Header>>(
                        "eth_getBlockByNumber",
                        vec![json!("latest"), json!(false)],
                        Duration::from_secs(30),
                    )
                    .await
            })
        };
        eventually("the call to be pending", || client.session().pending_calls() == 1).await;

        client.close().await;
        assert_eq!(pending.await.unwrap().unwrap_err(), TransportError::Closed);
        assert!(client.session().is_closed());

        // Idempotent, and later calls fail fast.
        client.close().await;
        let err = client
            .call::<Value>("admin_peers", vec![])
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Closed);
    }

    #[tokio::test]
    async fn test_node_disconnect_fails_calls_and_ends_subscriptions() {
        let (node, client) = FakeNode::start(Chain::new(4, 1)).await;
        let mut heads = client.subscribe("newHeads").await.unwrap();
        node.silence("eth_getBlockByNumber");

        let pending = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .call_with_timeout::<Option<Header>>(
                        "eth_getBlockByNumber",
                        vec![json!("latest"), json!(false)],
                        Duration::from_secs(30),
                    )
                    .await
            })
        };
        eventually("the call to be pending", || client.session().pending_calls() == 1).await;

        node.disconnect();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::ConnectionLost(_)));
        assert!(err.is_terminal());
        assert_eq!(heads.recv().await, None);
        assert_eq!(client.session().subscription_count(), 0);
    }
}
