//! # Client Lifecycle
//!
//! `close()` semantics, drop without close, and `notify()` bypassing
//! correlation entirely.

#[cfg(test)]
mod tests {
    use super::super::{sent_requests, start, start_with, WAIT};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tl_bridge::adapters::sim::reply_to;
    use tl_bridge::{
        BridgeApi, ClientConfig, ClientError, ClientState, NativeTransport, RemoteError,
        SimulatedTransport, TlClient,
    };
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_close_fails_outstanding_and_stops_loop() {
        let transport = Arc::new(SimulatedTransport::new());
        let client = start(&transport);

        let outstanding: Vec<_> = (0..5)
            .map(|n| {
                let client = client.clone();
                tokio::spawn(async move {
                    client
                        .request(json!({"@type": "sync", "n": n}), Some(Duration::from_secs(30)))
                        .await
                })
            })
            .collect();
        sent_requests(&transport, 5).await;
        assert_eq!(client.pending_count(), 5);

        timeout(WAIT, client.close()).await.expect("close hung");

        for handle in outstanding {
            let result = timeout(WAIT, handle).await.unwrap().unwrap();
            assert_eq!(result, Err(ClientError::ClientClosed));
        }
        assert_eq!(client.pending_count(), 0);
        assert_eq!(client.state(), ClientState::Closed);
        assert_eq!(client.stats().cancelled, 5);

        // Nobody is polling any more: the message stays in the transport
        let marker = json!({"@type": "updateSyncState", "marker": true});
        transport.inject(marker.clone());
        assert_eq!(
            transport.receive(Duration::from_millis(50)).unwrap(),
            Some(marker)
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent_across_clones() {
        let transport = Arc::new(SimulatedTransport::new());
        let client = start(&transport);
        let other = client.clone();

        tokio::join!(client.close(), other.close());
        client.close().await;

        assert_eq!(client.state(), ClientState::Closed);
        assert_eq!(other.state(), ClientState::Closed);
    }

    #[tokio::test]
    async fn test_close_returns_within_poll_window() {
        let transport = Arc::new(SimulatedTransport::new());
        let config = ClientConfig {
            poll_interval_ms: 100,
            ..ClientConfig::for_testing()
        };
        let client = start_with(&transport, config);

        // One window plus scheduling slack
        timeout(Duration::from_secs(1), client.close())
            .await
            .expect("close exceeded poll window");
    }

    #[tokio::test]
    async fn test_operations_after_close() {
        let transport = Arc::new(SimulatedTransport::new());
        let client = start(&transport);
        client.close().await;

        assert_eq!(
            client.request(json!({"@type": "sync"}), None).await,
            Err(ClientError::ClientClosed)
        );
        assert_eq!(
            client.notify(json!({"@type": "sync"})).await,
            Err(ClientError::ClientClosed)
        );
        assert!(client.subscribe().recv().await.is_none());
        assert_eq!(transport.sent_count(), 0);
        assert_eq!(transport.execute_calls(), 0);
    }

    #[tokio::test]
    async fn test_dropping_last_clone_shuts_down() {
        let transport = Arc::new(SimulatedTransport::new());
        let client = start(&transport);
        let mut stream = client.subscribe();

        let request = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .request(json!({"@type": "sync"}), Some(Duration::from_secs(30)))
                    .await
            })
        };
        sent_requests(&transport, 1).await;

        // The spawned task still holds a clone
        drop(client);
        request.abort();
        let _ = request.await;

        assert!(timeout(WAIT, stream.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notify_never_touches_correlation_state() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.on_execute(|request| {
            Ok(json!({"@type": "bip39Hints", "words": ["abandon", "ability"], "for": request["prefix"]}))
        });
        let client = start(&transport);

        let outstanding = tokio::spawn({
            let client = client.clone();
            async move { client.request(json!({"@type": "sync"}), None).await }
        });
        let sent = sent_requests(&transport, 1).await;
        let before = client.stats();

        let hints = client
            .notify(json!({"@type": "getBip39Hints", "prefix": "ab"}))
            .await
            .unwrap();
        assert_eq!(hints["for"], json!("ab"));

        let after = client.stats();
        assert_eq!(after.next_id, before.next_id);
        assert_eq!(after.registered, before.registered);
        assert_eq!(after.pending, 1);
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(transport.execute_calls(), 1);

        // The outstanding request is unaffected
        transport.inject(reply_to(&sent[0], json!({"@type": "ok"})));
        assert!(timeout(WAIT, outstanding).await.unwrap().unwrap().is_ok());

        client.close().await;
    }

    #[tokio::test]
    async fn test_notify_surfaces_remote_error() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.on_execute(|_| Ok(json!({"@type": "error", "code": 400, "message": "INVALID_MNEMONIC"})));
        let client = start(&transport);

        assert_eq!(
            client.notify(json!({"@type": "importKey"})).await,
            Err(ClientError::Remote(RemoteError::new(400, "INVALID_MNEMONIC")))
        );
        client.close().await;
    }

    #[tokio::test]
    async fn test_trait_object_api() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.respond_with(|request| Some(reply_to(request, json!({"@type": "ok"}))));
        let client: Arc<dyn BridgeApi> = Arc::new(start(&transport));

        assert!(client.request(json!({"@type": "sync"}), None).await.is_ok());
        assert!(client.notify(json!({"@type": "sync"})).await.is_ok());
        client.close().await;
        assert!(client.subscribe().recv().await.is_none());
    }

    #[test]
    fn test_client_starts_without_runtime() {
        let transport = Arc::new(SimulatedTransport::new());
        let client = TlClient::new(transport, ClientConfig::for_testing()).unwrap();
        assert_eq!(client.state(), ClientState::Active);
        assert_eq!(client.config().name, "tl-test");
        drop(client);
    }
}
