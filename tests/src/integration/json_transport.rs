//! # Text-Level Transport
//!
//! A client over [`JsonTransport`](tl_bridge::JsonTransport) with a raw
//! transport that speaks JSON strings, the way a native tonlib binding does.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::mpsc;
use std::time::Duration;
use tl_bridge::{RawJsonTransport, TransportFault};

/// Answers every request with `{"@type": "ok", "echo": <request type>}`.
pub struct EchoJsonTransport {
    inbound_tx: Mutex<mpsc::Sender<String>>,
    inbound_rx: Mutex<mpsc::Receiver<String>>,
}

impl EchoJsonTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            inbound_tx: Mutex::new(tx),
            inbound_rx: Mutex::new(rx),
        }
    }

    /// Queue raw inbound text.
    pub fn push_raw(&self, text: &str) {
        let _ = self.inbound_tx.lock().send(text.to_string());
    }
}

impl Default for EchoJsonTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RawJsonTransport for EchoJsonTransport {
    fn send(&self, request: &str) -> Result<(), TransportFault> {
        let request: Value = serde_json::from_str(request)
            .map_err(|e| TransportFault::Rejected(e.to_string()))?;
        let reply = json!({
            "@type": "ok",
            "@extra": request["@extra"],
            "echo": request["@type"],
        });
        self.push_raw(&reply.to_string());
        Ok(())
    }

    fn receive(&self, timeout_secs: f64) -> Result<Option<String>, TransportFault> {
        match self
            .inbound_rx
            .lock()
            .recv_timeout(Duration::from_secs_f64(timeout_secs))
        {
            Ok(text) => Ok(Some(text)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(TransportFault::Closed("gone".into())),
        }
    }

    fn execute(&self, request: &str) -> Option<String> {
        let request: Value = serde_json::from_str(request).ok()?;
        Some(json!({"@type": "ok", "executed": request["@type"]}).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::{eventually, WAIT};
    use std::sync::Arc;
    use tl_bridge::{ClientConfig, JsonTransport, NativeTransport, TlClient};
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_round_trip_over_text_transport() {
        let client =
            TlClient::with_json_transport(EchoJsonTransport::new(), ClientConfig::for_testing())
                .unwrap();

        let response = timeout(WAIT, client.request(json!({"@type": "getMasterchainInfo"}), None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response, json!({"@type": "ok", "echo": "getMasterchainInfo"}));

        let executed = client.notify(json!({"@type": "setLogVerbosityLevel"})).await.unwrap();
        assert_eq!(executed["executed"], json!("setLogVerbosityLevel"));

        client.close().await;
    }

    #[tokio::test]
    async fn test_unparseable_text_does_not_stop_the_loop() {
        let transport = Arc::new(JsonTransport::new(EchoJsonTransport::new()));
        transport.inner().push_raw("{\"@type\": ");
        let native: Arc<dyn NativeTransport> = transport.clone();
        let client = TlClient::new(native, ClientConfig::for_testing()).unwrap();

        eventually("decode error to be counted", || client.stats().receive_errors == 1).await;

        let response = timeout(WAIT, client.request(json!({"@type": "sync"}), None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response["echo"], json!("sync"));

        client.close().await;
    }
}
