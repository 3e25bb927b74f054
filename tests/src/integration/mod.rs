//! # Integration Scenarios
//!
//! Shared fixtures. Every scenario runs a real [`TlClient`] over a
//! [`SimulatedTransport`]; responses are injected by hand so the test
//! controls arrival order and timing.

pub mod json_transport;
pub mod lifecycle;

use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tl_bridge::{ClientConfig, SimulatedTransport, TlClient};

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// Start a client with short poll windows.
pub fn start(transport: &Arc<SimulatedTransport>) -> TlClient {
    start_with(transport, ClientConfig::for_testing())
}

pub fn start_with(transport: &Arc<SimulatedTransport>, config: ClientConfig) -> TlClient {
    match TlClient::new(transport.clone(), config) {
        Ok(client) => client,
        Err(e) => panic!("client failed to start: {e}"),
    }
}

/// Wait until `condition` holds, panicking after [`WAIT`].
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Wait until the transport has accepted `count` requests and return them.
pub async fn sent_requests(transport: &SimulatedTransport, count: usize) -> Vec<Value> {
    eventually("requests to reach the transport", || {
        transport.sent_count() >= count
    })
    .await;
    transport.sent()
}

/// Find the sent request of type `kind`.
pub fn request_of(sent: &[Value], kind: &str) -> Value {
    sent.iter()
        .find(|r| r["@type"] == kind)
        .cloned()
        .unwrap_or_else(|| panic!("no {kind} request was sent"))
}
