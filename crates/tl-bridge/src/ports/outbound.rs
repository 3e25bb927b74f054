//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The native transport is a blocking, synchronous component. Its calls are
//! made from the gateway (under the outbound mutex) and from the receive
//! loop thread; never from async context directly.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a native transport call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFault {
    /// The call failed synchronously, e.g. malformed payload or local error.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The transport is permanently unusable.
    #[error("closed: {0}")]
    Closed(String),
}

/// Native request/response transport.
///
/// Transport precondition: the value stored in a request's correlation
/// field is echoed unchanged on the single response to that request.
/// Implementations must tolerate `receive` running concurrently with
/// `send`/`execute`. Concurrent `send`/`execute` calls are never issued.
pub trait NativeTransport: Send + Sync {
    /// Enqueue a request. Must not block on the network.
    fn send(&self, request: Value) -> Result<(), TransportFault>;

    /// Block up to `timeout` for the next inbound message.
    ///
    /// `Ok(None)` means the window elapsed with nothing to deliver.
    fn receive(&self, timeout: Duration) -> Result<Option<Value>, TransportFault>;

    /// Perform a request synchronously, bypassing the queue.
    fn execute(&self, request: Value) -> Result<Value, TransportFault>;
}

/// Text-level native transport, shaped like the tonlib JSON client API.
///
/// Adapted to [`NativeTransport`] by
/// [`JsonTransport`](crate::adapters::json::JsonTransport).
pub trait RawJsonTransport: Send + Sync {
    /// Enqueue a JSON-encoded request.
    fn send(&self, request: &str) -> Result<(), TransportFault>;

    /// Block up to `timeout_secs` seconds for the next JSON-encoded message.
    fn receive(&self, timeout_secs: f64) -> Result<Option<String>, TransportFault>;

    /// Perform a JSON-encoded request synchronously.
    ///
    /// `None` means the transport could not produce a result.
    fn execute(&self, request: &str) -> Option<String>;
}
