//! # Inbound Ports
//!
//! API trait defining what a correlated client can do.

use crate::dispatch::notifications::{NotificationFilter, NotificationStream};
use crate::domain::error::ClientResult;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Correlated client API - inbound port.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    /// Submit a request and wait for its correlated response.
    ///
    /// `None` uses the configured default timeout.
    async fn request(&self, payload: Value, timeout: Option<Duration>) -> ClientResult<Value>;

    /// Execute a request synchronously on the transport, bypassing
    /// correlation entirely.
    async fn notify(&self, payload: Value) -> ClientResult<Value>;

    /// Stream of notifications matching `filter`.
    fn subscribe_filtered(&self, filter: NotificationFilter) -> NotificationStream;

    /// Stream of every notification.
    fn subscribe(&self) -> NotificationStream {
        self.subscribe_filtered(NotificationFilter::all())
    }

    /// Stop the client. Idempotent.
    async fn close(&self);
}
