//! Client error taxonomy.
//!
//! Transport-level failures (`TransportRejected`, `TransportClosed`) and
//! protocol-level failures (`Remote`) are kept apart so callers can decide
//! on retries themselves. This layer never retries.

use crate::domain::config::ConfigError;
use crate::domain::correlation::CorrelationId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error object returned by the remote side for a correctly correlated
/// request. This is data, not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    /// Protocol error code
    pub code: i64,
    /// Protocol error message
    pub message: String,
}

impl RemoteError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Build from an error object. Missing fields default to `0` / empty.
    pub fn from_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let code = object
            .get("code")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or_default();
        let message = object
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self { code, message }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Errors surfaced by the client facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Native `send`/`execute` failed synchronously. Not retried: a malformed
    /// payload stays malformed.
    #[error("transport rejected request: {0}")]
    TransportRejected(String),

    /// No matching response arrived in time. The native request may still
    /// complete; its response will be discarded as an orphan.
    #[error("request {id} timed out after {}ms", .after.as_millis())]
    TimedOut { id: CorrelationId, after: Duration },

    /// Correctly correlated response tagged as an error by the protocol.
    #[error("remote error {0}")]
    Remote(RemoteError),

    /// The client is closing or closed.
    #[error("client closed")]
    ClientClosed,

    /// The receive loop observed a permanent transport failure.
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// Two in-flight requests were given the same id. Indicates a bug in the
    /// allocator; never expected at runtime.
    #[error("correlation id {0} is already pending")]
    DuplicateId(CorrelationId),
}

impl ClientError {
    /// True for failures of the transport itself rather than of the request.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            ClientError::TransportRejected(_) | ClientError::TransportClosed(_)
        )
    }

    /// True if the remote side answered with a protocol error.
    pub fn is_remote(&self) -> bool {
        matches!(self, ClientError::Remote(_))
    }

    /// The protocol error, if this is one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ClientError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RemoteError> for ClientError {
    fn from(e: RemoteError) -> Self {
        ClientError::Remote(e)
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while starting a client.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn receive loop: {0}")]
    Spawn(#[from] std::io::Error),
}
