//! Envelope handling at the transport boundary.
//!
//! Everything the transport hands back is classified into an
//! [`InboundMessage`] before any routing decision is made. Past this point
//! the payload itself stays opaque.

use crate::domain::config::WireConfig;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::RemoteError;
use serde_json::{Map, Value};

/// Type name used for objects that carry no type field.
pub const UNKNOWN_TYPE: &str = "unknown";

/// An uncorrelated, server-pushed message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Value of the type field, or [`UNKNOWN_TYPE`]
    pub kind: String,
    /// The full message
    pub payload: Value,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Successful response to a request we issued
    Response { id: CorrelationId, payload: Value },
    /// Protocol error in response to a request we issued
    Error { id: CorrelationId, error: RemoteError },
    /// Message carrying no correlation field
    Notification(Notification),
    /// Message that cannot be routed
    Malformed { reason: String, payload: Value },
}

impl InboundMessage {
    /// Correlation id, for responses and errors.
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        match self {
            InboundMessage::Response { id, .. } | InboundMessage::Error { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl WireConfig {
    /// Classify a raw inbound value.
    ///
    /// The correlation field is stripped from response payloads; callers
    /// never put it there.
    pub fn classify(&self, raw: Value) -> InboundMessage {
        let mut object = match raw {
            Value::Object(object) => object,
            other => {
                return InboundMessage::Malformed {
                    reason: "inbound message is not a JSON object".into(),
                    payload: other,
                }
            }
        };

        let Some(extra) = object.remove(&self.correlation_field) else {
            return InboundMessage::Notification(Notification {
                kind: self.type_name(&object).to_string(),
                payload: Value::Object(object),
            });
        };

        let Some(id) = CorrelationId::from_wire(&extra) else {
            object.insert(self.correlation_field.clone(), extra);
            return InboundMessage::Malformed {
                reason: format!("unrecognised {} value", self.correlation_field),
                payload: Value::Object(object),
            };
        };

        if self.is_error(&object) {
            InboundMessage::Error {
                id,
                error: RemoteError::from_object(&object),
            }
        } else {
            InboundMessage::Response {
                id,
                payload: Value::Object(object),
            }
        }
    }

    /// Check a request payload before it reaches the transport.
    ///
    /// Requests must be objects with a string type field. The correlation
    /// field is reserved.
    pub fn validate_request(&self, payload: &Value) -> Result<(), String> {
        let Value::Object(object) = payload else {
            return Err("request must be a JSON object".into());
        };

        match object.get(&self.type_field) {
            Some(Value::String(t)) if !t.is_empty() => {}
            _ => return Err(format!("request is missing a string {} field", self.type_field)),
        }

        if object.contains_key(&self.correlation_field) {
            return Err(format!(
                "request may not set the reserved {} field",
                self.correlation_field
            ));
        }

        Ok(())
    }

    /// Validate `payload` and stamp `id` into its correlation field.
    pub fn stamp(&self, mut payload: Value, id: CorrelationId) -> Result<Value, String> {
        self.validate_request(&payload)?;
        if let Value::Object(object) = &mut payload {
            object.insert(self.correlation_field.clone(), id.to_wire());
        }
        Ok(payload)
    }

    /// Split a synchronous `execute` result into success or protocol error.
    pub fn split_result(&self, result: Value) -> Result<Value, RemoteError> {
        match &result {
            Value::Object(object) if self.is_error(object) => Err(RemoteError::from_object(object)),
            _ => Ok(result),
        }
    }

    /// Type name of a request or message, for logging.
    pub fn type_of<'a>(&self, payload: &'a Value) -> &'a str {
        payload
            .get(&self.type_field)
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_TYPE)
    }

    fn type_name<'a>(&self, object: &'a Map<String, Value>) -> &'a str {
        object
            .get(&self.type_field)
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_TYPE)
    }

    fn is_error(&self, object: &Map<String, Value>) -> bool {
        self.type_name(object) == self.error_type
    }
}
