//! Text-level transport adapter.
//!
//! Wraps a [`RawJsonTransport`] (JSON strings in, JSON strings out) as a
//! [`NativeTransport`]. Inbound text that does not parse is reported as a
//! transient fault, so the receive loop logs it and keeps polling.

use crate::ports::outbound::{NativeTransport, RawJsonTransport, TransportFault};
use serde_json::Value;
use std::time::Duration;

pub struct JsonTransport<R> {
    raw: R,
}

impl<R: RawJsonTransport> JsonTransport<R> {
    pub fn new(raw: R) -> Self {
        Self { raw }
    }

    pub fn inner(&self) -> &R {
        &self.raw
    }
}

fn encode(request: &Value) -> Result<String, TransportFault> {
    serde_json::to_string(request)
        .map_err(|e| TransportFault::Rejected(format!("cannot encode request: {e}")))
}

fn decode(text: &str) -> Result<Value, TransportFault> {
    serde_json::from_str(text)
        .map_err(|e| TransportFault::Rejected(format!("unparseable message: {e}")))
}

impl<R: RawJsonTransport> NativeTransport for JsonTransport<R> {
    fn send(&self, request: Value) -> Result<(), TransportFault> {
        self.raw.send(&encode(&request)?)
    }

    fn receive(&self, timeout: Duration) -> Result<Option<Value>, TransportFault> {
        match self.raw.receive(timeout.as_secs_f64())? {
            Some(text) => decode(&text).map(Some),
            None => Ok(None),
        }
    }

    fn execute(&self, request: Value) -> Result<Value, TransportFault> {
        match self.raw.execute(&encode(&request)?) {
            Some(text) => decode(&text),
            None => Err(TransportFault::Rejected("execute produced no result".into())),
        }
    }
}
