//! In-memory native transport.
//!
//! Inbound messages are queued by the test via [`inject`](SimulatedTransport::inject)
//! and handed out by `receive` in FIFO order. Every accepted `send` is
//! recorded so tests can answer requests in any order they like.

use crate::ports::outbound::{NativeTransport, TransportFault};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::Duration;

type ExecuteHandler = Box<dyn Fn(Value) -> Result<Value, TransportFault> + Send>;
type Responder = Box<dyn Fn(&Value) -> Option<Value> + Send>;

/// Scriptable [`NativeTransport`].
pub struct SimulatedTransport {
    inbound_tx: Mutex<mpsc::Sender<Value>>,
    inbound_rx: Mutex<mpsc::Receiver<Value>>,
    sent: Mutex<Vec<Value>>,
    rejected_types: Mutex<HashSet<String>>,
    receive_faults: Mutex<VecDeque<String>>,
    closed: Mutex<Option<String>>,
    execute_handler: Mutex<Option<ExecuteHandler>>,
    responder: Mutex<Option<Responder>>,
    execute_calls: AtomicU64,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel();
        Self {
            inbound_tx: Mutex::new(inbound_tx),
            inbound_rx: Mutex::new(inbound_rx),
            sent: Mutex::new(Vec::new()),
            rejected_types: Mutex::new(HashSet::new()),
            receive_faults: Mutex::new(VecDeque::new()),
            closed: Mutex::new(None),
            execute_handler: Mutex::new(None),
            responder: Mutex::new(None),
            execute_calls: AtomicU64::new(0),
        }
    }

    /// Queue an inbound message.
    pub fn inject(&self, message: Value) {
        // The receiver lives as long as `self`
        let _ = self.inbound_tx.lock().send(message);
    }

    /// Requests accepted by `send`, in order.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Number of `execute` calls, successful or not.
    pub fn execute_calls(&self) -> u64 {
        self.execute_calls.load(Ordering::Relaxed)
    }

    /// Make `send` reject requests of type `kind`.
    pub fn reject_type(&self, kind: &str) {
        self.rejected_types.lock().insert(kind.to_string());
    }

    /// Fail the next `receive` with a transient fault.
    pub fn fail_next_receive(&self, reason: &str) {
        self.receive_faults.lock().push_back(reason.to_string());
    }

    /// Close the transport permanently.
    pub fn fail(&self, reason: &str) {
        *self.closed.lock() = Some(reason.to_string());
    }

    /// Answer `execute` calls with `handler`. Without one, `execute`
    /// returns `{"@type": "ok"}`.
    pub fn on_execute<F>(&self, handler: F)
    where
        F: Fn(Value) -> Result<Value, TransportFault> + Send + 'static,
    {
        *self.execute_handler.lock() = Some(Box::new(handler));
    }

    /// Answer every accepted `send` by queueing `responder`'s output.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&Value) -> Option<Value> + Send + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
    }

    fn check_open(&self) -> Result<(), TransportFault> {
        match self.closed.lock().as_ref() {
            Some(reason) => Err(TransportFault::Closed(reason.clone())),
            None => Ok(()),
        }
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeTransport for SimulatedTransport {
    fn send(&self, request: Value) -> Result<(), TransportFault> {
        self.check_open()?;

        let kind = request.get("@type").and_then(Value::as_str).unwrap_or_default();
        if self.rejected_types.lock().contains(kind) {
            return Err(TransportFault::Rejected(format!("cannot send {kind}")));
        }

        let reply = self.responder.lock().as_ref().and_then(|r| r(&request));
        self.sent.lock().push(request);
        if let Some(reply) = reply {
            self.inject(reply);
        }
        Ok(())
    }

    fn receive(&self, timeout: Duration) -> Result<Option<Value>, TransportFault> {
        self.check_open()?;
        if let Some(reason) = self.receive_faults.lock().pop_front() {
            return Err(TransportFault::Rejected(reason));
        }

        match self.inbound_rx.lock().recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(TransportFault::Closed("inbound queue disconnected".into()))
            }
        }
    }

    fn execute(&self, request: Value) -> Result<Value, TransportFault> {
        self.execute_calls.fetch_add(1, Ordering::Relaxed);
        self.check_open()?;
        match self.execute_handler.lock().as_ref() {
            Some(handler) => handler(request),
            None => Ok(json!({"@type": "ok"})),
        }
    }
}

/// Build a response to `request`, echoing its `@extra`.
pub fn reply_to(request: &Value, mut body: Value) -> Value {
    if let (Some(extra), Value::Object(object)) = (request.get("@extra"), &mut body) {
        object.insert("@extra".to_string(), extra.clone());
    }
    body
}
