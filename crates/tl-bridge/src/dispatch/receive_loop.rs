//! # Receive Loop
//!
//! The only consumer of the transport's inbound side. Runs on a dedicated
//! OS thread because `receive` blocks; the async side never waits on it
//! except through the exit signal.
//!
//! Each poll window is at most `poll_interval`, which bounds how long a
//! shutdown request can go unnoticed.

use crate::dispatch::lifecycle::Lifecycle;
use crate::dispatch::notifications::NotificationHub;
use crate::domain::config::WireConfig;
use crate::domain::error::ClientError;
use crate::domain::message::InboundMessage;
use crate::domain::pending::PendingTable;
use crate::ports::outbound::{NativeTransport, TransportFault};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, info_span, trace, warn};

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// Shutdown was requested
    Shutdown,
    /// The transport reported a permanent failure
    TransportClosed(String),
    /// The loop thread panicked
    Panicked,
}

/// Receive loop counters
#[derive(Debug, Default)]
pub struct LoopStats {
    pub total_received: AtomicU64,
    pub total_malformed: AtomicU64,
    pub total_receive_errors: AtomicU64,
}

/// Shared state the loop routes into.
#[derive(Clone)]
pub struct LoopContext {
    pub pending: Arc<PendingTable>,
    pub notifications: Arc<NotificationHub>,
    pub lifecycle: Arc<Lifecycle>,
    pub stats: Arc<LoopStats>,
}

impl LoopContext {
    /// Permanent transport loss: fail everything outstanding and end all
    /// streams. A no-op if the client is already closing.
    fn fail(&self, reason: &str) {
        if !self.lifecycle.fault(reason) {
            return;
        }
        let cancelled = self
            .pending
            .cancel_all(ClientError::TransportClosed(reason.to_string()));
        self.notifications.close();
        error!(reason = %reason, cancelled, "Client faulted");
    }
}

pub struct ReceiveLoop {
    label: String,
    transport: Arc<dyn NativeTransport>,
    wire: WireConfig,
    poll_interval: Duration,
    context: LoopContext,
    shutdown: watch::Receiver<bool>,
}

impl ReceiveLoop {
    pub fn new(
        label: impl Into<String>,
        transport: Arc<dyn NativeTransport>,
        wire: WireConfig,
        poll_interval: Duration,
        context: LoopContext,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            label: label.into(),
            transport,
            wire,
            poll_interval,
            context,
            shutdown,
        }
    }

    /// Start the loop on its own thread.
    ///
    /// The returned receiver fires once the loop has stopped, whatever the
    /// reason, panics included.
    pub fn spawn(mut self) -> std::io::Result<oneshot::Receiver<LoopExit>> {
        let (exit_tx, exit_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name(format!("tl-receive-{}", self.label))
            .spawn(move || {
                let mut guard = ExitGuard {
                    context: self.context.clone(),
                    sender: Some(exit_tx),
                    exit: None,
                };
                guard.exit = Some(self.run());
            })?;

        Ok(exit_rx)
    }

    /// Poll until shutdown or permanent transport failure.
    pub fn run(&mut self) -> LoopExit {
        let span = info_span!("receive_loop", client = %self.label);
        let _entered = span.enter();
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Receive loop started"
        );

        loop {
            if *self.shutdown.borrow() {
                info!("Receive loop stopping");
                return LoopExit::Shutdown;
            }

            match self.transport.receive(self.poll_interval) {
                Ok(Some(raw)) => self.dispatch(raw),
                Ok(None) => {}
                Err(TransportFault::Closed(reason)) => {
                    warn!(reason = %reason, "Transport closed, stopping receive loop");
                    self.context.fail(&reason);
                    return LoopExit::TransportClosed(reason);
                }
                Err(fault) => {
                    self.context
                        .stats
                        .total_receive_errors
                        .fetch_add(1, Ordering::Relaxed);
                    error!(error = %fault, "Error receiving from transport");
                    std::thread::sleep(self.poll_interval);
                }
            }
        }
    }

    /// Route one inbound message.
    pub fn dispatch(&self, raw: Value) {
        let stats = &self.context.stats;
        stats.total_received.fetch_add(1, Ordering::Relaxed);

        match self.wire.classify(raw) {
            InboundMessage::Response { id, payload } => {
                self.context.pending.resolve(id, Ok(payload));
            }
            InboundMessage::Error { id, error } => {
                debug!(correlation_id = %id, error = %error, "Remote error response");
                self.context
                    .pending
                    .resolve(id, Err(ClientError::Remote(error)));
            }
            InboundMessage::Notification(notification) => {
                trace!(kind = %notification.kind, "Notification received");
                self.context.notifications.publish(notification);
            }
            InboundMessage::Malformed { reason, payload } => {
                stats.total_malformed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    reason = %reason,
                    message_type = %self.wire.type_of(&payload),
                    "Dropping malformed inbound message"
                );
            }
        }
    }
}

/// Reports loop termination from inside the loop thread, even on unwind.
struct ExitGuard {
    context: LoopContext,
    sender: Option<oneshot::Sender<LoopExit>>,
    exit: Option<LoopExit>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let exit = self.exit.take().unwrap_or(LoopExit::Panicked);
        if exit == LoopExit::Panicked {
            self.context.fail("receive loop panicked");
        }
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(exit);
        }
    }
}
