//! # Client Facade
//!
//! Public entry point: owns the allocator, pending table, gateway and
//! receive loop, and exposes them as async operations.
//!
//! ```text
//! request() ──admit──→ gateway.submit ──→ [PendingTable] ←── receive loop
//!     │                                         │
//!     └──── await completion (with timeout) ←───┘
//! ```

use crate::adapters::json::JsonTransport;
use crate::dispatch::gateway::TransportGateway;
use crate::dispatch::lifecycle::{ClientState, Lifecycle};
use crate::dispatch::notifications::{NotificationFilter, NotificationHub, NotificationStream};
use crate::dispatch::receive_loop::{LoopContext, LoopExit, LoopStats, ReceiveLoop};
use crate::domain::config::ClientConfig;
use crate::domain::correlation::{CorrelationId, IdentityAllocator};
use crate::domain::error::{ClientError, ClientResult, StartError};
use crate::domain::pending::PendingTable;
use crate::ports::inbound::BridgeApi;
use crate::ports::outbound::{NativeTransport, RawJsonTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};
use uuid::Uuid;

/// Point-in-time counters for a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub pending: usize,
    pub registered: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub orphaned: u64,
    pub discarded: u64,
    pub received: u64,
    pub malformed: u64,
    pub receive_errors: u64,
    pub notifications: u64,
    pub dropped_notifications: u64,
    /// Id the next request will get
    pub next_id: u64,
}

/// Concurrent async client over a blocking native transport.
///
/// Cheap to clone; clones share one transport and one receive loop.
/// Dropping the last clone without calling [`close`](Self::close) signals
/// the receive loop and fails outstanding requests with `ClientClosed`.
#[derive(Clone)]
pub struct TlClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    id: Uuid,
    config: ClientConfig,
    allocator: IdentityAllocator,
    gateway: Arc<TransportGateway>,
    context: LoopContext,
    shutdown: watch::Sender<bool>,
    loop_exit: Mutex<Option<oneshot::Receiver<LoopExit>>>,
    close_lock: tokio::sync::Mutex<()>,
}

impl TlClient {
    /// Validate `config` and start the receive loop.
    ///
    /// Does not need a runtime; the operations do.
    pub fn new(
        transport: Arc<dyn NativeTransport>,
        config: ClientConfig,
    ) -> Result<Self, StartError> {
        config.validate()?;

        let id = Uuid::new_v4();
        let context = LoopContext {
            pending: Arc::new(PendingTable::new()),
            notifications: Arc::new(NotificationHub::new()),
            lifecycle: Arc::new(Lifecycle::new()),
            stats: Arc::new(LoopStats::default()),
        };
        let (shutdown, shutdown_rx) = watch::channel(false);

        let receive_loop = ReceiveLoop::new(
            config.name.clone(),
            Arc::clone(&transport),
            config.wire.clone(),
            config.poll_interval(),
            context.clone(),
            shutdown_rx,
        );
        let loop_exit = receive_loop.spawn()?;

        info!(
            client = %config.name,
            client_id = %id,
            poll_interval_ms = config.poll_interval_ms,
            "Client started"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                id,
                gateway: Arc::new(TransportGateway::new(transport, config.wire.clone())),
                config,
                allocator: IdentityAllocator::new(),
                context,
                shutdown,
                loop_exit: Mutex::new(Some(loop_exit)),
                close_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Start a client over a text-level transport.
    pub fn with_json_transport<R>(raw: R, config: ClientConfig) -> Result<Self, StartError>
    where
        R: RawJsonTransport + 'static,
    {
        Self::new(Arc::new(JsonTransport::new(raw)), config)
    }

    /// Send `payload` and wait for the correlated response.
    ///
    /// `timeout` defaults to the configured `default_timeout_ms`. A response
    /// arriving after the timeout is dropped as an orphan. If the caller's
    /// future is dropped early, its entry is discarded.
    pub async fn request(&self, payload: Value, timeout: Option<Duration>) -> ClientResult<Value> {
        let inner = &self.inner;
        let timeout = timeout.unwrap_or_else(|| inner.config.default_timeout());

        let (id, mut completion) = inner.context.lifecycle.admit(|| {
            inner
                .gateway
                .submit(payload, &inner.allocator, &inner.context.pending)
        })?;
        let mut guard = PendingGuard::new(&inner.context.pending, id);

        let outcome = match tokio::time::timeout(timeout, &mut completion).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::ClientClosed),
            Err(_) => {
                let timed_out = ClientError::TimedOut { id, after: timeout };
                if inner.context.pending.cancel(id, timed_out.clone()) {
                    debug!(correlation_id = %id, "Request timed out");
                    Err(timed_out)
                } else {
                    // Resolved between the deadline and the cancel
                    completion.try_recv().unwrap_or(Err(timed_out))
                }
            }
        };

        guard.disarm();
        outcome
    }

    /// Run `payload` through the transport's synchronous `execute`.
    ///
    /// Bypasses correlation: no id is allocated and the pending table is
    /// untouched. The blocking call runs on tokio's blocking pool, admitted
    /// again there, so no `execute` is issued once `close()` has begun and
    /// `close()` waits for one already running.
    pub async fn notify(&self, payload: Value) -> ClientResult<Value> {
        let inner = &self.inner;
        inner.context.lifecycle.admit(|| Ok(()))?;

        let lifecycle = Arc::clone(&inner.context.lifecycle);
        let gateway = Arc::clone(&inner.gateway);
        tokio::task::spawn_blocking(move || lifecycle.admit(|| gateway.execute_now(payload)))
            .await
            .map_err(|e| ClientError::TransportRejected(format!("execute task failed: {e}")))?
    }

    /// Stream of every notification.
    pub fn subscribe(&self) -> NotificationStream {
        self.subscribe_filtered(NotificationFilter::all())
    }

    /// Stream of notifications matching `filter`.
    pub fn subscribe_filtered(&self, filter: NotificationFilter) -> NotificationStream {
        self.inner.context.notifications.subscribe(filter)
    }

    /// Stop the receive loop and fail outstanding requests with
    /// `ClientClosed`.
    ///
    /// Idempotent. Returns once the loop has exited, which takes at most
    /// one poll window.
    pub async fn close(&self) {
        let inner = &self.inner;
        let _closing = inner.close_lock.lock().await;
        if !inner.context.lifecycle.begin_close() {
            return;
        }

        info!(client = %inner.config.name, "Closing client");
        let _ = inner.shutdown.send(true);

        let loop_exit = inner.loop_exit.lock().take();
        let exit = match loop_exit {
            Some(exit) => exit.await.unwrap_or(LoopExit::Panicked),
            None => LoopExit::Shutdown,
        };

        let cancelled = inner.context.pending.cancel_all(ClientError::ClientClosed);
        inner.context.notifications.close();
        inner.context.lifecycle.finish_close();

        info!(
            client = %inner.config.name,
            cancelled,
            exit = ?exit,
            "Client closed"
        );
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ClientState {
        self.inner.context.lifecycle.state()
    }

    /// Requests currently awaiting a response
    pub fn pending_count(&self) -> usize {
        self.inner.context.pending.len()
    }

    /// Snapshot of the client's counters.
    pub fn stats(&self) -> ClientStats {
        let context = &self.inner.context;
        let pending = context.pending.stats();
        let loop_stats = &context.stats;

        ClientStats {
            pending: context.pending.len(),
            registered: pending.total_registered.load(Ordering::Relaxed),
            completed: pending.total_completed.load(Ordering::Relaxed),
            timed_out: pending.total_timeouts.load(Ordering::Relaxed),
            cancelled: pending.total_cancelled.load(Ordering::Relaxed),
            orphaned: pending.total_orphaned.load(Ordering::Relaxed),
            discarded: pending.total_discarded.load(Ordering::Relaxed),
            received: loop_stats.total_received.load(Ordering::Relaxed),
            malformed: loop_stats.total_malformed.load(Ordering::Relaxed),
            receive_errors: loop_stats.total_receive_errors.load(Ordering::Relaxed),
            notifications: context.notifications.published(),
            dropped_notifications: context.notifications.dropped(),
            next_id: self.inner.allocator.peek().as_u64(),
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if !self.context.lifecycle.begin_close() {
            return;
        }
        let _ = self.shutdown.send(true);
        let cancelled = self.context.pending.cancel_all(ClientError::ClientClosed);
        self.context.notifications.close();
        self.context.lifecycle.finish_close();
        debug!(client = %self.config.name, cancelled, "Client dropped without close");
    }
}

/// Discards a pending entry if the request future is dropped mid-flight.
struct PendingGuard<'a> {
    pending: &'a PendingTable,
    id: CorrelationId,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(pending: &'a PendingTable, id: CorrelationId) -> Self {
        Self {
            pending,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.pending.discard(self.id) {
            debug!(correlation_id = %self.id, "Request abandoned by caller");
        }
    }
}

#[async_trait]
impl BridgeApi for TlClient {
    async fn request(&self, payload: Value, timeout: Option<Duration>) -> ClientResult<Value> {
        TlClient::request(self, payload, timeout).await
    }

    async fn notify(&self, payload: Value) -> ClientResult<Value> {
        TlClient::notify(self, payload).await
    }

    fn subscribe_filtered(&self, filter: NotificationFilter) -> NotificationStream {
        TlClient::subscribe_filtered(self, filter)
    }

    async fn close(&self) {
        TlClient::close(self).await
    }
}
