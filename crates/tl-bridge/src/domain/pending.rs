//! Pending request table - the async-to-sync bridge.
//!
//! Maps correlation IDs to the completion handles of waiting callers.
//!
//! Flow:
//! 1. Gateway allocates a CorrelationId and calls `register()`
//! 2. Gateway sends the stamped request to the transport
//! 3. Receive loop gets the response and calls `resolve()`
//! 4. Caller awaits the completion or times out and calls `cancel()`
//!
//! Every entry leaves the table exactly once, through `resolve`, `cancel`,
//! `cancel_all` or `discard`. Each of those removes the entry before
//! touching its handle, so the handle is written at most once.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::{ClientError, ClientResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Sending half of a caller's completion handle.
pub type Completion = oneshot::Sender<ClientResult<serde_json::Value>>;

/// Receiving half of a caller's completion handle.
pub type CompletionReceiver = oneshot::Receiver<ClientResult<serde_json::Value>>;

/// A request waiting for its response
struct PendingEntry {
    /// Channel to deliver the outcome
    sender: Completion,
    /// When the request was registered
    submitted_at: Instant,
    /// Request type (for logging)
    request_type: String,
}

/// Counters for the pending table
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total entries registered
    pub total_registered: AtomicU64,
    /// Total entries resolved by a response
    pub total_completed: AtomicU64,
    /// Total entries cancelled because the caller's timeout elapsed
    pub total_timeouts: AtomicU64,
    /// Total entries cancelled for any other reason (close, transport loss)
    pub total_cancelled: AtomicU64,
    /// Total responses whose id had no entry
    pub total_orphaned: AtomicU64,
    /// Total entries removed without delivery (send rollback, dropped caller)
    pub total_discarded: AtomicU64,
}

/// Table of in-flight requests.
///
/// Backed by a sharded map: operations on one id are mutually exclusive,
/// and no lock is held across an `.await`.
#[derive(Default)]
pub struct PendingTable {
    entries: DashMap<CorrelationId, PendingEntry>,
    stats: PendingStats,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a completion handle under `id`.
    ///
    /// Fails with [`ClientError::DuplicateId`] if `id` is already pending.
    /// The allocator never hands out a live id, so this indicates a bug.
    pub fn register(
        &self,
        id: CorrelationId,
        request_type: &str,
        sender: Completion,
    ) -> ClientResult<()> {
        match self.entries.entry(id) {
            Entry::Occupied(_) => {
                error!(
                    correlation_id = %id,
                    request_type = request_type,
                    "Correlation id already pending; allocator invariant violated"
                );
                Err(ClientError::DuplicateId(id))
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    sender,
                    submitted_at: Instant::now(),
                    request_type: request_type.to_string(),
                });
                self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %id,
                    request_type = request_type,
                    "Registered pending request"
                );
                Ok(())
            }
        }
    }

    /// Complete the entry for `id` with `result`.
    ///
    /// An absent id is an orphan response (the caller timed out, was
    /// dropped, or the client closed). It is logged and counted, never
    /// raised. Returns true if an entry was found.
    pub fn resolve(&self, id: CorrelationId, result: ClientResult<serde_json::Value>) -> bool {
        let Some((_, entry)) = self.entries.remove(&id) else {
            self.stats.total_orphaned.fetch_add(1, Ordering::Relaxed);
            warn!(
                correlation_id = %id,
                "Orphan response for unknown or expired correlation id"
            );
            return false;
        };

        let elapsed = entry.submitted_at.elapsed();
        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        if entry.sender.send(result).is_err() {
            // Receiver went away between our remove and the send
            debug!(
                correlation_id = %id,
                request_type = %entry.request_type,
                "Pending request receiver dropped"
            );
        } else {
            debug!(
                correlation_id = %id,
                request_type = %entry.request_type,
                response_time_ms = elapsed.as_millis() as u64,
                "Completed pending request"
            );
        }
        true
    }

    /// Remove the entry for `id` and deliver `reason` to it.
    ///
    /// No-op if the entry was already resolved. Returns true if an entry
    /// was removed.
    pub fn cancel(&self, id: CorrelationId, reason: ClientError) -> bool {
        let Some((_, entry)) = self.entries.remove(&id) else {
            return false;
        };

        self.count_cancellation(&reason);
        debug!(
            correlation_id = %id,
            request_type = %entry.request_type,
            reason = %reason,
            "Cancelled pending request"
        );
        let _ = entry.sender.send(Err(reason));
        true
    }

    /// Remove every entry, delivering `reason` to each.
    ///
    /// Returns the number of entries cancelled.
    pub fn cancel_all(&self, reason: ClientError) -> usize {
        let ids: Vec<CorrelationId> = self.entries.iter().map(|e| *e.key()).collect();

        let mut cancelled = 0;
        for id in ids {
            if let Some((_, entry)) = self.entries.remove(&id) {
                self.count_cancellation(&reason);
                let _ = entry.sender.send(Err(reason.clone()));
                cancelled += 1;
            }
        }

        if cancelled > 0 {
            debug!(cancelled = cancelled, reason = %reason, "Cancelled all pending requests");
        }
        cancelled
    }

    /// Remove the entry for `id` without delivering anything.
    pub fn discard(&self, id: CorrelationId) -> bool {
        if self.entries.remove(&id).is_some() {
            self.stats.total_discarded.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %id, "Discarded pending request");
            true
        } else {
            false
        }
    }

    /// Number of requests currently pending
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a correlation ID is pending
    pub fn contains(&self, id: CorrelationId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Ids of pending requests, sorted (for diagnostics)
    pub fn pending_ids(&self) -> Vec<CorrelationId> {
        let mut ids: Vec<_> = self.entries.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    fn count_cancellation(&self, reason: &ClientError) {
        let counter = match reason {
            ClientError::TimedOut { .. } => &self.stats.total_timeouts,
            _ => &self.stats.total_cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
