//! Correlation ID for request tracking.
//!
//! Ids are drawn from a per-client 64-bit counter. At one request per
//! nanosecond the counter lasts several centuries, so ids are never reused
//! within the lifetime of a client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation ID stamped onto every outgoing request.
///
/// The transport echoes it back on the matching response, which is how the
/// receive loop finds the waiting caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wrap a raw counter value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw counter value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse from the echoed wire value.
    ///
    /// Accepts a JSON number or a decimal string, since transports that pass
    /// 64-bit integers through text layers commonly turn them into strings.
    pub fn from_wire(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().map(Self),
            serde_json::Value::String(s) => s.trim().parse::<u64>().ok().map(Self),
            _ => None,
        }
    }

    /// Encode for stamping onto a request.
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::Value::from(self.0)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CorrelationId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<CorrelationId> for u64 {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

/// Hands out monotonically increasing correlation ids.
///
/// Lock-free; safe to share between any number of callers.
#[derive(Debug)]
pub struct IdentityAllocator {
    next: AtomicU64,
}

impl IdentityAllocator {
    /// Create an allocator whose first id is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create an allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Allocate the next id.
    pub fn next(&self) -> CorrelationId {
        CorrelationId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The id the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> CorrelationId {
        CorrelationId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
