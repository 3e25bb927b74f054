//! Client lifecycle.
//!
//! ```text
//! [ACTIVE] ──close()──→ [CLOSING] ──loop joined, table drained──→ [CLOSED]
//!     │                     ↑
//!     └──transport lost──→ [FAULTED] ──close()──┘
//! ```
//!
//! New work is admitted under the read lock; transitions take the write
//! lock. Once a transition out of `Active` returns, no new pending entry
//! can appear, which is what lets `cancel_all` drain the table for good.

use crate::domain::error::{ClientError, ClientResult};
use parking_lot::RwLock;

/// Observable client state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Accepting requests, receive loop running
    Active,
    /// `close()` in progress
    Closing,
    /// Receive loop stopped, table empty
    Closed,
    /// Receive loop stopped on a permanent transport failure
    Faulted,
}

struct Inner {
    state: ClientState,
    fault: Option<String>,
}

pub struct Lifecycle {
    inner: RwLock<Inner>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: ClientState::Active,
                fault: None,
            }),
        }
    }

    pub fn state(&self) -> ClientState {
        self.inner.read().state
    }

    /// Reason recorded by [`fault`](Self::fault), if any.
    pub fn fault_reason(&self) -> Option<String> {
        self.inner.read().fault.clone()
    }

    /// Run `work` if the client is active, holding off state transitions
    /// until it returns. `work` must not block on anything but the
    /// transport's outbound call.
    pub fn admit<T>(&self, work: impl FnOnce() -> ClientResult<T>) -> ClientResult<T> {
        let guard = self.inner.read();
        match guard.state {
            ClientState::Active => work(),
            ClientState::Closing | ClientState::Closed => Err(ClientError::ClientClosed),
            ClientState::Faulted => Err(ClientError::TransportClosed(
                guard.fault.clone().unwrap_or_default(),
            )),
        }
    }

    /// Move to `Faulted`. Only an active client can fault; returns whether
    /// the transition happened.
    pub fn fault(&self, reason: &str) -> bool {
        let mut guard = self.inner.write();
        if guard.state != ClientState::Active {
            return false;
        }
        guard.state = ClientState::Faulted;
        guard.fault = Some(reason.to_string());
        true
    }

    /// Move to `Closing`. Returns false if already closing or closed.
    pub fn begin_close(&self) -> bool {
        let mut guard = self.inner.write();
        match guard.state {
            ClientState::Active | ClientState::Faulted => {
                guard.state = ClientState::Closing;
                true
            }
            ClientState::Closing | ClientState::Closed => false,
        }
    }

    pub fn finish_close(&self) {
        self.inner.write().state = ClientState::Closed;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
