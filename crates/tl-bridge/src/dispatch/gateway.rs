//! Outbound side of the native transport.
//!
//! A single mutex serializes `send` and `execute`; id allocation and table
//! bookkeeping happen outside it. Inbound `receive` is not guarded here and
//! runs concurrently on the receive loop thread.

use crate::domain::config::WireConfig;
use crate::domain::correlation::{CorrelationId, IdentityAllocator};
use crate::domain::error::{ClientError, ClientResult};
use crate::domain::pending::{CompletionReceiver, PendingTable};
use crate::ports::outbound::{NativeTransport, TransportFault};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub struct TransportGateway {
    transport: Arc<dyn NativeTransport>,
    /// Serializes outbound native calls
    outbound: Mutex<()>,
    wire: WireConfig,
}

impl TransportGateway {
    pub fn new(transport: Arc<dyn NativeTransport>, wire: WireConfig) -> Self {
        Self {
            transport,
            outbound: Mutex::new(()),
            wire,
        }
    }

    /// Tag `payload` with a fresh id, register it, and hand it to the
    /// transport.
    ///
    /// The entry is registered before `send` so a fast response can never
    /// overtake its own registration. If `send` fails the entry is rolled
    /// back: on return the table holds exactly what it held before.
    pub fn submit(
        &self,
        payload: Value,
        allocator: &IdentityAllocator,
        pending: &PendingTable,
    ) -> ClientResult<(CorrelationId, CompletionReceiver)> {
        self.wire
            .validate_request(&payload)
            .map_err(ClientError::TransportRejected)?;

        let request_type = self.wire.type_of(&payload).to_string();
        let id = allocator.next();
        let request = self
            .wire
            .stamp(payload, id)
            .map_err(ClientError::TransportRejected)?;

        let (sender, receiver) = oneshot::channel();
        pending.register(id, &request_type, sender)?;

        let sent = {
            let _outbound = self.outbound.lock();
            self.transport.send(request)
        };

        if let Err(fault) = sent {
            pending.discard(id);
            warn!(
                correlation_id = %id,
                request_type = %request_type,
                error = %fault,
                "Transport rejected request"
            );
            return Err(fault_to_error(fault));
        }

        debug!(
            correlation_id = %id,
            request_type = %request_type,
            "Sent request"
        );
        Ok((id, receiver))
    }

    /// Run `payload` through the transport's synchronous `execute`.
    ///
    /// Touches neither the allocator nor the pending table. An error object
    /// in the result surfaces as [`ClientError::Remote`].
    pub fn execute_now(&self, payload: Value) -> ClientResult<Value> {
        self.wire
            .validate_request(&payload)
            .map_err(ClientError::TransportRejected)?;

        let request_type = self.wire.type_of(&payload).to_string();
        let result = {
            let _outbound = self.outbound.lock();
            self.transport.execute(payload)
        };

        let value = result.map_err(|fault| {
            warn!(request_type = %request_type, error = %fault, "Transport execute failed");
            fault_to_error(fault)
        })?;

        debug!(request_type = %request_type, "Executed request");
        self.wire.split_result(value).map_err(ClientError::Remote)
    }

    pub fn wire(&self) -> &WireConfig {
        &self.wire
    }
}

fn fault_to_error(fault: TransportFault) -> ClientError {
    match fault {
        TransportFault::Rejected(reason) => ClientError::TransportRejected(reason),
        TransportFault::Closed(reason) => ClientError::TransportClosed(reason),
    }
}
