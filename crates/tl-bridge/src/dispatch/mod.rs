//! Runtime components between the facade and the native transport.
//!
//! - `gateway`: serialized outbound calls
//! - `receive_loop`: inbound polling and routing
//! - `notifications`: fan-out of uncorrelated messages
//! - `lifecycle`: client state transitions

pub mod gateway;
pub mod lifecycle;
pub mod notifications;
pub mod receive_loop;

pub use gateway::TransportGateway;
pub use lifecycle::{ClientState, Lifecycle};
pub use notifications::{NotificationFilter, NotificationHub, NotificationStream};
pub use receive_loop::{LoopContext, LoopExit, LoopStats, ReceiveLoop};
