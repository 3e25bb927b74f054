//! Hexagonal ports.
//!
//! - `inbound`: what callers can ask of the client
//! - `outbound`: what the client needs from the native transport

pub mod inbound;
pub mod outbound;

pub use inbound::BridgeApi;
pub use outbound::{NativeTransport, RawJsonTransport, TransportFault};
