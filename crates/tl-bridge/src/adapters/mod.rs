//! Outbound adapters.
//!
//! - `json`: text-level native transports
//! - `sim`: in-memory transport for tests and local runs

pub mod json;
pub mod sim;

pub use json::JsonTransport;
pub use sim::SimulatedTransport;
