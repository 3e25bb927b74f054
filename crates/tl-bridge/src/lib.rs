// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! tl-bridge - Concurrent async client over a blocking, single-queue
//! native transport (tonlib-style JSON client).
//!
//! The native side offers three calls: `send` (enqueue), `receive`
//! (block up to a timeout for whatever comes next) and `execute`
//! (synchronous, uncorrelated). This crate tags every request with a
//! correlation id, routes each response back to the caller that issued
//! it, and fans everything else out as notifications.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        TlClient (facade)                          │
//! │   request()        notify()        subscribe()        close()     │
//! └─────┬─────────────────┬────────────────┬─────────────────┬───────┘
//!       │                 │                │                 │
//!  ┌────┴─────────────────┴──┐    ┌────────┴────────┐   ┌────┴─────┐
//!  │    TransportGateway      │    │ NotificationHub │   │ shutdown │
//!  │ (send/execute, 1 mutex)  │    └────────▲────────┘   └────┬─────┘
//!  └────┬────────────┬───────┘              │                 │
//!       │ register   │ send                 │ publish         │
//!  ┌────┴────────┐   │            ┌─────────┴─────────────────┴──┐
//!  │PendingTable │◄──┼────resolve─┤   ReceiveLoop (OS thread)    │
//!  └─────────────┘   │            └─────────────▲────────────────┘
//!                    ▼                          │ receive(timeout)
//!            ┌──────────────────────────────────┴──┐
//!            │          NativeTransport             │
//!            └──────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tl_bridge::{ClientConfig, TlClient};
//!
//! let client = TlClient::new(transport, ClientConfig::from_env())?;
//! let info = client.request(json!({"@type": "getMasterchainInfo"}), None).await?;
//! client.close().await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod dispatch;
pub mod domain;
pub mod ports;
pub mod service;
pub mod telemetry;

// Re-exports
pub use adapters::{JsonTransport, SimulatedTransport};
pub use dispatch::{ClientState, NotificationFilter, NotificationStream};
pub use domain::{
    ClientConfig, ClientError, ClientResult, ConfigError, CorrelationId, IdentityAllocator,
    Notification, RemoteError, StartError, WireConfig,
};
pub use ports::{BridgeApi, NativeTransport, RawJsonTransport, TransportFault};
pub use service::{ClientStats, TlClient};
pub use telemetry::{init_tracing, LoggingConfig, TelemetryError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
