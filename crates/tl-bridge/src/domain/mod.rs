//! Domain types for the correlation layer.
//!
//! Pure data and bookkeeping; no threads and no transport calls.

pub mod config;
pub mod correlation;
pub mod error;
pub mod message;
pub mod pending;

// Re-exports for convenience
pub use config::{ClientConfig, ConfigError, WireConfig};
pub use correlation::{CorrelationId, IdentityAllocator};
pub use error::{ClientError, ClientResult, RemoteError, StartError};
pub use message::{InboundMessage, Notification};
pub use pending::{PendingStats, PendingTable};
