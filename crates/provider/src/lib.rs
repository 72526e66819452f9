//! The alert provider: ingestion, in-memory fingerprint map, subscriber
//! fan-out, and periodic GC of resolved alerts.

pub mod error;
pub mod provider;

pub use error::ProviderError;
pub use provider::{AlertProvider, ProviderEvent, Subscription};
