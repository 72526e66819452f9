//! Declarative configuration document: global defaults, the route tree,
//! inhibition rules, receivers, time intervals, and templates, loaded
//! from a single TOML file and validated before use.

pub mod document;
pub mod error;
pub mod global;
pub mod loader;
pub mod receivers;
pub mod templates;

pub use document::RelayConfig;
pub use error::ConfigError;
pub use global::GlobalConfig;
pub use loader::load;
pub use receivers::{IntegrationConfig, ReceiverConfig};
pub use templates::TemplatesConfig;
