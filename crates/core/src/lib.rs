//! Core data types shared across RelayMux's subsystem crates: alerts,
//! labels, matchers, routes, silences, and notification log entries.

pub mod alert;
pub mod duration_format;
pub mod error;
pub mod inhibit;
pub mod labels;
pub mod matcher;
pub mod nflog;
pub mod route;
pub mod silence;
pub mod time_interval;
pub mod types;

pub use alert::{Alert, AlertStatus};
pub use error::CoreError;
pub use inhibit::InhibitRule;
pub use labels::Labels;
pub use matcher::Matcher;
pub use nflog::{NflogEntry, NflogKey};
pub use route::{group_key, Route, RouteConfig};
pub use silence::{Silence, SilenceState};
pub use time_interval::TimeInterval;
pub use types::{Fingerprint, GroupKey, ReceiverName, RouteId};
