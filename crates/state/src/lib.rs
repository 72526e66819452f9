//! Trait abstraction for the replicated key/value store backing the
//! notification log, silence store, and aggregation group recovery.

pub mod error;
pub mod key;
pub mod store;

pub use error::StateError;
pub use key::{KeyKind, StateKey};
pub use store::{run_store_conformance_tests, CasResult, StateStore};
