use std::time::Duration;

use async_trait::async_trait;

use crate::error::StateError;
use crate::key::{KeyKind, StateKey};

/// Result of a [`StateStore::compare_and_swap`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasResult {
    Ok,
    Conflict { current_value: Option<String>, current_version: u64 },
}

/// Replicated key/value storage backing nflog, silences, and aggregation
/// group recovery.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// The in-memory implementation ([`relaymux_state_memory`]) is sufficient
/// for a single instance; a clustered deployment gossips mutations between
/// peers through the cluster layer rather than sharing a store directly --
/// each peer still owns its own `StateStore`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Set a value only if the key does not already exist. Returns `true`
    /// if this call created the key.
    async fn check_and_set(
        &self,
        key: &StateKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StateError>;

    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError>;

    /// Set a value unconditionally, overwriting any previous value.
    async fn set(&self, key: &StateKey, value: &str, ttl: Option<Duration>) -> Result<(), StateError>;

    /// Delete a key. Returns `true` if it existed.
    async fn delete(&self, key: &StateKey) -> Result<bool, StateError>;

    /// Update a value only if its current version matches `expected_version`.
    /// A fresh key starts at version 0.
    async fn compare_and_swap(
        &self,
        key: &StateKey,
        expected_version: u64,
        new_value: &str,
        ttl: Option<Duration>,
    ) -> Result<CasResult, StateError>;

    /// List every `(key, value)` pair of the given kind whose id starts
    /// with `prefix` (or every entry of that kind, if `prefix` is `None`).
    async fn scan_keys(
        &self,
        kind: KeyKind,
        prefix: Option<&str>,
    ) -> Result<Vec<(String, String)>, StateError>;

    /// Record `key` in the timeout index with an absolute expiry in epoch
    /// milliseconds, so [`StateStore::get_expired`] can find it without a
    /// full scan.
    async fn index_timeout(&self, key: &StateKey, expires_at_ms: i64) -> Result<(), StateError>;

    async fn remove_timeout_index(&self, key: &StateKey) -> Result<(), StateError>;

    /// Every canonical key string in the timeout index whose expiry is
    /// `<= now_ms`.
    async fn get_expired(&self, now_ms: i64) -> Result<Vec<String>, StateError>;
}

/// Runs the conformance suite every [`StateStore`] implementation must
/// satisfy. Backend test modules call this against a fresh instance.
///
/// # Errors
///
/// Returns the first [`StateError`] or assertion failure encountered.
pub async fn run_store_conformance_tests(store: &dyn StateStore) -> Result<(), StateError> {
    let key = StateKey::new(KeyKind::Silence, "conformance-missing");
    assert!(store.get(&key).await?.is_none());

    let key = StateKey::new(KeyKind::Silence, "conformance-set-get");
    store.set(&key, "hello", None).await?;
    assert_eq!(store.get(&key).await?.as_deref(), Some("hello"));

    let key = StateKey::new(KeyKind::Silence, "conformance-cas-new");
    assert!(store.check_and_set(&key, "v1", None).await?);
    assert!(!store.check_and_set(&key, "v2", None).await?);
    assert_eq!(store.get(&key).await?.as_deref(), Some("v1"));

    let key = StateKey::new(KeyKind::Silence, "conformance-delete");
    store.set(&key, "bye", None).await?;
    assert!(store.delete(&key).await?);
    assert!(store.get(&key).await?.is_none());
    assert!(!store.delete(&key).await?);

    let key = StateKey::new(KeyKind::Silence, "conformance-cas-version");
    store.set(&key, "initial", None).await?;
    let conflict = store.compare_and_swap(&key, 999, "updated", None).await?;
    assert!(matches!(conflict, CasResult::Conflict { .. }));
    let ok = store.compare_and_swap(&key, 1, "updated", None).await?;
    assert_eq!(ok, CasResult::Ok);
    assert_eq!(store.get(&key).await?.as_deref(), Some("updated"));

    Ok(())
}
