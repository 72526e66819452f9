//! In-memory [`StateStore`] backed by a `tokio::sync::RwLock` over a
//! `HashMap`, with a `BTreeMap`-indexed timeout index for O(log N)
//! expiry scans.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use relaymux_state::{CasResult, KeyKind, StateError, StateKey, StateStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    version: u64,
    expires_at: Option<Instant>,
}

/// An in-process [`StateStore`]. Single-instance only: nothing here is
/// replicated, so a clustered deployment gossips mutations between peers
/// at the cluster layer while each peer keeps its own store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    /// Canonical key -> expiry epoch-ms, kept sorted by expiry for
    /// `get_expired`.
    timeouts: Arc<RwLock<BTreeMap<i64, Vec<String>>>>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry) -> bool {
        entry.expires_at.is_none_or(|at| at > Instant::now())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn check_and_set(
        &self,
        key: &StateKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StateError> {
        let mut entries = self.entries.write().await;
        let canonical = key.canonical();
        if let Some(existing) = entries.get(&canonical)
            && Self::is_live(existing)
        {
            return Ok(false);
        }
        entries.insert(
            canonical,
            Entry {
                value: value.to_string(),
                version: 1,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&key.canonical())
            .filter(|e| Self::is_live(e))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &StateKey, value: &str, ttl: Option<Duration>) -> Result<(), StateError> {
        let mut entries = self.entries.write().await;
        let canonical = key.canonical();
        let version = entries.get(&canonical).map_or(0, |e| e.version) + 1;
        entries.insert(
            canonical,
            Entry {
                value: value.to_string(),
                version,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &StateKey) -> Result<bool, StateError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&key.canonical()).is_some())
    }

    async fn compare_and_swap(
        &self,
        key: &StateKey,
        expected_version: u64,
        new_value: &str,
        ttl: Option<Duration>,
    ) -> Result<CasResult, StateError> {
        let mut entries = self.entries.write().await;
        let canonical = key.canonical();
        let current_version = entries.get(&canonical).map_or(0, |e| e.version);
        if current_version != expected_version {
            return Ok(CasResult::Conflict {
                current_value: entries.get(&canonical).map(|e| e.value.clone()),
                current_version,
            });
        }
        entries.insert(
            canonical,
            Entry {
                value: new_value.to_string(),
                version: current_version + 1,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(CasResult::Ok)
    }

    async fn scan_keys(
        &self,
        kind: KeyKind,
        prefix: Option<&str>,
    ) -> Result<Vec<(String, String)>, StateError> {
        let entries = self.entries.read().await;
        let kind_prefix = format!("{kind}:");
        Ok(entries
            .iter()
            .filter(|(k, v)| {
                k.starts_with(&kind_prefix)
                    && Self::is_live(v)
                    && prefix.is_none_or(|p| k[kind_prefix.len()..].starts_with(p))
            })
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect())
    }

    async fn index_timeout(&self, key: &StateKey, expires_at_ms: i64) -> Result<(), StateError> {
        let mut timeouts = self.timeouts.write().await;
        timeouts.entry(expires_at_ms).or_default().push(key.canonical());
        Ok(())
    }

    async fn remove_timeout_index(&self, key: &StateKey) -> Result<(), StateError> {
        let mut timeouts = self.timeouts.write().await;
        let canonical = key.canonical();
        timeouts.retain(|_, keys| {
            keys.retain(|k| k != &canonical);
            !keys.is_empty()
        });
        Ok(())
    }

    async fn get_expired(&self, now_ms: i64) -> Result<Vec<String>, StateError> {
        let timeouts = self.timeouts.read().await;
        Ok(timeouts
            .range(..=now_ms)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaymux_state::run_store_conformance_tests;

    #[tokio::test]
    async fn satisfies_store_conformance_suite() {
        let store = MemoryStateStore::new();
        run_store_conformance_tests(&store).await.unwrap();
    }

    #[tokio::test]
    async fn scan_keys_filters_by_kind_and_prefix() {
        let store = MemoryStateStore::new();
        store
            .set(&StateKey::new(KeyKind::Silence, "a-1"), "x", None)
            .await
            .unwrap();
        store
            .set(&StateKey::new(KeyKind::Silence, "b-1"), "y", None)
            .await
            .unwrap();
        store
            .set(&StateKey::new(KeyKind::Nflog, "a-1"), "z", None)
            .await
            .unwrap();

        let silences = store.scan_keys(KeyKind::Silence, None).await.unwrap();
        assert_eq!(silences.len(), 2);

        let filtered = store.scan_keys(KeyKind::Silence, Some("a-")).await.unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let store = MemoryStateStore::new();
        let key = StateKey::new(KeyKind::Silence, "short-lived");
        store.set(&key, "v", Some(Duration::from_millis(1))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn timeout_index_returns_expired_keys_in_order() {
        let store = MemoryStateStore::new();
        let a = StateKey::new(KeyKind::Group, "a");
        let b = StateKey::new(KeyKind::Group, "b");
        store.index_timeout(&a, 100).await.unwrap();
        store.index_timeout(&b, 200).await.unwrap();

        let expired = store.get_expired(150).await.unwrap();
        assert_eq!(expired, vec![a.canonical()]);

        store.remove_timeout_index(&a).await.unwrap();
        let expired = store.get_expired(1000).await.unwrap();
        assert_eq!(expired, vec![b.canonical()]);
    }
}
