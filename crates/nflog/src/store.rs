use std::sync::Arc;

use chrono::{DateTime, Utc};

use relaymux_core::nflog::{NflogEntry, NflogKey};
use relaymux_core::{GroupKey, ReceiverName};
use relaymux_state::{KeyKind, StateKey, StateStore};

use crate::error::NflogError;

/// Wraps a [`StateStore`] with the notification log's merge semantics:
/// the entry with the greater `sent_at` timestamp always wins (ties
/// broken by the greater `expires_at`).
pub struct NflogStore {
    state: Arc<dyn StateStore>,
}

impl NflogStore {
    #[must_use]
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self { state }
    }

    fn state_key(key: &NflogKey) -> StateKey {
        StateKey::new(KeyKind::Nflog, format!("{}:{}", key.receiver, key.group_key))
    }

    /// Record a notification send for `key`. Merges with any existing
    /// entry per the monotonicity rule and returns the entry that was
    /// actually stored (the caller broadcasts this to peers).
    ///
    /// `retention` controls how long the entry is kept before [`Self::gc`]
    /// may reclaim it -- this should be at least the receiver's
    /// `repeat_interval` so a restart doesn't forget a recent send.
    ///
    /// # Errors
    ///
    /// Returns [`NflogError::State`] on a backend failure.
    pub async fn log(
        &self,
        key: &NflogKey,
        firing_fingerprints: Vec<String>,
        resolved_fingerprints: Vec<String>,
        retention: chrono::Duration,
    ) -> Result<NflogEntry, NflogError> {
        let incoming = NflogEntry::new(firing_fingerprints, resolved_fingerprints, retention);
        self.merge_in(key, incoming, retention).await
    }

    /// Apply an entry received from a peer (or from a local write),
    /// keeping whichever of the existing and incoming entries wins under
    /// the monotonicity rule.
    ///
    /// # Errors
    ///
    /// Returns [`NflogError::State`] on a backend failure.
    pub async fn merge_in(
        &self,
        key: &NflogKey,
        incoming: NflogEntry,
        retention: chrono::Duration,
    ) -> Result<NflogEntry, NflogError> {
        let state_key = Self::state_key(key);
        let existing = self.load(&state_key).await?;

        let winner = match existing {
            Some(existing) if !dominates(&incoming, &existing) => existing,
            _ => incoming,
        };

        let encoded = serde_json::to_string(&winner).map_err(|e| NflogError::Corruption(e.to_string()))?;
        self.state.set(&state_key, &encoded, None).await?;
        // Local GC never reclaims an entry sooner than this node's own
        // retention policy, even if the winning entry came from a peer
        // whose own `expires_at` (baked in at creation) is earlier.
        let local_floor = winner.timestamp + retention;
        self.state.index_timeout(&state_key, winner.expires_at.max(local_floor).timestamp_millis()).await?;
        Ok(winner)
    }

    /// # Errors
    ///
    /// Returns [`NflogError::NotFound`] if no entry exists for `key`.
    pub async fn query(&self, key: &NflogKey) -> Result<NflogEntry, NflogError> {
        self.load(&Self::state_key(key))
            .await?
            .ok_or_else(|| NflogError::NotFound(key.group_key.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`NflogError::NotFound`] if no entry exists for this
    /// `(receiver, group-key)` pair.
    pub async fn query_by_parts(
        &self,
        receiver: &ReceiverName,
        group_key: &GroupKey,
    ) -> Result<NflogEntry, NflogError> {
        self.query(&NflogKey::new(receiver.clone(), group_key.clone())).await
    }

    async fn load(&self, state_key: &StateKey) -> Result<Option<NflogEntry>, NflogError> {
        match self.state.get(state_key).await? {
            Some(raw) => {
                let entry = serde_json::from_str(&raw).map_err(|e| NflogError::Corruption(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Remove entries whose `expires_at` (tracked via the timeout index)
    /// has passed. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`NflogError::State`] on a backend failure.
    pub async fn gc(&self, now: DateTime<Utc>) -> Result<usize, NflogError> {
        let expired = self.state.get_expired(now.timestamp_millis()).await?;
        let mut removed = 0;
        for canonical in &expired {
            let Some((kind, id)) = canonical.split_once(':') else {
                continue;
            };
            if kind != KeyKind::Nflog.as_str() {
                continue;
            }
            let state_key = StateKey::new(KeyKind::Nflog, id);
            if self.state.delete(&state_key).await? {
                removed += 1;
            }
            self.state.remove_timeout_index(&state_key).await?;
            tracing::debug!(key = %canonical, "expired nflog entry");
        }
        Ok(removed)
    }

    /// Serialize every currently-stored entry, for the periodic durable
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`NflogError::State`] on a backend failure.
    pub async fn snapshot(&self) -> Result<Vec<(String, NflogEntry)>, NflogError> {
        let raw = self.state.scan_keys(KeyKind::Nflog, None).await?;
        raw.into_iter()
            .map(|(k, v)| {
                serde_json::from_str(&v)
                    .map(|entry| (k, entry))
                    .map_err(|e| NflogError::Corruption(e.to_string()))
            })
            .collect()
    }

    /// Load entries produced by [`Self::snapshot`], re-arming the timeout
    /// index for each so a restart still reclaims them on schedule. Meant
    /// to run once at startup before the dispatcher attaches.
    ///
    /// # Errors
    ///
    /// Returns [`NflogError::State`] on a backend failure.
    pub async fn restore(&self, entries: Vec<(String, NflogEntry)>) -> Result<(), NflogError> {
        for (canonical, entry) in entries {
            let Some((kind, id)) = canonical.split_once(':') else {
                continue;
            };
            if kind != KeyKind::Nflog.as_str() {
                continue;
            }
            let state_key = StateKey::new(KeyKind::Nflog, id);
            let encoded = serde_json::to_string(&entry).map_err(|e| NflogError::Corruption(e.to_string()))?;
            self.state.set(&state_key, &encoded, None).await?;
            self.state.index_timeout(&state_key, entry.expires_at.timestamp_millis()).await?;
        }
        Ok(())
    }
}

/// Whether `candidate` should replace `existing` under the merge rule:
/// greater `timestamp` wins; on a tie, greater `expires_at` wins (a
/// deterministic, order-independent tiebreak, matching the silence/nflog
/// invariant that merge order must not affect the outcome).
fn dominates(candidate: &NflogEntry, existing: &NflogEntry) -> bool {
    match candidate.timestamp.cmp(&existing.timestamp) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.expires_at >= existing.expires_at,
    }
}
