use std::sync::Arc;

use chrono::{DateTime, Utc};
use relaymux_core::{Labels, Matcher, Silence, SilenceState};
use relaymux_state::{KeyKind, StateKey, StateStore};
use uuid::Uuid;

use crate::error::SilenceError;

/// Retention applied to an expired silence before [`SilenceStore::gc`]
/// reclaims it -- long enough that a UI listing "recently expired"
/// silences still has something to show.
const DEFAULT_RETENTION: chrono::Duration = chrono::Duration::hours(120);

/// Create/query/expire silences, backed by a [`StateStore`].
pub struct SilenceStore {
    state: Arc<dyn StateStore>,
}

impl SilenceStore {
    #[must_use]
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self { state }
    }

    fn state_key(id: Uuid) -> StateKey {
        StateKey::new(KeyKind::Silence, id.to_string())
    }

    /// # Errors
    ///
    /// Returns [`SilenceError::Core`] if the matchers or time range are
    /// invalid, or [`SilenceError::State`] on a backend failure.
    pub async fn create(
        &self,
        matchers: Vec<Matcher>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        created_by: impl Into<String>,
        comment: impl Into<String>,
    ) -> Result<Silence, SilenceError> {
        let silence = Silence::new(matchers, starts_at, ends_at, created_by, comment)?;
        self.put(&silence).await?;
        Ok(silence)
    }

    /// Replace an existing silence's content while keeping its id,
    /// bumping `updated_at` so the new version wins any replicated merge.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::NotFound`] if `id` doesn't exist.
    pub async fn update(
        &self,
        id: Uuid,
        matchers: Vec<Matcher>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        created_by: impl Into<String>,
        comment: impl Into<String>,
    ) -> Result<Silence, SilenceError> {
        self.get(id).await?;
        let mut silence = Silence::new(matchers, starts_at, ends_at, created_by, comment)?;
        silence.id = id;
        self.put(&silence).await?;
        Ok(silence)
    }

    /// Expire a silence immediately by pulling `ends_at` back to now, if
    /// it isn't already expired.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::NotFound`] if `id` doesn't exist.
    pub async fn expire(&self, id: Uuid) -> Result<Silence, SilenceError> {
        let mut silence = self.get(id).await?;
        let now = Utc::now();
        if silence.state_at(now) != SilenceState::Expired {
            silence.ends_at = silence.ends_at.min(now);
            silence.updated_at = now;
            self.put(&silence).await?;
        }
        Ok(silence)
    }

    /// # Errors
    ///
    /// Returns [`SilenceError::NotFound`] if `id` doesn't exist.
    pub async fn get(&self, id: Uuid) -> Result<Silence, SilenceError> {
        let raw = self
            .state
            .get(&Self::state_key(id))
            .await?
            .ok_or_else(|| SilenceError::NotFound(id.to_string()))?;
        decode(&raw)
    }

    /// Every silence currently stored, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::State`] on a backend failure.
    pub async fn list(&self) -> Result<Vec<Silence>, SilenceError> {
        let raw = self.state.scan_keys(KeyKind::Silence, None).await?;
        raw.iter().map(|(_, v)| decode(v)).collect()
    }

    /// Every silence currently stored, for the periodic durable snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::State`] on a backend failure.
    pub async fn snapshot(&self) -> Result<Vec<Silence>, SilenceError> {
        self.list().await
    }

    /// Load silences produced by [`Self::snapshot`]. Meant to run once at
    /// startup, before any request handler can observe a partially
    /// restored store.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::State`] on a backend failure.
    pub async fn restore(&self, silences: Vec<Silence>) -> Result<(), SilenceError> {
        for silence in silences {
            self.put(&silence).await?;
        }
        Ok(())
    }

    /// Silences currently active (not pending, not expired) that match
    /// `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::State`] on a backend failure.
    pub async fn matching(&self, labels: &Labels, now: DateTime<Utc>) -> Result<Vec<Silence>, SilenceError> {
        let all = self.list().await?;
        Ok(all
            .into_iter()
            .filter(|s| s.state_at(now) == SilenceState::Active && s.matches(labels))
            .collect())
    }

    /// Apply a version of a silence received from a peer (or written
    /// locally), keeping whichever of the existing and incoming versions
    /// has the greater `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::State`] on a backend failure.
    pub async fn merge_in(&self, incoming: Silence) -> Result<Silence, SilenceError> {
        let existing = match self.get(incoming.id).await {
            Ok(existing) => Some(existing),
            Err(SilenceError::NotFound(_)) => None,
            Err(other) => return Err(other),
        };

        let winner = match existing {
            Some(existing) if existing.updated_at > incoming.updated_at => existing,
            _ => incoming,
        };
        self.put(&winner).await?;
        Ok(winner)
    }

    async fn put(&self, silence: &Silence) -> Result<(), SilenceError> {
        let encoded = serde_json::to_string(silence).map_err(|e| SilenceError::Corruption(e.to_string()))?;
        let key = Self::state_key(silence.id);
        self.state.set(&key, &encoded, None).await?;
        let expires_at = (silence.ends_at + DEFAULT_RETENTION).timestamp_millis();
        self.state.index_timeout(&key, expires_at).await?;
        Ok(())
    }

    /// Remove silences past their retention window. Returns the number
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::State`] on a backend failure.
    pub async fn gc(&self, now: DateTime<Utc>) -> Result<usize, SilenceError> {
        let expired = self.state.get_expired(now.timestamp_millis()).await?;
        let mut removed = 0;
        for canonical in &expired {
            let Some((kind, id)) = canonical.split_once(':') else {
                continue;
            };
            if kind != KeyKind::Silence.as_str() {
                continue;
            }
            let key = StateKey::new(KeyKind::Silence, id);
            if self.state.delete(&key).await? {
                removed += 1;
            }
            self.state.remove_timeout_index(&key).await?;
            tracing::debug!(key = %canonical, "expired silence past retention");
        }
        Ok(removed)
    }
}

fn decode(raw: &str) -> Result<Silence, SilenceError> {
    serde_json::from_str(raw).map_err(|e| SilenceError::Corruption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaymux_state_memory::MemoryStateStore;

    fn store() -> SilenceStore {
        SilenceStore::new(Arc::new(MemoryStateStore::new()))
    }

    fn matchers() -> Vec<Matcher> {
        vec![Matcher::equal("env", "staging")]
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = store();
        let now = Utc::now();
        let created = store
            .create(matchers(), now, now + chrono::Duration::hours(1), "op", "maint")
            .await
            .unwrap();
        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.comment, "maint");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = store();
        assert!(matches!(store.get(Uuid::new_v4()).await, Err(SilenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn expire_pulls_ends_at_to_now() {
        let store = store();
        let now = Utc::now();
        let created = store
            .create(matchers(), now, now + chrono::Duration::hours(1), "op", "")
            .await
            .unwrap();
        let expired = store.expire(created.id).await.unwrap();
        assert_eq!(expired.state_at(Utc::now()), SilenceState::Expired);
    }

    #[tokio::test]
    async fn matching_only_returns_active_silences_that_match() {
        let store = store();
        let now = Utc::now();
        store
            .create(matchers(), now, now + chrono::Duration::hours(1), "op", "")
            .await
            .unwrap();
        store
            .create(
                vec![Matcher::equal("env", "prod")],
                now,
                now + chrono::Duration::hours(1),
                "op",
                "",
            )
            .await
            .unwrap();
        store
            .create(
                matchers(),
                now + chrono::Duration::hours(2),
                now + chrono::Duration::hours(3),
                "op",
                "",
            )
            .await
            .unwrap();

        let labels = Labels::from_pairs([("env", "staging")]);
        let hits = store.matching(&labels, now).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn merge_keeps_most_recently_updated() {
        let store = store();
        let now = Utc::now();
        let original = store
            .create(matchers(), now, now + chrono::Duration::hours(1), "op", "v1")
            .await
            .unwrap();

        let mut stale = original.clone();
        stale.comment = "stale-edit".into();
        stale.updated_at = original.updated_at - chrono::Duration::seconds(10);
        store.merge_in(stale).await.unwrap();

        let fetched = store.get(original.id).await.unwrap();
        assert_eq!(fetched.comment, "v1");
    }

    #[tokio::test]
    async fn snapshot_then_restore_round_trips() {
        let store = store();
        let now = Utc::now();
        let created = store
            .create(matchers(), now, now + chrono::Duration::hours(1), "op", "maint")
            .await
            .unwrap();

        let dump = store.snapshot().await.unwrap();
        assert_eq!(dump.len(), 1);

        let fresh = SilenceStore::new(Arc::new(MemoryStateStore::new()));
        fresh.restore(dump).await.unwrap();

        let fetched = fresh.get(created.id).await.unwrap();
        assert_eq!(fetched.comment, "maint");
    }
}
