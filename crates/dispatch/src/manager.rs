use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use relaymux_core::{Alert, GroupKey, RouteConfig, RouteId};
use relaymux_state::{KeyKind, StateKey, StateStore};
use tokio::sync::RwLock;

use crate::error::DispatchError;
use crate::group::{composite_key, AggregationGroup, GroupState};

/// Tracks every active aggregation group and decides when each is due
/// for a flush, per the route's `group_wait`/`group_interval` settings.
#[derive(Default)]
pub struct Dispatcher {
    groups: Arc<RwLock<HashMap<String, AggregationGroup>>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repopulate the pending-group index from the state store after a
    /// restart. Alert membership is not recovered here -- it rebuilds
    /// naturally as the alert provider replays its current state into
    /// [`Dispatcher::add_alert`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::State`] on a backend failure.
    pub async fn recover(&self, state: &dyn StateStore) -> Result<usize, DispatchError> {
        let entries = state.scan_keys(KeyKind::PendingGroups, None).await?;
        let mut groups = self.groups.write().await;
        let mut recovered = 0;

        for (key, value) in entries {
            let Ok(meta) = serde_json::from_str::<PendingGroupMeta>(&value) else {
                tracing::warn!(key = %key, "failed to parse pending group metadata");
                continue;
            };
            if groups.contains_key(&meta.composite_key) {
                continue;
            }
            let group = AggregationGroup::new(meta.route_id.clone(), meta.group_key.clone(), meta.flush_at);
            groups.insert(meta.composite_key.clone(), group);
            recovered += 1;
            tracing::info!(key = %meta.composite_key, "recovered pending group from state store");
        }

        Ok(recovered)
    }

    /// Fold `alert` into the group addressed by `route` and the alert's
    /// projected `group_key`. A brand new group is armed to flush after
    /// `route.group_wait`; an existing, not-yet-flushed group keeps its
    /// current timer (Alertmanager's `group_wait` only delays the very
    /// first notification of a group).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::State`] on a backend failure.
    pub async fn add_alert(
        &self,
        route: &RouteConfig,
        group_key: GroupKey,
        alert: Alert,
        state: &dyn StateStore,
    ) -> Result<(String, usize, DateTime<Utc>), DispatchError> {
        let key = composite_key(&route.id, &group_key);
        let flush_at = {
            let mut groups = self.groups.write().await;
            let group = groups.entry(key.clone()).or_insert_with(|| {
                let flush_at = Utc::now() + route.group_wait;
                AggregationGroup::new(route.id.clone(), group_key.clone(), flush_at)
            });
            group.upsert(alert);
            group.flush_at
        };

        self.persist(&key, state).await?;
        let size = self.groups.read().await.get(&key).map_or(0, AggregationGroup::size);
        Ok((key, size, flush_at))
    }

    async fn persist(&self, key: &str, state: &dyn StateStore) -> Result<(), DispatchError> {
        let groups = self.groups.read().await;
        let Some(group) = groups.get(key) else {
            return Ok(());
        };
        let meta = PendingGroupMeta {
            composite_key: key.to_string(),
            route_id: group.route_id.clone(),
            group_key: group.group_key.clone(),
            flush_at: group.flush_at,
        };
        let encoded = serde_json::to_string(&meta).map_err(|e| DispatchError::Corruption(e.to_string()))?;
        state
            .set(&StateKey::new(KeyKind::Group, key), &encoded, None)
            .await?;
        state
            .set(&StateKey::new(KeyKind::PendingGroups, key), &encoded, None)
            .await?;
        Ok(())
    }

    /// Groups whose flush timer is due.
    pub async fn ready_groups(&self, now: DateTime<Utc>) -> Vec<String> {
        self.groups
            .read()
            .await
            .iter()
            .filter(|(_, g)| g.is_ready(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Snapshot a group's current alerts without mutating its state.
    pub async fn peek(&self, key: &str) -> Option<AggregationGroup> {
        self.groups.read().await.get(key).cloned()
    }

    /// Mark a group as having an in-flight flush, returning the snapshot
    /// to hand to the notification pipeline. Returns `None` if the group
    /// is missing or already flushing.
    pub async fn begin_flush(&self, key: &str) -> Option<AggregationGroup> {
        let mut groups = self.groups.write().await;
        let group = groups.get_mut(key)?;
        if group.state != GroupState::Pending {
            return None;
        }
        group.state = GroupState::Flushing;
        Some(group.clone())
    }

    /// Complete a flush: clear resolved-and-reported alerts, and either
    /// rearm the group for `group_interval` or drop it if empty.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::State`] on a backend failure.
    pub async fn complete_flush(
        &self,
        key: &str,
        group_interval: chrono::Duration,
        reported: &[relaymux_core::Fingerprint],
        state: &dyn StateStore,
    ) -> Result<(), DispatchError> {
        let still_has_alerts = {
            let mut groups = self.groups.write().await;
            let Some(group) = groups.get_mut(key) else {
                return Ok(());
            };
            for fp in reported {
                if group.alerts.get(fp).is_some_and(relaymux_core::Alert::resolved) {
                    group.alerts.remove(fp);
                }
            }
            let now = Utc::now();
            group.last_flush_at = Some(now);
            if group.alerts.is_empty() {
                false
            } else {
                group.flush_at = now + group_interval;
                group.state = GroupState::Pending;
                true
            }
        };

        if still_has_alerts {
            self.persist(key, state).await
        } else {
            self.remove(key, state).await
        }
    }

    /// Drop a group entirely, from memory and the state store.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::State`] on a backend failure.
    pub async fn remove(&self, key: &str, state: &dyn StateStore) -> Result<(), DispatchError> {
        self.groups.write().await.remove(key);
        state.delete(&StateKey::new(KeyKind::Group, key)).await?;
        state.delete(&StateKey::new(KeyKind::PendingGroups, key)).await?;
        Ok(())
    }

    pub async fn active_group_count(&self) -> usize {
        self.groups.read().await.len()
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct PendingGroupMeta {
    composite_key: String,
    route_id: RouteId,
    group_key: GroupKey,
    flush_at: DateTime<Utc>,
}
