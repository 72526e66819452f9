use std::collections::HashMap;

use chrono::{DateTime, Utc};
use relaymux_core::{Alert, Fingerprint, GroupKey, RouteId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an [`AggregationGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    /// Has unflushed alerts and an armed flush timer.
    Pending,
    /// A flush is in flight; new alerts still accumulate but won't be
    /// handed out again until the in-flight flush completes.
    Flushing,
}

/// Alerts batched under one `(route, group-key)` pair, the unit the
/// notification pipeline schedules and dispatches as a whole.
#[derive(Debug, Clone)]
pub struct AggregationGroup {
    pub route_id: RouteId,
    pub group_key: GroupKey,
    pub alerts: HashMap<Fingerprint, Alert>,
    pub state: GroupState,
    pub flush_at: DateTime<Utc>,
    pub last_flush_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AggregationGroup {
    #[must_use]
    pub fn new(route_id: RouteId, group_key: GroupKey, flush_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            route_id,
            group_key,
            alerts: HashMap::new(),
            state: GroupState::Pending,
            flush_at,
            last_flush_at: None,
            created_at: now,
        }
    }

    pub fn upsert(&mut self, alert: Alert) {
        self.alerts.insert(alert.fingerprint(), alert);
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.alerts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    #[must_use]
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.state == GroupState::Pending && self.flush_at <= now
    }
}

/// Key used to index a group in the in-memory registry and in the state
/// store: a route's identity paired with the group key projected from
/// its `group_by` list. Two routes with identical `group_by` lists still
/// get independent groups, since they may notify different receivers.
#[must_use]
pub fn composite_key(route_id: &RouteId, group_key: &GroupKey) -> String {
    format!("{route_id}:{group_key}")
}
