//! The fixed stage chain a single `(route, group-key, receiver)` flush
//! traverses. Each stage either narrows the alert set, decides the whole
//! flush is a no-op, or (for the last two stages) actually talks to a
//! notifier and the notification log.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use relaymux_core::nflog::{NflogEntry, NflogKey};
use relaymux_core::route::RouteConfig;
use relaymux_core::time_interval::TimeInterval;
use relaymux_core::{Alert, Fingerprint};
use relaymux_inhibit::InhibitionEngine;
use relaymux_nflog::NflogStore;
use relaymux_notify::{DynNotifier, NotificationPayload};
use relaymux_silence::SilenceStore;

use crate::cluster::ClusterView;
use crate::error::PipelineError;
use crate::retry::RetryStrategy;

/// Result of muting an alert batch against inhibition, silences, and
/// time intervals: the alerts that still deserve a notification, plus
/// bookkeeping a caller might want to surface (matched silence ids).
pub struct MuteOutcome {
    pub eligible: Vec<Alert>,
    pub matched_silence_ids: Vec<uuid::Uuid>,
    /// Set when the whole batch is suppressed by a route-level mute or
    /// active-time-interval check, independent of any per-alert muting.
    pub route_muted: bool,
}

/// Stage 2+3: drop alerts inhibited by another firing alert, or covered
/// by an active silence. Alerts that survive both checks are eligible
/// for notification; the rest stay in the group (the dispatcher doesn't
/// evict them) but are excluded from this flush's payload.
pub async fn mute_alerts(
    alerts: Vec<Alert>,
    inhibitor: &InhibitionEngine,
    silences: &SilenceStore,
    now: DateTime<Utc>,
) -> Result<MuteOutcome, PipelineError> {
    let mut eligible = Vec::with_capacity(alerts.len());
    let mut matched_silence_ids = Vec::new();

    for alert in alerts {
        if alert.resolved() {
            eligible.push(alert);
            continue;
        }
        if inhibitor.is_inhibited(&alert) {
            continue;
        }
        let hits = silences.matching(&alert.labels, now).await?;
        if hits.is_empty() {
            eligible.push(alert);
        } else {
            matched_silence_ids.extend(hits.iter().map(|s| s.id));
        }
    }

    Ok(MuteOutcome { eligible, matched_silence_ids, route_muted: false })
}

/// Stage 4: a route whose `mute_time_intervals` contains a currently-
/// active interval, or whose `active_time_intervals` is non-empty and
/// none of them are currently active, mutes the entire flush -- this is
/// a route-level gate, not a per-alert one.
#[must_use]
pub fn route_time_muted(route: &RouteConfig, intervals: &HashMap<String, TimeInterval>, now: DateTime<Utc>) -> bool {
    let in_named = |name: &str| intervals.get(name).is_some_and(|interval| interval.contains(now));

    if route.mute_time_intervals.iter().any(|name| in_named(name)) {
        return true;
    }
    if !route.active_time_intervals.is_empty() && !route.active_time_intervals.iter().any(|name| in_named(name)) {
        return true;
    }
    false
}

/// Stage 5: give other cluster members a chance to have already sent
/// this notification before we do, so a multi-replica deployment doesn't
/// duplicate-send for every alert. Staggers by `position * unit`, then
/// polls `observed_elsewhere` until `peer_timeout` elapses.
pub async fn wait_for_cluster_peers(
    cluster: &dyn ClusterView,
    key: &NflogKey,
    candidate: &NflogEntry,
    gossip_unit: StdDuration,
    peer_timeout: StdDuration,
) -> bool {
    if cluster.peer_count() <= 1 || cluster.position() == 0 {
        return false;
    }

    let stagger = gossip_unit.saturating_mul(u32::try_from(cluster.position()).unwrap_or(u32::MAX));
    tokio::time::sleep(stagger).await;

    let deadline = tokio::time::Instant::now() + peer_timeout;
    let poll_interval = StdDuration::from_millis(200).min(peer_timeout);
    loop {
        if cluster.observed_elsewhere(key, candidate).await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Stage 6: decide whether this exact firing/resolved set was already
/// sent within `repeat_interval`, in which case notifying again now
/// would be a silent no-op for the operator.
pub async fn due_for_notification(
    nflog: &NflogStore,
    key: &NflogKey,
    firing: &[String],
    resolved: &[String],
    repeat_interval: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<bool, PipelineError> {
    match nflog.query_by_parts(&key.receiver, &key.group_key).await {
        Ok(entry) => Ok(!entry.same_as(firing, resolved) || entry.due_for_repeat(now, repeat_interval)),
        Err(relaymux_nflog::NflogError::NotFound(_)) => Ok(true),
        Err(other) => Err(other.into()),
    }
}

/// Stage 7: call the notifier, retrying on a retryable error until
/// `deadline` under `strategy`'s backoff curve.
pub async fn send_with_retry(
    notifier: &Arc<dyn DynNotifier>,
    payload: &NotificationPayload,
    strategy: &RetryStrategy,
    deadline: tokio::time::Instant,
) -> Result<(), PipelineError> {
    let mut attempt = 0u32;
    loop {
        match notifier.notify(payload).await {
            Ok(()) => return Ok(()),
            Err(err) if !err.is_retryable() => {
                return Err(PipelineError::Notify { notifier: notifier.name().to_string(), source: err });
            }
            Err(err) => {
                let now = tokio::time::Instant::now();
                if now >= deadline {
                    return Err(PipelineError::Notify { notifier: notifier.name().to_string(), source: err });
                }
                let delay = strategy.delay_for(attempt).min(deadline - now);
                tracing::warn!(notifier = notifier.name(), attempt, error = %err, "notify attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Stage 8: record what was sent and let the cluster know.
pub async fn record_sent(
    nflog: &NflogStore,
    cluster: &dyn ClusterView,
    key: NflogKey,
    firing: Vec<String>,
    resolved: Vec<String>,
    retention: chrono::Duration,
) -> Result<(), PipelineError> {
    let entry = nflog.log(&key, firing, resolved, retention).await?;
    cluster.broadcast(key, entry).await;
    Ok(())
}

/// Fingerprints that should be considered "reported" for the purpose of
/// the dispatcher's `complete_flush`: every alert that made it into the
/// payload actually sent, whether firing or resolved. Alerts muted out
/// of this flush are left untouched for the next one.
#[must_use]
pub fn reported_fingerprints(payload: &NotificationPayload) -> Vec<Fingerprint> {
    payload.firing.iter().chain(payload.resolved.iter()).map(Alert::fingerprint).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relaymux_core::time_interval::{Range, TimeIntervalSpec};
    use relaymux_core::{Labels, ReceiverName, RouteId};
    use relaymux_state_memory::MemoryStateStore;

    use super::*;
    use crate::cluster::SoloCluster;

    fn route_config() -> RouteConfig {
        RouteConfig {
            id: RouteId::new("0"),
            receiver: ReceiverName::new("default"),
            group_by: vec![],
            group_by_all: false,
            group_wait: StdDuration::from_secs(30),
            group_interval: StdDuration::from_secs(300),
            repeat_interval: StdDuration::from_secs(4 * 3600),
            mute_time_intervals: vec![],
            active_time_intervals: vec![],
        }
    }

    fn alert(name: &str) -> Alert {
        Alert::new(Labels::from_pairs([("alertname", name)]), Labels::new())
    }

    #[tokio::test]
    async fn mute_alerts_passes_through_with_no_rules_or_silences() {
        let inhibitor = InhibitionEngine::new(vec![]);
        let silences = SilenceStore::new(Arc::new(MemoryStateStore::new()));
        let outcome = mute_alerts(vec![alert("X")], &inhibitor, &silences, Utc::now()).await.unwrap();
        assert_eq!(outcome.eligible.len(), 1);
        assert!(outcome.matched_silence_ids.is_empty());
    }

    #[test]
    fn route_time_muted_true_inside_mute_window() {
        let mut route = route_config();
        route.mute_time_intervals = vec!["weekends".into()];
        let mut intervals = HashMap::new();
        intervals.insert(
            "weekends".into(),
            TimeInterval {
                name: "weekends".into(),
                specs: vec![TimeIntervalSpec { weekdays: vec![Range { start: 0, end: 7 }], ..Default::default() }],
            },
        );
        assert!(route_time_muted(&route, &intervals, Utc::now()));
    }

    #[test]
    fn route_time_muted_false_with_no_intervals_configured() {
        let route = route_config();
        assert!(!route_time_muted(&route, &HashMap::new(), Utc::now()));
    }

    #[tokio::test]
    async fn wait_for_cluster_peers_short_circuits_for_solo_node() {
        let cluster = SoloCluster;
        let key = NflogKey::new(ReceiverName::new("default"), relaymux_core::GroupKey::new("g1"));
        let candidate = NflogEntry::new(vec!["a".into()], vec![], chrono::Duration::hours(1));
        let waited = wait_for_cluster_peers(&cluster, &key, &candidate, StdDuration::from_millis(10), StdDuration::from_millis(50)).await;
        assert!(!waited);
    }

    struct FixedPositionCluster {
        position: usize,
        peer_count: usize,
    }

    #[async_trait::async_trait]
    impl ClusterView for FixedPositionCluster {
        fn position(&self) -> usize {
            self.position
        }

        fn peer_count(&self) -> usize {
            self.peer_count
        }

        async fn observed_elsewhere(&self, _key: &NflogKey, _candidate: &NflogEntry) -> bool {
            false
        }

        async fn broadcast(&self, _key: NflogKey, _entry: NflogEntry) {}
    }

    #[tokio::test]
    async fn wait_for_cluster_peers_short_circuits_for_position_zero() {
        let cluster = FixedPositionCluster { position: 0, peer_count: 3 };
        let key = NflogKey::new(ReceiverName::new("default"), relaymux_core::GroupKey::new("g1"));
        let candidate = NflogEntry::new(vec!["a".into()], vec![], chrono::Duration::hours(1));
        let start = tokio::time::Instant::now();
        let waited = wait_for_cluster_peers(&cluster, &key, &candidate, StdDuration::from_millis(10), StdDuration::from_millis(500)).await;
        assert!(!waited);
        assert!(start.elapsed() < StdDuration::from_millis(50));
    }

    #[tokio::test]
    async fn due_for_notification_true_when_nothing_logged_yet() {
        let nflog = NflogStore::new(Arc::new(MemoryStateStore::new()));
        let key = NflogKey::new(ReceiverName::new("default"), relaymux_core::GroupKey::new("g1"));
        let due = due_for_notification(&nflog, &key, &["a".into()], &[], chrono::Duration::hours(1), Utc::now()).await.unwrap();
        assert!(due);
    }

    #[tokio::test]
    async fn due_for_notification_false_for_identical_recent_batch() {
        let nflog = NflogStore::new(Arc::new(MemoryStateStore::new()));
        let key = NflogKey::new(ReceiverName::new("default"), relaymux_core::GroupKey::new("g1"));
        nflog.log(&key, vec!["a".into()], vec![], chrono::Duration::hours(1)).await.unwrap();
        let due = due_for_notification(&nflog, &key, &["a".into()], &[], chrono::Duration::hours(1), Utc::now()).await.unwrap();
        assert!(!due);
    }
}
