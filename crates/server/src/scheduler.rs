//! Background loops tying the alert provider, dispatcher, and
//! notification pipeline together: routing newly ingested alerts into
//! aggregation groups, flushing groups whose timer has come due, and
//! periodically reclaiming expired state.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use relaymux_core::route::group_key;
use relaymux_core::Alert;
use relaymux_provider::ProviderEvent;

use crate::state::AppState;

/// Spawn every background loop the server needs to actually dispatch
/// notifications, not just accept and store alerts.
pub fn spawn(state: AppState) {
    tokio::spawn(route_incoming(state.clone()));
    tokio::spawn(flush_due_groups(state.clone()));
    tokio::spawn(reap_expired_state(state.clone()));
    tokio::spawn(anti_entropy(state.clone()));
    if state.snapshot_paths.is_some() {
        tokio::spawn(persist_state_periodically(state));
    }
}

/// Subscribe to the provider's alert stream and fold every alert into
/// whichever aggregation groups its route tree assigns it to. Runs for
/// the lifetime of the process; a closed subscription (buffer overflow)
/// just resubscribes and replays the current snapshot.
async fn route_incoming(state: AppState) {
    loop {
        let mut sub = state.provider.subscribe().await;
        loop {
            match sub.recv().await {
                Ok(Some(ProviderEvent::Snapshot(alerts))) => {
                    for alert in alerts {
                        route_one(&state, &alert).await;
                    }
                }
                Ok(Some(ProviderEvent::Merged(alert))) => {
                    route_one(&state, &alert).await;
                }
                Ok(None) | Err(_) => break,
            }
        }
        tracing::warn!("alert subscription lost, resubscribing");
    }
}

async fn route_one(state: &AppState, alert: &Alert) {
    state.inhibitor.write().await.update(alert);

    let matches = {
        let config = state.config.read().await;
        config.route.find_matches(&alert.labels)
    };

    for route in matches {
        state.route_configs.write().await.insert(route.id.clone(), route.clone());
        let key = group_key(&route, &alert.labels);
        if let Err(err) = state.dispatcher.add_alert(&route, key, alert.clone(), state.store.as_ref()).await {
            tracing::error!(error = %err, route_id = %route.id, "failed to add alert to aggregation group");
        }
    }
}

/// Every tick, flush whichever groups have an armed timer in the past,
/// running the full notify chain once per integration bound to the
/// group's receiver.
///
/// Receivers with more than one integration share a single notify-log
/// entry keyed by receiver name; only the first integration's send
/// participates in repeat-interval dedup for a given batch. This differs
/// from per-integration notify tracking and is a known simplification
/// for multi-integration receivers, not a bug in single-integration
/// (the overwhelmingly common) receivers.
async fn flush_due_groups(state: AppState) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        let now = Utc::now();
        let due = state.dispatcher.ready_groups(now).await;
        for key in due {
            if let Err(err) = flush_one(&state, &key, now).await {
                tracing::error!(error = %err, group = %key, "flush failed");
            }
        }
    }
}

async fn flush_one(state: &AppState, key: &str, now: chrono::DateTime<Utc>) -> Result<(), crate::error::ServerError> {
    let Some(group) = state.dispatcher.begin_flush(key).await else {
        return Ok(());
    };

    let Some(route) = state.route_configs.read().await.get(&group.route_id).cloned() else {
        tracing::warn!(route_id = %group.route_id, "flushing group with no cached route config, dropping");
        state.dispatcher.remove(key, state.store.as_ref()).await?;
        return Ok(());
    };

    let integrations = state.notifiers.read().await.get(route.receiver.as_ref()).cloned().unwrap_or_default();
    if integrations.is_empty() {
        tracing::warn!(receiver = %route.receiver, "receiver has no configured integrations, nothing to notify");
    }

    let time_intervals = state.time_intervals().await;
    let external_url = state.config.read().await.global.external_url.clone();
    let inhibitor = state.inhibitor.read().await;
    let pipeline = state.pipeline();
    let alerts: Vec<Alert> = group.alerts.into_values().collect();

    let mut reported = HashSet::new();
    let mut any_sent = false;
    let mut first_error = None;
    for integration in &integrations {
        let result = pipeline
            .run(
                &route,
                alerts.clone(),
                &inhibitor,
                &time_intervals,
                &integration.notifier,
                integration.send_resolved,
                external_url.clone(),
                now,
            )
            .await;
        match result {
            Ok(outcome) => {
                any_sent |= outcome.sent;
                reported.extend(outcome.reported);
            }
            Err(err) => {
                tracing::error!(error = %err, receiver = %route.receiver, integration = %integration.notifier.name(), "notifier failed, group stays armed for retry");
                first_error.get_or_insert(err);
            }
        }
    }
    drop(inhibitor);

    if integrations.is_empty() {
        reported.extend(alerts.iter().map(relaymux_core::Alert::fingerprint));
    }

    // Always unstick the group -- even a partial failure above must not
    // leave it wedged in `GroupState::Flushing` forever. Only alerts
    // actually reported by a successful integration run are eligible for
    // removal; the rest are retried on the next scheduled flush.
    let group_interval = chrono::Duration::from_std(route.group_interval).unwrap_or(chrono::Duration::minutes(5));
    let reported: Vec<_> = reported.into_iter().collect();
    state.dispatcher.complete_flush(key, group_interval, &reported, state.store.as_ref()).await?;

    if let Some(err) = first_error {
        return Err(err.into());
    }

    if any_sent {
        tracing::info!(receiver = %route.receiver, group = %key, "flushed notification group");
    }
    Ok(())
}

/// Reclaim alerts past `resolve_timeout`, expired silences, and stale
/// notify-log entries.
async fn reap_expired_state(state: AppState) {
    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    loop {
        ticker.tick().await;
        let now = Utc::now();
        let resolve_timeout = {
            let config = state.config.read().await;
            chrono::Duration::from_std(config.global.resolve_timeout).unwrap_or(chrono::Duration::minutes(5))
        };
        let gone = state.provider.gc(resolve_timeout).await;
        if gone > 0 {
            tracing::debug!(count = gone, "garbage-collected resolved alerts past resolve_timeout");
        }
        if let Err(err) = state.silences.gc(now).await {
            tracing::warn!(error = %err, "silence gc failed");
        }
        if let Err(err) = state.nflog.gc(now).await {
            tracing::warn!(error = %err, "notify-log gc failed");
        }
    }
}

/// Periodically flood a full state snapshot to cluster peers, so a peer
/// that missed individual gossip frames (a restart, a dropped message)
/// still converges eventually.
async fn anti_entropy(state: AppState) {
    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    loop {
        ticker.tick().await;
        if let Err(err) = state.cluster.anti_entropy_pass().await {
            tracing::warn!(error = %err, "anti-entropy pass failed");
        }
    }
}

/// Write the silence and notify-log snapshots to disk on a fixed
/// interval. Only spawned when [`AppState::snapshot_paths`] is set.
async fn persist_state_periodically(state: AppState) {
    let Some(paths) = state.snapshot_paths.clone() else { return };
    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    loop {
        ticker.tick().await;
        if let Err(err) = crate::persistence::persist(&state.silences, &state.nflog, &paths).await {
            tracing::warn!(error = %err, "failed to write state snapshot");
        }
    }
}
