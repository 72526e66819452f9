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
use crate::stages;

/// What a flush attempt actually did, so the caller can decide how to
/// drive the dispatcher's `complete_flush`.
#[derive(Debug, Clone)]
pub struct FlushOutcome {
    /// Fingerprints that made it into a payload this pipeline actually
    /// sent (or that the dedup stage decided not to resend). Safe to
    /// pass straight to `Dispatcher::complete_flush`.
    pub reported: Vec<Fingerprint>,
    /// Whether a notification was actually sent (as opposed to being
    /// suppressed by muting, time intervals, or dedup).
    pub sent: bool,
    pub matched_silence_ids: Vec<uuid::Uuid>,
}

/// How long the gossip-wait stage staggers each additional peer by.
const DEFAULT_GOSSIP_UNIT: StdDuration = StdDuration::from_millis(500);

/// How long the wait-for-cluster-peers stage waits before giving up and
/// sending locally.
const DEFAULT_PEER_TIMEOUT: StdDuration = StdDuration::from_secs(15);

/// How long the retry stage keeps retrying a single notify call before
/// giving up and letting the next scheduled flush try again.
const DEFAULT_NOTIFY_TIMEOUT: StdDuration = StdDuration::from_secs(120);

/// Runs the fixed notify chain -- inhibit, silence, time interval,
/// cluster wait, dedup, retry, log -- for one group flush against one
/// receiver's notifier.
pub struct NotificationPipeline {
    nflog: Arc<NflogStore>,
    silences: Arc<SilenceStore>,
    cluster: Arc<dyn ClusterView>,
    retry_strategy: RetryStrategy,
    gossip_unit: StdDuration,
    peer_timeout: StdDuration,
    notify_timeout: StdDuration,
}

impl NotificationPipeline {
    #[must_use]
    pub fn new(nflog: Arc<NflogStore>, silences: Arc<SilenceStore>, cluster: Arc<dyn ClusterView>) -> Self {
        Self {
            nflog,
            silences,
            cluster,
            retry_strategy: RetryStrategy::default(),
            gossip_unit: DEFAULT_GOSSIP_UNIT,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_timing(mut self, gossip_unit: StdDuration, peer_timeout: StdDuration, notify_timeout: StdDuration) -> Self {
        self.gossip_unit = gossip_unit;
        self.peer_timeout = peer_timeout;
        self.notify_timeout = notify_timeout;
        self
    }

    /// Run the full chain for one `(route, receiver)` flush.
    ///
    /// `send_resolved` reflects the receiver's configured preference for
    /// resolved-only batches; `notifier` is the concrete integration this
    /// receiver is wired to; `external_url` is stamped into the payload
    /// for notifiers that link back to this instance.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any stage that talks to the state
    /// store or notifier fails terminally. A returned error means this
    /// flush did not complete; the caller must not treat any alert as
    /// reported and should retry on the next scheduled flush.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        route: &RouteConfig,
        alerts: Vec<Alert>,
        inhibitor: &InhibitionEngine,
        time_intervals: &HashMap<String, TimeInterval>,
        notifier: &Arc<dyn DynNotifier>,
        send_resolved: bool,
        external_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<FlushOutcome, PipelineError> {
        if stages::route_time_muted(route, time_intervals, now) {
            tracing::debug!(receiver = %route.receiver, "flush muted by time interval");
            return Ok(FlushOutcome { reported: Vec::new(), sent: false, matched_silence_ids: Vec::new() });
        }

        let mute_outcome = stages::mute_alerts(alerts, inhibitor, &self.silences, now).await?;
        if mute_outcome.eligible.is_empty() {
            return Ok(FlushOutcome {
                reported: Vec::new(),
                sent: false,
                matched_silence_ids: mute_outcome.matched_silence_ids,
            });
        }

        let group_key = route_group_key(route, &mute_outcome.eligible);
        let payload = NotificationPayload::from_alerts(
            route.receiver.clone(),
            route.id.clone(),
            group_key.clone(),
            mute_outcome.eligible,
            external_url,
        );

        let firing_fps: Vec<String> = payload.firing.iter().map(|a| a.fingerprint().to_string()).collect();
        let resolved_fps: Vec<String> = payload.resolved.iter().map(|a| a.fingerprint().to_string()).collect();

        if firing_fps.is_empty() && !send_resolved {
            tracing::debug!(receiver = %route.receiver, "resolved-only batch skipped, receiver opted out");
            return Ok(FlushOutcome {
                reported: stages::reported_fingerprints(&payload),
                sent: false,
                matched_silence_ids: mute_outcome.matched_silence_ids,
            });
        }

        let nflog_key = NflogKey::new(route.receiver.clone(), group_key);
        let repeat_interval = chrono::Duration::from_std(route.repeat_interval).unwrap_or(chrono::Duration::hours(4));

        if !stages::due_for_notification(&self.nflog, &nflog_key, &firing_fps, &resolved_fps, repeat_interval, now).await? {
            tracing::debug!(receiver = %route.receiver, "suppressed, identical batch already notified within repeat_interval");
            return Ok(FlushOutcome { reported: Vec::new(), sent: false, matched_silence_ids: mute_outcome.matched_silence_ids });
        }

        let candidate = NflogEntry::new(firing_fps.clone(), resolved_fps.clone(), repeat_interval.max(chrono::Duration::hours(1)));
        if stages::wait_for_cluster_peers(self.cluster.as_ref(), &nflog_key, &candidate, self.gossip_unit, self.peer_timeout).await {
            tracing::debug!(receiver = %route.receiver, "peer already notified this batch, skipping local send");
            return Ok(FlushOutcome {
                reported: stages::reported_fingerprints(&payload),
                sent: false,
                matched_silence_ids: mute_outcome.matched_silence_ids,
            });
        }

        let deadline = tokio::time::Instant::now() + self.notify_timeout;
        stages::send_with_retry(notifier, &payload, &self.retry_strategy, deadline).await?;

        stages::record_sent(&self.nflog, self.cluster.as_ref(), nflog_key, firing_fps, resolved_fps, repeat_interval.max(chrono::Duration::hours(1)))
            .await?;

        Ok(FlushOutcome { reported: stages::reported_fingerprints(&payload), sent: true, matched_silence_ids: mute_outcome.matched_silence_ids })
    }
}

fn route_group_key(route: &RouteConfig, alerts: &[Alert]) -> relaymux_core::GroupKey {
    let sample = alerts.first().map(|a| &a.labels);
    sample.map_or_else(|| relaymux_core::GroupKey::new(""), |labels| relaymux_core::route::group_key(route, labels))
}
