use relaymux_core::{Alert, GroupKey, Labels, ReceiverName, RouteId};
use serde::Serialize;

/// Firing-or-resolved summary of a batch, the way a notification
/// template would title the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Firing,
    Resolved,
}

/// Everything a [`crate::Notifier`] needs to render one notification for
/// one aggregation group flush.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub receiver: ReceiverName,
    pub route_id: RouteId,
    pub group_key: GroupKey,
    pub status: BatchStatus,

    /// Labels shared by every alert in this batch -- what the group was
    /// grouped by, plus any label that happens to be identical across
    /// every member.
    pub common_labels: Labels,
    pub common_annotations: Labels,

    pub firing: Vec<Alert>,
    pub resolved: Vec<Alert>,

    pub external_url: Option<String>,
}

impl NotificationPayload {
    /// Build a payload from a group's current alert set, computing the
    /// common-labels/common-annotations intersection the way a rendered
    /// notification groups them at the top of the message instead of
    /// repeating them per alert.
    #[must_use]
    pub fn from_alerts(
        receiver: ReceiverName,
        route_id: RouteId,
        group_key: GroupKey,
        alerts: Vec<Alert>,
        external_url: Option<String>,
    ) -> Self {
        let mut firing = Vec::new();
        let mut resolved = Vec::new();
        for alert in alerts {
            if alert.resolved() {
                resolved.push(alert);
            } else {
                firing.push(alert);
            }
        }

        let all = firing.iter().chain(resolved.iter());
        let common_labels = common_fields(all.clone().map(|a| &a.labels));
        let common_annotations = common_fields(all.map(|a| &a.annotations));

        let status = if firing.is_empty() { BatchStatus::Resolved } else { BatchStatus::Firing };

        Self {
            receiver,
            route_id,
            group_key,
            status,
            common_labels,
            common_annotations,
            firing,
            resolved,
            external_url,
        }
    }

    #[must_use]
    pub fn alert_count(&self) -> usize {
        self.firing.len() + self.resolved.len()
    }
}

/// Intersect label sets: a name/value pair survives only if every set in
/// `sets` carries that exact pair.
fn common_fields<'a>(sets: impl Iterator<Item = &'a Labels> + Clone) -> Labels {
    let Some(first) = sets.clone().next() else {
        return Labels::new();
    };
    let mut common = Labels::new();
    for (name, value) in first.iter() {
        if sets.clone().all(|l| l.get(name) == Some(value)) {
            common.insert(name, value);
        }
    }
    common
}
