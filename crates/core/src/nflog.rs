//! Notification log entries: the record of what was last sent for a given
//! (receiver, group) pair, used to decide whether a new notification
//! attempt would be a no-op repeat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GroupKey, ReceiverName};

/// Identifies one notification log entry: a receiver paired with the
/// aggregation group it notified about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NflogKey {
    pub receiver: ReceiverName,
    pub group_key: GroupKey,
}

impl NflogKey {
    #[must_use]
    pub fn new(receiver: ReceiverName, group_key: GroupKey) -> Self {
        Self { receiver, group_key }
    }
}

/// What was last sent for a `NflogKey`, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NflogEntry {
    /// Fingerprints of alerts included in the last successful
    /// notification, firing or resolved.
    pub firing_fingerprints: Vec<String>,
    pub resolved_fingerprints: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// When this entry becomes eligible for garbage collection, carried
    /// on the wire so the merge tiebreak (and GC) agree with whichever
    /// peer produced the entry, not with the local node's own retention.
    pub expires_at: DateTime<Utc>,
}

impl NflogEntry {
    #[must_use]
    pub fn new(firing_fingerprints: Vec<String>, resolved_fingerprints: Vec<String>, retention: chrono::Duration) -> Self {
        let timestamp = Utc::now();
        Self {
            firing_fingerprints,
            resolved_fingerprints,
            timestamp,
            expires_at: timestamp + retention,
        }
    }

    /// Whether the given candidate fingerprint sets are identical to what
    /// was last notified (same alerts, firing and resolved), meaning a
    /// repeat notification right now would carry no new information and
    /// should wait for `repeat_interval` instead of firing immediately.
    #[must_use]
    pub fn same_as(&self, firing: &[String], resolved: &[String]) -> bool {
        same_set(&self.firing_fingerprints, firing) && same_set(&self.resolved_fingerprints, resolved)
    }

    /// Whether `repeat_interval` has elapsed since this entry was
    /// recorded, at time `now`.
    #[must_use]
    pub fn due_for_repeat(&self, now: DateTime<Utc>, repeat_interval: chrono::Duration) -> bool {
        now - self.timestamp >= repeat_interval
    }
}

fn same_set(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted = a.to_vec();
    let mut b_sorted = b.to_vec();
    a_sorted.sort();
    b_sorted.sort();
    a_sorted == b_sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn same_as_ignores_order() {
        let entry = NflogEntry::new(vec!["a".into(), "b".into()], vec![], Duration::hours(1));
        assert!(entry.same_as(&["b".into(), "a".into()], &[]));
    }

    #[test]
    fn same_as_detects_new_alert() {
        let entry = NflogEntry::new(vec!["a".into()], vec![], Duration::hours(1));
        assert!(!entry.same_as(&["a".into(), "b".into()], &[]));
    }

    #[test]
    fn due_for_repeat_respects_interval() {
        let mut entry = NflogEntry::new(vec![], vec![], Duration::hours(1));
        entry.timestamp = Utc::now() - Duration::minutes(10);
        assert!(entry.due_for_repeat(Utc::now(), Duration::minutes(5)));
        assert!(!entry.due_for_repeat(Utc::now(), Duration::minutes(20)));
    }
}
