//! Alerts: the unit of input to the system, identified by a fingerprint
//! derived from their label set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::labels::Labels;
use crate::types::Fingerprint;

/// Derived firing/resolved status of an alert at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// A labeled, time-bounded observation produced by an upstream monitor.
///
/// `ends_at = None` means "firing until resolved" (the spec's "zero means
/// until resolved" sentinel, modeled as `Option` rather than a zero
/// timestamp since that is the idiomatic Rust shape for an open-ended
/// interval -- see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Identity: the label set. Order is irrelevant; fingerprinting is
    /// always lexicographic (see [`Labels::fingerprint`]).
    pub labels: Labels,

    /// Informational; not part of identity.
    #[serde(default)]
    pub annotations: Labels,

    pub starts_at: DateTime<Utc>,

    /// `None` means "firing until resolved".
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub generator_url: Option<String>,

    pub updated_at: DateTime<Utc>,

    /// Set when the alert was auto-resolved by absence (timeout), rather
    /// than by an explicit resolved update from the producer.
    #[serde(default)]
    pub timeout: bool,
}

impl Alert {
    /// Construct a new firing alert with `starts_at`/`updated_at` set to now.
    #[must_use]
    pub fn new(labels: Labels, annotations: Labels) -> Self {
        let now = Utc::now();
        Self {
            labels,
            annotations,
            starts_at: now,
            ends_at: None,
            generator_url: None,
            updated_at: now,
            timeout: false,
        }
    }

    /// The alert's identity fingerprint, derived solely from its labels.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.labels.fingerprint())
    }

    /// Derived status: firing when `ends_at` is in the future or unset,
    /// resolved otherwise.
    #[must_use]
    pub fn status(&self) -> AlertStatus {
        self.status_at(Utc::now())
    }

    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> AlertStatus {
        match self.ends_at {
            None => AlertStatus::Firing,
            Some(ends_at) if ends_at > now => AlertStatus::Firing,
            Some(_) => AlertStatus::Resolved,
        }
    }

    #[must_use]
    pub fn resolved(&self) -> bool {
        matches!(self.status(), AlertStatus::Resolved)
    }

    /// Validate a freshly-ingested alert: non-empty `alertname`, no empty
    /// label values (labels may simply be absent instead), well-formed
    /// label names, and `starts_at <= ends_at` when both are set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] describing the first violation
    /// found. Callers that ingest a batch should validate every alert
    /// before accepting any of them (see the provider's `put` contract).
    pub fn validate(&self) -> Result<(), CoreError> {
        let alertname = self.labels.get("alertname").unwrap_or("");
        if alertname.trim().is_empty() {
            return Err(CoreError::Validation(
                "alert must carry a non-empty 'alertname' label".into(),
            ));
        }
        for (name, value) in self.labels.iter() {
            if !is_well_formed_label_name(name) {
                return Err(CoreError::Validation(format!(
                    "label name {name:?} is not well-formed"
                )));
            }
            if value.is_empty() {
                return Err(CoreError::Validation(format!(
                    "label {name:?} carries an empty value; omit the label instead"
                )));
            }
        }
        if let Some(ends_at) = self.ends_at
            && self.starts_at > ends_at
        {
            return Err(CoreError::Validation(
                "starts_at must not be after ends_at".into(),
            ));
        }
        Ok(())
    }

    /// Merge two updates for the same fingerprint into the alert that
    /// should now represent their combined state.
    ///
    /// Grounded on the classic alert-merge rule: the update with the
    /// greater `updated_at` wins for all fields except `starts_at` (always
    /// the earliest seen) and `ends_at`, which may be extended by an
    /// *older* but still-firing update -- but never by an older update
    /// that was already resolved, so a stale resolved report can't
    /// retroactively shorten an alert that a newer update says is still
    /// firing (invariant: merge idempotence, §8.1).
    #[must_use]
    pub fn merge(a: &Alert, b: &Alert) -> Alert {
        let (newer, older) = Self::order(a, b);
        let mut merged = newer.clone();

        if older.starts_at < merged.starts_at {
            merged.starts_at = older.starts_at;
        }

        if !older.resolved()
            && let (Some(older_ends), Some(merged_ends)) = (older.ends_at, merged.ends_at)
            && older_ends > merged_ends
        {
            merged.ends_at = Some(older_ends);
        }

        merged
    }

    /// Return `(newer, older)` by `updated_at`, breaking ties
    /// deterministically (by fingerprint, then by serialized content) so
    /// that `order(a, b)` and `order(b, a)` agree -- required for
    /// `merge(a, b) == merge(b, a)` when timestamps are equal.
    fn order<'a>(a: &'a Alert, b: &'a Alert) -> (&'a Alert, &'a Alert) {
        match a.updated_at.cmp(&b.updated_at) {
            std::cmp::Ordering::Less => (b, a),
            std::cmp::Ordering::Greater => (a, b),
            std::cmp::Ordering::Equal => {
                let a_key = serde_json::to_string(a).unwrap_or_default();
                let b_key = serde_json::to_string(b).unwrap_or_default();
                if a_key >= b_key { (a, b) } else { (b, a) }
            }
        }
    }
}

fn is_well_formed_label_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        Labels::from_pairs(pairs.iter().copied())
    }

    fn firing_alert(name: &str, extra: &[(&str, &str)]) -> Alert {
        let mut pairs = vec![("alertname", name)];
        pairs.extend_from_slice(extra);
        Alert::new(labels(&pairs), Labels::new())
    }

    #[test]
    fn validate_rejects_missing_alertname() {
        let alert = Alert::new(labels(&[("host", "a")]), Labels::new());
        assert!(alert.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_label_value() {
        let alert = Alert::new(labels(&[("alertname", "X"), ("host", "")]), Labels::new());
        assert!(alert.validate().is_err());
    }

    #[test]
    fn validate_rejects_starts_after_ends() {
        let mut alert = firing_alert("X", &[]);
        alert.ends_at = Some(alert.starts_at - Duration::seconds(1));
        assert!(alert.validate().is_err());
    }

    #[test]
    fn status_firing_when_ends_at_unset() {
        let alert = firing_alert("X", &[]);
        assert_eq!(alert.status(), AlertStatus::Firing);
    }

    #[test]
    fn status_resolved_when_ends_at_past() {
        let mut alert = firing_alert("X", &[]);
        alert.ends_at = Some(Utc::now() - Duration::seconds(1));
        assert_eq!(alert.status(), AlertStatus::Resolved);
    }

    #[test]
    fn merge_is_commutative_on_timestamp_tie() {
        let mut a = firing_alert("X", &[]);
        let mut b = a.clone();
        b.annotations.insert("note", "b");
        a.annotations.insert("note", "a");
        b.updated_at = a.updated_at;

        let ab = Alert::merge(&a, &b);
        let ba = Alert::merge(&b, &a);
        assert_eq!(ab.annotations, ba.annotations);
    }

    #[test]
    fn merge_later_dominates_annotations() {
        let a = firing_alert("X", &[]);
        let mut b = a.clone();
        b.updated_at = a.updated_at + Duration::seconds(1);
        b.annotations.insert("note", "newer");

        let merged = Alert::merge(&a, &b);
        assert_eq!(merged.annotations.get("note"), Some("newer"));
    }

    #[test]
    fn merge_extends_firing_from_older_unresolved_update() {
        let mut a = firing_alert("X", &[]);
        a.ends_at = Some(Utc::now() + Duration::seconds(5));
        a.updated_at = Utc::now();

        let mut b = a.clone();
        b.updated_at = a.updated_at - Duration::seconds(1);
        b.ends_at = Some(Utc::now() + Duration::seconds(30));

        let merged = Alert::merge(&a, &b);
        assert_eq!(merged.ends_at, b.ends_at);
    }

    #[test]
    fn merge_resolved_older_cannot_unresolve_newer_firing() {
        let mut newer = firing_alert("X", &[]);
        newer.ends_at = Some(Utc::now() + Duration::seconds(5));
        newer.updated_at = Utc::now();

        let mut older_resolved = newer.clone();
        older_resolved.updated_at = newer.updated_at - Duration::seconds(1);
        older_resolved.ends_at = Some(Utc::now() + Duration::seconds(3600));

        let merged = Alert::merge(&newer, &older_resolved);
        assert_eq!(merged.ends_at, newer.ends_at);
    }

    #[test]
    fn merge_keeps_earliest_starts_at() {
        let mut a = firing_alert("X", &[]);
        let mut b = a.clone();
        a.starts_at = Utc::now();
        b.starts_at = a.starts_at - Duration::seconds(10);
        b.updated_at = a.updated_at - Duration::seconds(1);

        let merged = Alert::merge(&a, &b);
        assert_eq!(merged.starts_at, b.starts_at);
    }
}
