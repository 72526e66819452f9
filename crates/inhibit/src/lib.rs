//! Inhibition engine: suppresses a candidate alert when another
//! currently-firing alert matches one of the candidate's inhibition
//! rules on its source side and the two agree on the rule's `equal`
//! labels.

use std::collections::HashMap;

use relaymux_core::matcher::all_match;
use relaymux_core::{Alert, Fingerprint, InhibitRule, Labels};

/// Projection of an alert's labels onto a rule's `equal` list, used as
/// the bucket key for that rule's source index.
fn projection_key(labels: &Labels, equal: &[String]) -> String {
    let mut projected = Labels::new();
    for name in equal {
        projected.insert(name.clone(), labels.get_or_empty(name));
    }
    projected.fingerprint()
}

#[derive(Debug, Default)]
struct RuleIndex {
    /// projection fingerprint -> source alerts contributing to it
    buckets: HashMap<String, HashMap<Fingerprint, ()>>,
}

/// Maintains, per inhibition rule, an index of currently-firing alerts
/// matching that rule's source side, bucketed by their projection onto
/// the rule's `equal` labels.
pub struct InhibitionEngine {
    rules: Vec<InhibitRule>,
    indexes: Vec<RuleIndex>,
}

impl InhibitionEngine {
    #[must_use]
    pub fn new(rules: Vec<InhibitRule>) -> Self {
        let indexes = rules.iter().map(|_| RuleIndex::default()).collect();
        Self { rules, indexes }
    }

    /// Refresh this alert's membership in every rule's source index, based
    /// on its current firing status. Call whenever an alert's status
    /// changes (new firing alert, or merge that changes labels/status).
    pub fn update(&mut self, alert: &Alert) {
        let firing = matches!(alert.status(), relaymux_core::AlertStatus::Firing);
        for (rule, index) in self.rules.iter().zip(self.indexes.iter_mut()) {
            let eligible = firing && all_match(&rule.source_matchers, &alert.labels);
            let key = projection_key(&alert.labels, &rule.equal);
            if eligible {
                index.buckets.entry(key).or_default().insert(alert.fingerprint(), ());
            } else {
                remove_from_all_buckets(index, &alert.fingerprint());
            }
        }
    }

    /// Remove an alert from every rule's index, e.g. once it has been
    /// garbage-collected from the provider.
    pub fn remove(&mut self, fingerprint: &Fingerprint) {
        for index in &mut self.indexes {
            remove_from_all_buckets(index, fingerprint);
        }
    }

    /// Whether `candidate` is currently inhibited by some other firing
    /// alert under any configured rule.
    #[must_use]
    pub fn is_inhibited(&self, candidate: &Alert) -> bool {
        let candidate_fp = candidate.fingerprint();
        for (rule, index) in self.rules.iter().zip(self.indexes.iter()) {
            if !all_match(&rule.target_matchers, &candidate.labels) {
                continue;
            }
            let key = projection_key(&candidate.labels, &rule.equal);
            if let Some(bucket) = index.buckets.get(&key)
                && bucket.keys().any(|fp| fp != &candidate_fp)
            {
                return true;
            }
        }
        false
    }
}

fn remove_from_all_buckets(index: &mut RuleIndex, fingerprint: &Fingerprint) {
    for bucket in index.buckets.values_mut() {
        bucket.remove(fingerprint);
    }
    index.buckets.retain(|_, b| !b.is_empty());
}
