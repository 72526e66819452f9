//! Label sets: the identity-bearing key/value maps attached to alerts,
//! routes, and silence matchers.
//!
//! Ordering is irrelevant for equality but fixed (lexicographic on key) for
//! hashing, so `Labels` is backed by a `BTreeMap` rather than a `HashMap` --
//! the canonical order falls out of the type instead of being re-sorted at
//! every fingerprint site.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A mapping from label name to label value, in canonical (sorted) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    /// An empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a label set from an iterator of (name, value) pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Get a label value, falling back to the empty string when absent.
    ///
    /// Used when projecting an alert onto a route's `group_by` list: a
    /// missing label contributes an explicit empty string to the group key,
    /// which is distinct from an alert that carries an actual empty value
    /// for that label (see [`crate::route::group_key`]).
    #[must_use]
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compute a stable SHA-256 fingerprint over the label set in
    /// lexicographic key order.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (k, v) in &self.0 {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b";");
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(String, String)> for Labels {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Labels {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_independent() {
        let a = Labels::from_pairs([("b", "2"), ("a", "1")]);
        let b = Labels::from_pairs([("a", "1"), ("b", "2")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_missing_from_empty() {
        let missing = Labels::from_pairs([("a", "1")]);
        let explicit_empty = Labels::from_pairs([("a", "1"), ("b", "")]);
        assert_ne!(missing.fingerprint(), explicit_empty.fingerprint());
    }

    #[test]
    fn get_or_empty_defaults() {
        let l = Labels::from_pairs([("a", "1")]);
        assert_eq!(l.get_or_empty("a"), "1");
        assert_eq!(l.get_or_empty("missing"), "");
    }
}
