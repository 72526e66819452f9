//! Label matchers: the predicates attached to routes, inhibition rules,
//! and silences to select which alerts they apply to.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::labels::Labels;

/// A single `label <op> value` predicate.
///
/// `is_regex` anchors the pattern on both ends (full-match semantics, not
/// search), matching how label matchers are conventionally interpreted:
/// `env=~"staging|canary"` must match the whole value, not a substring of
/// it.
#[derive(Debug, Clone, Serialize)]
pub struct Matcher {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default)]
    pub is_negative: bool,
    #[serde(skip, default)]
    compiled: Option<Regex>,
}

/// Mirrors `Matcher`'s wire shape but without the transient `compiled`
/// field, so deserialization always runs through [`Matcher::new`] and the
/// regex is recompiled whether the matcher came from TOML config, a
/// silence JSON blob, or an API request body.
#[derive(Deserialize)]
struct MatcherWire {
    name: String,
    value: String,
    #[serde(default)]
    is_regex: bool,
    #[serde(default)]
    is_negative: bool,
}

impl<'de> Deserialize<'de> for Matcher {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = MatcherWire::deserialize(deserializer)?;
        Matcher::new(wire.name, wire.value, wire.is_regex, wire.is_negative).map_err(serde::de::Error::custom)
    }
}

impl Matcher {
    /// Construct and compile (if regex) a matcher.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `is_regex` is set and `value`
    /// is not a valid regular expression.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        is_regex: bool,
        is_negative: bool,
    ) -> Result<Self, CoreError> {
        let value = value.into();
        let compiled = if is_regex {
            Some(compile_anchored(&value)?)
        } else {
            None
        };
        Ok(Self {
            name: name.into(),
            value,
            is_regex,
            is_negative,
            compiled,
        })
    }

    #[must_use]
    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_regex: false,
            is_negative: false,
            compiled: None,
        }
    }

    #[must_use]
    pub fn matches(&self, labels: &Labels) -> bool {
        let actual = labels.get_or_empty(&self.name);
        let base = if let Some(re) = &self.compiled {
            re.is_match(actual)
        } else {
            actual == self.value
        };
        base != self.is_negative
    }
}

fn compile_anchored(pattern: &str) -> Result<Regex, CoreError> {
    let anchored = format!("^(?:{pattern})$");
    Regex::new(&anchored).map_err(|e| CoreError::Validation(format!("invalid matcher regex: {e}")))
}

/// A list of matchers, all of which must hold for the set to match
/// (conjunction).
#[must_use]
pub fn all_match(matchers: &[Matcher], labels: &Labels) -> bool {
    matchers.iter().all(|m| m.matches(labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_matcher_is_exact() {
        let m = Matcher::equal("env", "prod");
        assert!(m.matches(&Labels::from_pairs([("env", "prod")])));
        assert!(!m.matches(&Labels::from_pairs([("env", "production")])));
    }

    #[test]
    fn regex_matcher_is_fully_anchored() {
        let m = Matcher::new("env", "staging|canary", true, false).unwrap();
        assert!(m.matches(&Labels::from_pairs([("env", "canary")])));
        assert!(!m.matches(&Labels::from_pairs([("env", "precanary")])));
    }

    #[test]
    fn negative_matcher_inverts() {
        let m = Matcher::new("env", "prod", false, true).unwrap();
        assert!(m.matches(&Labels::from_pairs([("env", "staging")])));
        assert!(!m.matches(&Labels::from_pairs([("env", "prod")])));
    }

    #[test]
    fn missing_label_matches_empty_string() {
        let m = Matcher::equal("missing", "");
        assert!(m.matches(&Labels::new()));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(Matcher::new("env", "(unterminated", true, false).is_err());
    }
}
