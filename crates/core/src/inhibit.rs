//! Inhibition rule definitions: declarative suppression of lower-severity
//! alerts while a higher-severity, related alert is firing.

use serde::{Deserialize, Serialize};

use crate::matcher::Matcher;

/// One inhibition rule: if any currently-firing alert matches
/// `source_matchers`, it silences any candidate alert that matches
/// `target_matchers` and agrees with the source on every label in
/// `equal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InhibitRule {
    pub source_matchers: Vec<Matcher>,
    pub target_matchers: Vec<Matcher>,
    pub equal: Vec<String>,
}
