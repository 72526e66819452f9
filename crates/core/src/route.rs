//! The route tree: a nested set of matchers that assigns each alert to
//! zero or more receivers and controls how it is grouped and throttled.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::labels::Labels;
use crate::matcher::{all_match, Matcher};
use crate::types::{GroupKey, ReceiverName, RouteId};

/// One node of the route tree.
///
/// The root route has no matchers (it matches everything) and supplies
/// the defaults every descendant inherits unless it overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub receiver: ReceiverName,

    #[serde(default)]
    pub matchers: Vec<Matcher>,

    #[serde(default)]
    pub group_by: Vec<String>,

    /// When set, every alert is its own group regardless of `group_by`.
    #[serde(default)]
    pub group_by_all: bool,

    #[serde(default, with = "crate::duration_format::optional")]
    pub group_wait: Option<Duration>,

    #[serde(default, with = "crate::duration_format::optional")]
    pub group_interval: Option<Duration>,

    #[serde(default, with = "crate::duration_format::optional")]
    pub repeat_interval: Option<Duration>,

    /// When true, matching continues evaluating sibling/child routes
    /// after this one has matched, instead of stopping at the first hit.
    #[serde(default)]
    pub continue_matching: bool,

    /// Named time intervals (resolved against the config's `time_intervals`
    /// table) during which a flush of this route is suppressed.
    #[serde(default)]
    pub mute_time_intervals: Vec<String>,

    /// Named time intervals outside of which a flush of this route is
    /// suppressed. Empty means "always active".
    #[serde(default)]
    pub active_time_intervals: Vec<String>,

    #[serde(default)]
    pub routes: Vec<Route>,
}

/// Effective, fully-resolved per-route settings after inheriting from
/// ancestors, plus a stable identity derived from the route's position in
/// the tree (used as the first half of an aggregation group's key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    pub id: RouteId,
    pub receiver: ReceiverName,
    pub group_by: Vec<String>,
    pub group_by_all: bool,
    pub group_wait: Duration,
    pub group_interval: Duration,
    pub repeat_interval: Duration,
    pub mute_time_intervals: Vec<String>,
    pub active_time_intervals: Vec<String>,
}

impl Route {
    /// Walk the tree depth-first, returning every route whose matchers
    /// (conjoined with every ancestor's matchers) match `labels`, with
    /// inherited defaults resolved along the way.
    ///
    /// A route that matches and does not set `continue_matching` stops
    /// the walk at that point in the tree: its matching siblings are
    /// skipped (matching descendants are still visited, since
    /// `continue_matching` governs whether to keep looking past this
    /// node, not whether to descend into it).
    #[must_use]
    pub fn find_matches(&self, labels: &Labels) -> Vec<RouteConfig> {
        let mut out = Vec::new();
        self.walk(labels, "0", &defaults(), &mut out);
        out
    }

    fn walk(&self, labels: &Labels, path: &str, inherited: &RouteConfig, out: &mut Vec<RouteConfig>) {
        if !all_match(&self.matchers, labels) {
            return;
        }

        let resolved = self.resolve(path, inherited);
        out.push(resolved.clone());

        for (i, child) in self.routes.iter().enumerate() {
            let child_path = format!("{path}.{i}");
            child.walk(labels, &child_path, &resolved, out);
            if !child.continue_matching && all_match(&child.matchers, labels) {
                break;
            }
        }
    }

    fn resolve(&self, path: &str, inherited: &RouteConfig) -> RouteConfig {
        RouteConfig {
            id: RouteId::new(path),
            receiver: self.receiver.clone(),
            group_by: if self.group_by.is_empty() {
                inherited.group_by.clone()
            } else {
                self.group_by.clone()
            },
            group_by_all: self.group_by_all || inherited.group_by_all,
            group_wait: self.group_wait.unwrap_or(inherited.group_wait),
            group_interval: self.group_interval.unwrap_or(inherited.group_interval),
            repeat_interval: self.repeat_interval.unwrap_or(inherited.repeat_interval),
            mute_time_intervals: if self.mute_time_intervals.is_empty() {
                inherited.mute_time_intervals.clone()
            } else {
                self.mute_time_intervals.clone()
            },
            active_time_intervals: if self.active_time_intervals.is_empty() {
                inherited.active_time_intervals.clone()
            } else {
                self.active_time_intervals.clone()
            },
        }
    }
}

fn defaults() -> RouteConfig {
    RouteConfig {
        id: RouteId::new("0"),
        receiver: ReceiverName::new("default"),
        group_by: Vec::new(),
        group_by_all: false,
        group_wait: Duration::from_secs(30),
        group_interval: Duration::from_secs(300),
        repeat_interval: Duration::from_secs(4 * 3600),
        mute_time_intervals: Vec::new(),
        active_time_intervals: Vec::new(),
    }
}

/// Project an alert's labels onto a route's `group_by` list, producing the
/// key identifying which aggregation group it belongs to.
///
/// `group_by_all` collapses grouping entirely: every distinct label set
/// becomes its own group, equivalent to grouping by every label the alert
/// carries. A label absent from the alert contributes an explicit marker
/// distinct from a label present with an empty value (see
/// [`Labels::get_or_empty`] for why that distinction matters).
#[must_use]
pub fn group_key(route: &RouteConfig, labels: &Labels) -> GroupKey {
    if route.group_by_all {
        return GroupKey::new(labels.fingerprint());
    }
    if route.group_by.is_empty() {
        return GroupKey::new(String::new());
    }
    let mut projected = Labels::new();
    for name in &route.group_by {
        match labels.get(name) {
            Some(value) => projected.insert(name.clone(), value),
            None => projected.insert(name.clone(), "\u{0}absent"),
        }
    }
    GroupKey::new(projected.fingerprint())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(receiver: &str, matchers: Vec<Matcher>) -> Route {
        Route {
            receiver: ReceiverName::new(receiver),
            matchers,
            group_by: Vec::new(),
            group_by_all: false,
            group_wait: None,
            group_interval: None,
            repeat_interval: None,
            continue_matching: false,
            mute_time_intervals: Vec::new(),
            active_time_intervals: Vec::new(),
            routes: Vec::new(),
        }
    }

    #[test]
    fn root_matches_everything() {
        let root = leaf("default", Vec::new());
        let matches = root.find_matches(&Labels::from_pairs([("alertname", "X")]));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].receiver.as_str(), "default");
    }

    #[test]
    fn first_match_wins_without_continue() {
        let mut root = leaf("default", Vec::new());
        root.routes = vec![
            leaf("team-a", vec![Matcher::equal("team", "a")]),
            leaf("catch-all", Vec::new()),
        ];
        let matches = root.find_matches(&Labels::from_pairs([("team", "a")]));
        let receivers: Vec<_> = matches.iter().map(|m| m.receiver.as_str()).collect();
        assert_eq!(receivers, vec!["default", "team-a"]);
    }

    #[test]
    fn continue_matching_keeps_evaluating_siblings() {
        let mut root = leaf("default", Vec::new());
        let mut team_a = leaf("team-a", vec![Matcher::equal("team", "a")]);
        team_a.continue_matching = true;
        root.routes = vec![team_a, leaf("catch-all", Vec::new())];
        let matches = root.find_matches(&Labels::from_pairs([("team", "a")]));
        let receivers: Vec<_> = matches.iter().map(|m| m.receiver.as_str()).collect();
        assert_eq!(receivers, vec!["default", "team-a", "catch-all"]);
    }

    #[test]
    fn group_key_distinguishes_absent_from_empty() {
        let mut route = defaults();
        route.group_by = vec!["team".to_string()];
        let with_empty = group_key(&route, &Labels::from_pairs([("team", "")]));
        let without = group_key(&route, &Labels::new());
        assert_ne!(with_empty, without);
    }

    #[test]
    fn distinct_routes_get_distinct_ids() {
        let mut root = leaf("default", Vec::new());
        root.routes = vec![
            leaf("team-a", vec![Matcher::equal("team", "a")]),
            leaf("team-b", vec![Matcher::equal("team", "b")]),
        ];
        let a = root.find_matches(&Labels::from_pairs([("team", "a")]));
        let b = root.find_matches(&Labels::from_pairs([("team", "b")]));
        assert_ne!(a.last().unwrap().id, b.last().unwrap().id);
    }

    #[test]
    fn group_by_all_separates_every_distinct_label_set() {
        let mut route = defaults();
        route.group_by_all = true;
        let a = group_key(&route, &Labels::from_pairs([("a", "1")]));
        let b = group_key(&route, &Labels::from_pairs([("a", "2")]));
        assert_ne!(a, b);
    }
}
