use std::collections::HashSet;

use relaymux_core::{InhibitRule, Route, TimeInterval};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::global::GlobalConfig;
use crate::receivers::ReceiverConfig;
use crate::templates::TemplatesConfig;

/// The whole configuration document, as loaded from a TOML file.
///
/// Reload is atomic at the caller's level: parse and [`RelayConfig::validate`]
/// against a freshly parsed value before swapping it in; a config that
/// fails validation never replaces the one already running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub global: GlobalConfig,

    pub route: Route,

    #[serde(default)]
    pub inhibit_rules: Vec<InhibitRule>,

    #[serde(default)]
    pub receivers: Vec<ReceiverConfig>,

    #[serde(default)]
    pub time_intervals: Vec<TimeInterval>,

    #[serde(default)]
    pub templates: TemplatesConfig,
}

impl RelayConfig {
    /// Parse and validate in one step. A config that parses but fails
    /// validation is still an error -- callers should keep running the
    /// previously loaded config rather than swap to this one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks referential integrity: every route's receiver must name a
    /// configured receiver, every mute/active time interval a route
    /// references must exist, and receiver names must be unique. Route
    /// cycles are impossible by construction -- `Route` is a tree, not a
    /// graph with back-edges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut receiver_names = HashSet::new();
        for receiver in &self.receivers {
            if !receiver_names.insert(receiver.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate receiver name {:?}", receiver.name)));
            }
        }

        let interval_names: HashSet<&str> = self.time_intervals.iter().map(|t| t.name.as_str()).collect();

        validate_route_tree(&self.route, &receiver_names, &interval_names)
    }
}

fn validate_route_tree(
    route: &Route,
    receiver_names: &HashSet<&str>,
    interval_names: &HashSet<&str>,
) -> Result<(), ConfigError> {
    if !receiver_names.contains(route.receiver.as_ref()) {
        return Err(ConfigError::Invalid(format!("route references unknown receiver {:?}", route.receiver)));
    }
    for name in route.mute_time_intervals.iter().chain(&route.active_time_intervals) {
        if !interval_names.contains(name.as_str()) {
            return Err(ConfigError::Invalid(format!("route references unknown time interval {name:?}")));
        }
    }
    for child in &route.routes {
        validate_route_tree(child, receiver_names, interval_names)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use relaymux_core::ReceiverName;

    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [route]
            receiver = "default"

            [[receivers]]
            name = "default"

            [[receivers.integrations]]
            type = "log"
        "#
    }

    #[test]
    fn minimal_document_parses_and_validates() {
        let config = RelayConfig::parse(minimal_toml()).unwrap();
        assert_eq!(config.route.receiver, ReceiverName::new("default"));
        assert_eq!(config.receivers.len(), 1);
    }

    #[test]
    fn unresolved_receiver_fails_validation() {
        let toml_src = r#"
            [route]
            receiver = "missing"
        "#;
        let err = RelayConfig::parse(toml_src).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn duplicate_receiver_names_fail_validation() {
        let toml_src = r#"
            [route]
            receiver = "default"

            [[receivers]]
            name = "default"

            [[receivers]]
            name = "default"
        "#;
        let err = RelayConfig::parse(toml_src).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn route_referencing_unknown_time_interval_fails_validation() {
        let toml_src = r#"
            [route]
            receiver = "default"
            mute_time_intervals = ["weekends"]

            [[receivers]]
            name = "default"
        "#;
        let err = RelayConfig::parse(toml_src).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
