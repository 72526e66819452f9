use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings with a cluster-wide default, overridable per-receiver in
/// `[receivers.*]` and per-route in the route tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Base URL used when rendering links back to this instance in
    /// outgoing notifications.
    #[serde(default)]
    pub external_url: Option<String>,

    #[serde(default = "default_resolve_timeout", with = "relaymux_core::duration_format::required")]
    pub resolve_timeout: Duration,

    #[serde(default = "default_smtp_smarthost")]
    pub smtp_smarthost: Option<String>,

    #[serde(default = "default_smtp_from")]
    pub smtp_from: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            external_url: None,
            resolve_timeout: default_resolve_timeout(),
            smtp_smarthost: default_smtp_smarthost(),
            smtp_from: default_smtp_from(),
        }
    }
}

fn default_resolve_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_smtp_smarthost() -> Option<String> {
    None
}

fn default_smtp_from() -> Option<String> {
    None
}
