use relaymux_notify::{EmailConfig, SlackConfig, WebhookConfig};
use serde::{Deserialize, Serialize};

/// One concrete integration bound to a receiver, plus whether it wants
/// resolved-alert notifications. Mirrors the `Notifier` /
/// `ResolvedSender` capability split: the pipeline decides whether to
/// send at all, this just says whether an empty firing set with only
/// resolved alerts left still counts as "send".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrationConfig {
    Webhook {
        #[serde(flatten)]
        config: WebhookConfig,
        #[serde(default)]
        send_resolved: bool,
    },
    Slack {
        #[serde(flatten)]
        config: SlackConfig,
        #[serde(default)]
        send_resolved: bool,
    },
    Email {
        #[serde(flatten)]
        config: EmailConfig,
        #[serde(default)]
        send_resolved: bool,
    },
    Log {
        #[serde(default)]
        send_resolved: bool,
    },
}

impl IntegrationConfig {
    #[must_use]
    pub fn send_resolved(&self) -> bool {
        match self {
            Self::Webhook { send_resolved, .. }
            | Self::Slack { send_resolved, .. }
            | Self::Email { send_resolved, .. }
            | Self::Log { send_resolved } => *send_resolved,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Webhook { .. } => "webhook",
            Self::Slack { .. } => "slack",
            Self::Email { .. } => "email",
            Self::Log { .. } => "log",
        }
    }
}

/// A named set of integrations. A route's `receiver` field names one of
/// these by `name`; every integration it lists is invoked on flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub name: String,
    #[serde(default)]
    pub integrations: Vec<IntegrationConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_integration_round_trips_through_toml() {
        let toml_src = r#"
            type = "webhook"
            url = "https://example.com/hook"
            send_resolved = true
        "#;
        let integration: IntegrationConfig = toml::from_str(toml_src).unwrap();
        assert!(integration.send_resolved());
        assert_eq!(integration.kind(), "webhook");
    }

    #[test]
    fn log_integration_defaults_send_resolved_to_false() {
        let integration: IntegrationConfig = toml::from_str(r#"type = "log""#).unwrap();
        assert!(!integration.send_resolved());
    }
}
