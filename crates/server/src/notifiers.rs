//! Turns a loaded [`relaymux_config::RelayConfig`]'s receiver table into
//! concrete notifier instances the pipeline can call through.

use std::collections::HashMap;
use std::sync::Arc;

use relaymux_config::{IntegrationConfig, RelayConfig};
use relaymux_notify::{DynNotifier, EmailNotifier, LogNotifier, SlackNotifier, WebhookNotifier};

/// One integration bound to a receiver: the notifier itself, plus
/// whether the receiver wants a flush sent when only resolved alerts
/// remain.
#[derive(Clone)]
pub struct BoundIntegration {
    pub notifier: Arc<dyn DynNotifier>,
    pub send_resolved: bool,
}

/// Build every receiver's integrations up front, so a scheduler tick
/// never pays client-construction cost (TLS handshakes, SMTP transport
/// setup) on the hot path.
#[must_use]
pub fn build(config: &RelayConfig) -> HashMap<String, Vec<BoundIntegration>> {
    let mut out = HashMap::new();
    for receiver in &config.receivers {
        let mut bound = Vec::with_capacity(receiver.integrations.len());
        for (i, integration) in receiver.integrations.iter().enumerate() {
            let name = format!("{}-{}-{i}", receiver.name, integration.kind());
            let notifier: Arc<dyn DynNotifier> = match integration {
                IntegrationConfig::Webhook { config, .. } => {
                    Arc::new(WebhookNotifier::new(name, config.clone()))
                }
                IntegrationConfig::Slack { config, .. } => Arc::new(SlackNotifier::new(config.clone())),
                IntegrationConfig::Email { config, .. } => match EmailNotifier::new(config.clone()) {
                    Ok(notifier) => Arc::new(notifier),
                    Err(err) => {
                        tracing::error!(receiver = %receiver.name, error = %err, "failed to build email notifier, skipping");
                        continue;
                    }
                },
                IntegrationConfig::Log { .. } => Arc::new(LogNotifier::new(name)),
            };
            bound.push(BoundIntegration { notifier, send_resolved: integration.send_resolved() });
        }
        out.insert(receiver.name.clone(), bound);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_entry_per_receiver() {
        let toml_src = r#"
            [route]
            receiver = "default"

            [[receivers]]
            name = "default"

            [[receivers.integrations]]
            type = "log"
        "#;
        let config = RelayConfig::parse(toml_src).unwrap();
        let built = build(&config);
        assert_eq!(built.get("default").unwrap().len(), 1);
    }
}
