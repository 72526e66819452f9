use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::NotifyError;
use crate::notifier::Notifier;
use crate::payload::{BatchStatus, NotificationPayload};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub token: String,
    pub default_channel: String,
    #[serde(default = "default_slack_api_base_url")]
    pub api_base_url: String,
}

fn default_slack_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

impl SlackConfig {
    #[must_use]
    pub fn new(token: impl Into<String>, default_channel: impl Into<String>) -> Self {
        Self { token: token.into(), default_channel: default_channel.into(), api_base_url: default_slack_api_base_url() }
    }
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts a text summary of a group flush to a Slack channel via
/// `chat.postMessage`.
pub struct SlackNotifier {
    config: SlackConfig,
    client: Client,
}

impl SlackNotifier {
    #[must_use]
    pub fn new(config: SlackConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    #[must_use]
    pub fn with_client(config: SlackConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn render(payload: &NotificationPayload) -> String {
        let verb = match payload.status {
            BatchStatus::Firing => "FIRING",
            BatchStatus::Resolved => "RESOLVED",
        };
        let alertname = payload.common_labels.get("alertname").unwrap_or("alert");
        format!(
            "[{verb}:{}] {alertname} -- {} alert(s) for receiver {}",
            payload.alert_count(),
            payload.alert_count(),
            payload.receiver
        )
    }
}

impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let text = Self::render(payload);
        let request = PostMessageRequest { channel: &self.config.default_channel, text };

        debug!(channel = %self.config.default_channel, "posting Slack notification");

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.config.api_base_url))
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Slack API rate limit hit");
            return Err(NotifyError::RateLimited);
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Rejected(format!("malformed Slack response: {e}")))?;

        if body.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(body.error.unwrap_or_else(|| "unknown Slack error".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use relaymux_core::{Alert, GroupKey, Labels, ReceiverName, RouteId};

    use super::*;

    #[test]
    fn render_includes_alertname_and_count() {
        let alert = Alert::new(Labels::from_pairs([("alertname", "HighCPU")]), Labels::new());
        let payload = NotificationPayload::from_alerts(
            ReceiverName::new("ops"),
            RouteId::new("0"),
            GroupKey::new("gk"),
            vec![alert],
            None,
        );
        let text = SlackNotifier::render(&payload);
        assert!(text.contains("HighCPU"));
        assert!(text.contains("FIRING"));
        assert!(text.contains("ops"));
    }
}
