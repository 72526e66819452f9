use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use relaymux_core::AlertStatus;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::notifier::Notifier;
use crate::payload::{BatchStatus, NotificationPayload};

/// Configuration for the SMTP email notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from_address: String,
    pub to_address: String,
    #[serde(default = "default_true")]
    pub tls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

impl EmailConfig {
    #[must_use]
    pub fn new(smtp_host: impl Into<String>, from_address: impl Into<String>, to_address: impl Into<String>) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: from_address.into(),
            to_address: to_address.into(),
            tls: true,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// Sends a plain-text summary of a group flush over SMTP via `lettre`.
pub struct EmailNotifier {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] if the SMTP transport can't
    /// be built from `config` (e.g. an unreachable relay hostname).
    pub fn new(config: EmailConfig) -> Result<Self, NotifyError> {
        let transport = build_transport(&config)?;
        Ok(Self { config, transport })
    }

    #[must_use]
    pub fn with_transport(config: EmailConfig, transport: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self { config, transport }
    }

    fn render(payload: &NotificationPayload) -> (String, String) {
        let alertname = payload.common_labels.get("alertname").unwrap_or("alert");
        let verb = match payload.status {
            BatchStatus::Firing => "FIRING",
            BatchStatus::Resolved => "RESOLVED",
        };
        let subject = format!("[{verb}] {alertname} ({} alert(s))", payload.alert_count());

        let mut body = String::new();
        for alert in payload.firing.iter().chain(payload.resolved.iter()) {
            let status = match alert.status() {
                AlertStatus::Firing => "firing",
                AlertStatus::Resolved => "resolved",
            };
            body.push_str(&format!("[{status}] {}\n", alert.labels));
        }
        (subject, body)
    }
}

impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let (subject, body) = Self::render(payload);
        let message = build_message(&self.config, &subject, &body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Connection(format!("SMTP send failed: {e}")))?;
        Ok(())
    }
}

fn build_message(config: &EmailConfig, subject: &str, body: &str) -> Result<Message, NotifyError> {
    let from: Mailbox = config
        .from_address
        .parse()
        .map_err(|e| NotifyError::Configuration(format!("invalid from address: {e}")))?;
    let to: Mailbox = config
        .to_address
        .parse()
        .map_err(|e| NotifyError::Configuration(format!("invalid to address: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| NotifyError::Configuration(format!("failed to build message: {e}")))
}

fn build_transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
    let builder = if config.tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| NotifyError::Configuration(format!("SMTP TLS relay error: {e}")))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    };

    let builder = builder.port(config.smtp_port);

    let builder = if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        builder.credentials(Credentials::new(user.clone(), pass.clone()))
    } else {
        builder
    };

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use relaymux_core::{Alert, GroupKey, Labels, ReceiverName, RouteId};

    use super::*;

    #[test]
    fn render_produces_firing_subject_and_body() {
        let alert = Alert::new(Labels::from_pairs([("alertname", "HighCPU")]), Labels::new());
        let payload = NotificationPayload::from_alerts(
            ReceiverName::new("ops"),
            RouteId::new("0"),
            GroupKey::new("gk"),
            vec![alert],
            None,
        );
        let (subject, body) = EmailNotifier::render(&payload);
        assert!(subject.contains("FIRING"));
        assert!(subject.contains("HighCPU"));
        assert!(body.contains("[firing]"));
    }

    #[test]
    fn build_message_rejects_malformed_address() {
        let config = EmailConfig::new("smtp.example.com", "not-an-address", "also-bad");
        assert!(build_message(&config, "subject", "body").is_err());
    }
}
