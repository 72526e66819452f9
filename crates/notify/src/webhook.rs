use std::collections::HashMap;
use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::NotifyError;
use crate::notifier::Notifier;
use crate::payload::NotificationPayload;

type HmacSha256 = Hmac<Sha256>;

/// Authentication method applied to the outgoing webhook request.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Bearer(String),
    Basic { username: String, password: String },
    ApiKey { header: String, value: String },
    HmacSha256 { secret: String, header: String },
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
            Self::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).field("password", &"[REDACTED]").finish()
            }
            Self::ApiKey { header, .. } => {
                f.debug_struct("ApiKey").field("header", header).field("value", &"[REDACTED]").finish()
            }
            Self::HmacSha256 { header, .. } => {
                f.debug_struct("HmacSha256").field("secret", &"[REDACTED]").field("header", header).finish()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub auth: Option<AuthMethod>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_webhook_timeout", with = "relaymux_core::duration_format::required")]
    pub timeout: Duration,
    #[serde(default)]
    pub success_status_codes: Vec<u16>,
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(10)
}

impl WebhookConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: None,
            headers: HashMap::new(),
            timeout: Duration::from_secs(10),
            success_status_codes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Posts the rendered payload as JSON to an arbitrary HTTP endpoint,
/// Alertmanager's "generic webhook receiver" equivalent.
pub struct WebhookNotifier {
    name: String,
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` can't be built (invalid
    /// TLS configuration on the host), matching the teacher webhook
    /// provider's construction-time behavior.
    #[must_use]
    pub fn new(name: impl Into<String>, config: WebhookConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { name: name.into(), config, client }
    }

    #[must_use]
    pub fn with_client(name: impl Into<String>, config: WebhookConfig, client: Client) -> Self {
        Self { name: name.into(), config, client }
    }

    fn is_success(&self, status: u16) -> bool {
        if self.config.success_status_codes.is_empty() {
            (200..300).contains(&status)
        } else {
            self.config.success_status_codes.contains(&status)
        }
    }

    fn sign(secret: &str, body: &[u8]) -> Result<String, NotifyError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NotifyError::Configuration(format!("invalid HMAC key: {e}")))?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| NotifyError::InvalidPayload(format!("failed to serialize payload: {e}")))?;

        debug!(url = %self.config.url, "dispatching webhook notification");

        let mut request = self.client.post(&self.config.url).header("Content-Type", "application/json");

        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        request = match &self.config.auth {
            Some(AuthMethod::Bearer(token)) => request.bearer_auth(token),
            Some(AuthMethod::Basic { username, password }) => request.basic_auth(username, Some(password)),
            Some(AuthMethod::ApiKey { header, value }) => request.header(header, value),
            Some(AuthMethod::HmacSha256 { secret, header }) => {
                let signature = Self::sign(secret, &body)?;
                request.header(header, format!("sha256={signature}"))
            }
            None => request,
        };

        let response = request.body(body).send().await?;
        let status = response.status().as_u16();

        if status == 429 {
            warn!("webhook endpoint returned 429");
            return Err(NotifyError::RateLimited);
        }

        if self.is_success(status) {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected(format!("status {status}: {text}")))
        }
    }
}
