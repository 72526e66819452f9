//! Thin HTTP client for the RelayMux server's ingestion, silence, and
//! status APIs. Collapses what would elsewhere be a separate client
//! crate plus an ops layer on top of it into one module, since this
//! gateway's wire surface is three resources wide rather than twenty.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to reach server: {0}")]
    Connection(String),

    #[error("failed to decode server response: {0}")]
    Deserialization(String),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// One alert as returned by `GET /api/v2/alerts`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertView {
    pub labels: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: std::collections::BTreeMap<String, String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub timeout: bool,
}

/// Wire shape of a silence matcher, matching the Silence API's
/// `{name, value, isRegex, isEqual}` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherView {
    pub name: String,
    pub value: String,
    #[serde(rename = "isRegex", default)]
    pub is_regex: bool,
    #[serde(rename = "isEqual", default = "default_true")]
    pub is_equal: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSilenceRequest {
    pub matchers: Vec<MatcherView>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: String,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceView {
    pub id: Uuid,
    pub matchers: Vec<MatcherView>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub comment: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusView {
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub cluster_position: usize,
    pub peer_count: usize,
    pub active_alert_count: usize,
    pub active_group_count: usize,
    pub config: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for one RelayMux server instance.
#[derive(Debug, Clone)]
pub struct RelayMuxClient {
    http: Client,
    base_url: String,
}

impl RelayMuxClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build().unwrap_or_default();
        Self { http, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    pub async fn health(&self) -> Result<bool, Error> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(response.status().is_success())
    }

    pub async fn list_alerts(&self) -> Result<Vec<AlertView>, Error> {
        self.get(&format!("{}/api/v2/alerts", self.base_url)).await
    }

    pub async fn post_alerts(&self, alerts: &serde_json::Value) -> Result<serde_json::Value, Error> {
        self.post(&format!("{}/api/v2/alerts", self.base_url), alerts).await
    }

    pub async fn list_silences(&self) -> Result<Vec<SilenceView>, Error> {
        self.get(&format!("{}/api/v2/silences", self.base_url)).await
    }

    pub async fn get_silence(&self, id: Uuid) -> Result<SilenceView, Error> {
        self.get(&format!("{}/api/v2/silences/{id}", self.base_url)).await
    }

    pub async fn create_silence(&self, req: &CreateSilenceRequest) -> Result<SilenceView, Error> {
        self.post(&format!("{}/api/v2/silences", self.base_url), req).await
    }

    pub async fn update_silence(&self, id: Uuid, req: &CreateSilenceRequest) -> Result<SilenceView, Error> {
        let response = self
            .http
            .put(format!("{}/api/v2/silences/{id}", self.base_url))
            .json(req)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Self::check_status(response).await
    }

    pub async fn expire_silence(&self, id: Uuid) -> Result<SilenceView, Error> {
        let response = self
            .http
            .delete(format!("{}/api/v2/silences/{id}", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Self::check_status(response).await
    }

    pub async fn status(&self) -> Result<StatusView, Error> {
        self.get(&format!("{}/api/v2/status", self.base_url)).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, Error> {
        let response = self.http.get(url).send().await.map_err(|e| Error::Connection(e.to_string()))?;
        Self::check_status(response).await
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(&self, url: &str, body: &B) -> Result<T, Error> {
        let response = self.http.post(url).json(body).send().await.map_err(|e| Error::Connection(e.to_string()))?;
        Self::check_status(response).await
    }

    async fn check_status<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, Error> {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(|e| Error::Deserialization(e.to_string()))
        } else {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
            Err(Error::Api { status: status.as_u16(), message })
        }
    }
}
