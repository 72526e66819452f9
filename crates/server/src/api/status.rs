use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use relaymux_config::{IntegrationConfig, RelayConfig};
use serde::Serialize;

use crate::state::AppState;

/// Sanitized view of one configured receiver: names and integration
/// kinds only, never the underlying webhook URLs, tokens, or SMTP
/// credentials.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ReceiverSnapshot {
    pub name: String,
    pub integrations: Vec<String>,
}

impl From<&relaymux_config::ReceiverConfig> for ReceiverSnapshot {
    fn from(receiver: &relaymux_config::ReceiverConfig) -> Self {
        Self {
            name: receiver.name.clone(),
            integrations: receiver.integrations.iter().map(IntegrationConfig::kind).map(str::to_string).collect(),
        }
    }
}

/// Sanitized view of the loaded configuration document, safe to expose
/// over the status API: secrets (webhook auth, Slack tokens, SMTP
/// credentials) never appear.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ConfigSnapshot {
    pub resolve_timeout_secs: u64,
    pub receivers: Vec<ReceiverSnapshot>,
    pub inhibit_rule_count: usize,
    pub time_interval_count: usize,
}

impl From<&RelayConfig> for ConfigSnapshot {
    fn from(config: &RelayConfig) -> Self {
        Self {
            resolve_timeout_secs: config.global.resolve_timeout.as_secs(),
            receivers: config.receivers.iter().map(ReceiverSnapshot::from).collect(),
            inhibit_rule_count: config.inhibit_rules.len(),
            time_interval_count: config.time_intervals.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PeerSnapshot {
    pub id: String,
    pub addr: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub cluster_position: usize,
    pub peer_count: usize,
    pub peers: Vec<PeerSnapshot>,
    pub active_alert_count: usize,
    pub active_group_count: usize,
    pub config: ConfigSnapshot,
}

/// Cluster membership, uptime, a sanitized config snapshot, and current
/// in-memory counts -- the instance health/debugging surface an
/// operator or the CLI's status command reads.
#[utoipa::path(
    get,
    path = "/api/v2/status",
    tag = "Status",
    responses((status = 200, description = "instance status", body = StatusResponse))
)]
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let now = Utc::now();
    let config = state.config.read().await;
    let peers = state.cluster.membership().peers().await;

    Json(StatusResponse {
        started_at: state.started_at,
        uptime_seconds: (now - state.started_at).num_seconds(),
        cluster_position: state.cluster.membership().try_position().unwrap_or(0),
        peer_count: peers.len(),
        peers: peers.into_iter().map(|p| PeerSnapshot { id: p.id.to_string(), addr: p.addr }).collect(),
        active_alert_count: state.provider.get_pending().await.len(),
        active_group_count: state.dispatcher.active_group_count().await,
        config: ConfigSnapshot::from(&*config),
    })
}
