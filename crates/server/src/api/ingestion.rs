use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use relaymux_core::{Alert, Labels};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// One alert as submitted by an upstream producer.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct IngestAlert {
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub generator_url: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct IngestResponse {
    pub accepted: usize,
}

/// Accept a batch of alerts. Missing `starts_at` defaults to now; missing
/// `ends_at` defaults to `now + resolve_timeout` -- the producer must
/// keep re-posting a still-firing alert before that horizon or it is
/// garbage-collected as resolved.
///
/// Validation is all-or-nothing: if any submitted alert is malformed the
/// whole batch is rejected and none are merged into the provider.
#[utoipa::path(
    post,
    path = "/api/v2/alerts",
    tag = "Ingestion",
    request_body = Vec<IngestAlert>,
    responses(
        (status = 200, description = "alerts accepted", body = IngestResponse),
        (status = 400, description = "one or more alerts failed validation"),
    )
)]
pub async fn post_alerts(
    State(state): State<AppState>,
    Json(alerts): Json<Vec<IngestAlert>>,
) -> Result<(StatusCode, Json<IngestResponse>), ServerError> {
    let now = Utc::now();
    let resolve_timeout = {
        let config = state.config.read().await;
        chrono::Duration::from_std(config.global.resolve_timeout).unwrap_or(chrono::Duration::minutes(5))
    };

    let accepted = alerts.len();
    let converted: Vec<Alert> = alerts.into_iter().map(|a| to_alert(a, now, resolve_timeout)).collect();
    state.provider.put(converted).await?;

    Ok((StatusCode::OK, Json(IngestResponse { accepted })))
}

fn to_alert(dto: IngestAlert, now: DateTime<Utc>, resolve_timeout: chrono::Duration) -> Alert {
    let mut alert = Alert::new(Labels::from_pairs(dto.labels), Labels::from_pairs(dto.annotations));
    alert.starts_at = dto.starts_at.unwrap_or(now);
    alert.ends_at = Some(dto.ends_at.unwrap_or(now + resolve_timeout));
    alert.generator_url = dto.generator_url;
    alert.updated_at = now;
    alert
}

/// List every alert currently held by the provider, firing or resolved
/// but not yet garbage-collected.
#[utoipa::path(
    get,
    path = "/api/v2/alerts",
    tag = "Ingestion",
    responses((status = 200, description = "current alerts", body = serde_json::Value))
)]
pub async fn list_alerts(State(state): State<AppState>) -> Json<Vec<Alert>> {
    Json(state.provider.get_pending().await)
}
