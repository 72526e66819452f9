use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use relaymux_core::{Matcher, Silence, SilenceState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServerError;
use crate::state::AppState;

/// A matcher as it appears on the wire: `isEqual` is the negation of the
/// internal `Matcher::is_negative` field (a matcher that must equal the
/// given value, rather than must not).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MatcherDto {
    pub name: String,
    pub value: String,
    #[serde(rename = "isEqual", default = "default_true")]
    pub is_equal: bool,
    #[serde(rename = "isRegex", default)]
    pub is_regex: bool,
}

fn default_true() -> bool {
    true
}

impl MatcherDto {
    fn into_matcher(self) -> Result<Matcher, relaymux_core::CoreError> {
        Matcher::new(self.name, self.value, self.is_regex, !self.is_equal)
    }

    fn from_matcher(matcher: &Matcher) -> Self {
        Self {
            name: matcher.name.clone(),
            value: matcher.value.clone(),
            is_equal: !matcher.is_negative,
            is_regex: matcher.is_regex,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateSilenceRequest {
    pub matchers: Vec<MatcherDto>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SilenceResponse {
    pub id: Uuid,
    pub matchers: Vec<MatcherDto>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: String,
    pub comment: String,
    pub updated_at: DateTime<Utc>,
    pub status: String,
}

impl SilenceResponse {
    fn from_silence(silence: Silence, now: DateTime<Utc>) -> Self {
        let status = match silence.state_at(now) {
            SilenceState::Pending => "pending",
            SilenceState::Active => "active",
            SilenceState::Expired => "expired",
        }
        .to_string();
        Self {
            id: silence.id,
            matchers: silence.matchers.iter().map(MatcherDto::from_matcher).collect(),
            starts_at: silence.starts_at,
            ends_at: silence.ends_at,
            created_by: silence.created_by,
            comment: silence.comment,
            updated_at: silence.updated_at,
            status,
        }
    }
}

fn convert_matchers(dtos: Vec<MatcherDto>) -> Result<Vec<Matcher>, ServerError> {
    dtos.into_iter()
        .map(|dto| dto.into_matcher().map_err(ServerError::from))
        .collect()
}

/// Create a silence. Returns its generated id.
#[utoipa::path(
    post,
    path = "/api/v2/silences",
    tag = "Silence",
    request_body = CreateSilenceRequest,
    responses((status = 200, description = "silence created", body = SilenceResponse))
)]
pub async fn create_silence(
    State(state): State<AppState>,
    Json(req): Json<CreateSilenceRequest>,
) -> Result<Json<SilenceResponse>, ServerError> {
    let matchers = convert_matchers(req.matchers)?;
    let silence = state
        .silences
        .create(matchers, req.starts_at, req.ends_at, req.created_by, req.comment)
        .await?;
    state.cluster.broadcast_silence(silence.clone()).await.ok();
    Ok(Json(SilenceResponse::from_silence(silence, Utc::now())))
}

/// Replace an existing silence's content, keeping its id.
#[utoipa::path(
    put,
    path = "/api/v2/silences/{id}",
    tag = "Silence",
    params(("id" = Uuid, Path, description = "silence id")),
    request_body = CreateSilenceRequest,
    responses(
        (status = 200, description = "silence updated", body = SilenceResponse),
        (status = 404, description = "no silence with this id"),
    )
)]
pub async fn update_silence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateSilenceRequest>,
) -> Result<Json<SilenceResponse>, ServerError> {
    let matchers = convert_matchers(req.matchers)?;
    let silence = state
        .silences
        .update(id, matchers, req.starts_at, req.ends_at, req.created_by, req.comment)
        .await?;
    state.cluster.broadcast_silence(silence.clone()).await.ok();
    Ok(Json(SilenceResponse::from_silence(silence, Utc::now())))
}

/// List every silence currently stored.
#[utoipa::path(
    get,
    path = "/api/v2/silences",
    tag = "Silence",
    responses((status = 200, description = "silences", body = Vec<SilenceResponse>))
)]
pub async fn list_silences(State(state): State<AppState>) -> Result<Json<Vec<SilenceResponse>>, ServerError> {
    let now = Utc::now();
    let silences = state.silences.list().await?;
    Ok(Json(silences.into_iter().map(|s| SilenceResponse::from_silence(s, now)).collect()))
}

/// Fetch one silence by id.
#[utoipa::path(
    get,
    path = "/api/v2/silences/{id}",
    tag = "Silence",
    params(("id" = Uuid, Path, description = "silence id")),
    responses(
        (status = 200, description = "silence", body = SilenceResponse),
        (status = 404, description = "no silence with this id"),
    )
)]
pub async fn get_silence(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SilenceResponse>, ServerError> {
    let silence = state.silences.get(id).await?;
    Ok(Json(SilenceResponse::from_silence(silence, Utc::now())))
}

/// Expire a silence immediately.
#[utoipa::path(
    delete,
    path = "/api/v2/silences/{id}",
    tag = "Silence",
    params(("id" = Uuid, Path, description = "silence id")),
    responses(
        (status = 200, description = "silence expired", body = SilenceResponse),
        (status = 404, description = "no silence with this id"),
    )
)]
pub async fn expire_silence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SilenceResponse>, ServerError> {
    let silence = state.silences.expire(id).await?;
    state.cluster.broadcast_silence(silence.clone()).await.ok();
    Ok(Json(SilenceResponse::from_silence(silence, Utc::now())))
}
