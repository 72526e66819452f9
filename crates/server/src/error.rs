use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] relaymux_config::ConfigError),

    #[error(transparent)]
    Provider(#[from] relaymux_provider::ProviderError),

    #[error(transparent)]
    Silence(#[from] relaymux_silence::SilenceError),

    #[error(transparent)]
    Core(#[from] relaymux_core::CoreError),

    #[error(transparent)]
    Dispatch(#[from] relaymux_dispatch::DispatchError),

    #[error(transparent)]
    Pipeline(#[from] relaymux_pipeline::PipelineError),

    #[error(transparent)]
    Persistence(#[from] crate::persistence::PersistenceError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Provider(relaymux_provider::ProviderError::Validation(errs)) => {
                (StatusCode::BAD_REQUEST, errs.join("; "))
            }
            Self::Provider(relaymux_provider::ProviderError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, msg.clone())
            }
            Self::Provider(relaymux_provider::ProviderError::Overflow) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            Self::Silence(relaymux_silence::SilenceError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, msg.clone())
            }
            Self::Silence(_) | Self::Core(_) | Self::Config(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Io(_) | Self::Dispatch(_) | Self::Pipeline(_) | Self::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
