use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("request to notification endpoint timed out")]
    Timeout,

    #[error("notification endpoint rate-limited this request")]
    RateLimited,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("notification endpoint rejected the request: {0}")]
    Rejected(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl NotifyError {
    /// Whether a caller should back off and try the same send again, as
    /// opposed to giving up until the next scheduled flush. Malformed
    /// payloads and configuration mistakes won't fix themselves on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidPayload(_) | Self::Configuration(_))
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Connection(err.to_string())
        }
    }
}
