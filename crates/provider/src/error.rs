use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// One or more alerts in a `put` batch failed validation. Carries the
    /// offending alerts' error messages; per the ingestion contract,
    /// partial success is not allowed -- the whole batch is rejected.
    #[error("validation failed for {} of the submitted alerts: {}", .0.len(), .0.join("; "))]
    Validation(Vec<String>),

    #[error("not found: {0}")]
    NotFound(String),

    /// The subscriber's buffer overflowed; it must call `subscribe` again
    /// to receive a fresh snapshot and resume the stream.
    #[error("subscription buffer overflowed, reconnect required")]
    Overflow,
}
