use thiserror::Error;

/// Top-level error type shared across RelayMux's core data-model operations.
///
/// Subsystem crates (provider, dispatch, pipeline, silence, nflog, cluster)
/// define their own narrower error enums and convert into this one at their
/// public boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}
