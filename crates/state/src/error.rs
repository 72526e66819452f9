use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("checksum mismatch on snapshot load: {0}")]
    Corruption(String),
}
