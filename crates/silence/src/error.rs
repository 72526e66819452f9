use thiserror::Error;

#[derive(Debug, Error)]
pub enum SilenceError {
    #[error("silence not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] relaymux_core::CoreError),

    #[error(transparent)]
    State(#[from] relaymux_state::StateError),

    #[error("corrupt silence record: {0}")]
    Corruption(String),
}
