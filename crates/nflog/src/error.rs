use thiserror::Error;

#[derive(Debug, Error)]
pub enum NflogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    State(#[from] relaymux_state::StateError),

    #[error("corrupt snapshot entry: {0}")]
    Corruption(String),
}
