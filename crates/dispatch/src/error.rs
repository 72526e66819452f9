use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    State(#[from] relaymux_state::StateError),

    #[error("corrupt group record: {0}")]
    Corruption(String),
}
