use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("failed to encode gossip frame: {0}")]
    Encode(String),

    #[error("failed to decode gossip frame: {0}")]
    Decode(String),

    #[error(transparent)]
    Nflog(#[from] relaymux_nflog::NflogError),

    #[error(transparent)]
    Silence(#[from] relaymux_silence::SilenceError),

    #[error(transparent)]
    State(#[from] relaymux_state::StateError),
}
