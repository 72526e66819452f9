use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Silence(#[from] relaymux_silence::SilenceError),

    #[error(transparent)]
    Nflog(#[from] relaymux_nflog::NflogError),

    #[error("notifier {notifier:?} failed: {source}")]
    Notify { notifier: String, #[source] source: relaymux_notify::NotifyError },

    #[error("pipeline deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: u32 },
}
