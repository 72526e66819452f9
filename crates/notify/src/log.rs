use tracing::info;

use crate::error::NotifyError;
use crate::notifier::Notifier;
use crate::payload::NotificationPayload;

/// A notifier that logs the notification and returns success without
/// performing any external I/O. Useful for local development and tests.
pub struct LogNotifier {
    name: String,
}

impl LogNotifier {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        info!(
            notifier = %self.name,
            receiver = %payload.receiver,
            group_key = %payload.group_key,
            status = ?payload.status,
            alert_count = payload.alert_count(),
            "log notifier sent notification"
        );
        Ok(())
    }
}
