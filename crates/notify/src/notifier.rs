use async_trait::async_trait;

use crate::error::NotifyError;
use crate::payload::NotificationPayload;

/// Strongly-typed notifier trait with native `async fn`.
///
/// Not object-safe, since native `async fn` desugars to an opaque
/// `impl Future` return type. For dynamic dispatch, use [`DynNotifier`]
/// instead -- every `Notifier` automatically implements it via the
/// blanket implementation below.
pub trait Notifier: Send + Sync {
    /// Returns the unique name of this notifier instance.
    fn name(&self) -> &str;

    /// Send one rendered notification for a group flush.
    fn notify(
        &self,
        payload: &NotificationPayload,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// Object-safe notifier trait for use behind `Arc<dyn DynNotifier>`.
///
/// You generally should not implement this trait directly -- implement
/// [`Notifier`] and rely on the blanket implementation.
#[async_trait]
pub trait DynNotifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: Notifier + Sync> DynNotifier for T {
    fn name(&self) -> &str {
        Notifier::name(self)
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        Notifier::notify(self, payload).await
    }
}
