//! The alert provider: the single point of ingestion, an in-memory
//! fingerprint-keyed map, and a fan-out point for subscribers (the
//! dispatcher is the sole logical subscriber in this system, but the
//! contract supports more).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use relaymux_core::{Alert, Fingerprint};

use crate::error::ProviderError;

/// An event delivered to a subscriber: either the initial snapshot or one
/// merged alert update.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    Snapshot(Vec<Alert>),
    Merged(Alert),
}

/// A single-consumer, buffered subscription. On buffer overflow the
/// channel closes; [`Subscription::recv`] then returns
/// [`ProviderError::Overflow`] and the caller must call
/// [`AlertProvider::subscribe`] again.
pub struct Subscription {
    rx: mpsc::Receiver<ProviderEvent>,
    overflowed: Arc<AtomicBool>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Result<Option<ProviderEvent>, ProviderError> {
        if self.overflowed.load(Ordering::Acquire) {
            return Err(ProviderError::Overflow);
        }
        match self.rx.recv().await {
            Some(event) => Ok(Some(event)),
            None => Err(ProviderError::Overflow),
        }
    }
}

struct SubscriberEntry {
    tx: mpsc::Sender<ProviderEvent>,
    overflowed: Arc<AtomicBool>,
}

/// In-memory alert store: validates and merges incoming alerts by
/// fingerprint, and fans merged updates out to subscribers.
pub struct AlertProvider {
    alerts: Arc<RwLock<HashMap<Fingerprint, Alert>>>,
    subscribers: Arc<RwLock<Vec<SubscriberEntry>>>,
    subscriber_buffer: usize,
}

impl Default for AlertProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

impl AlertProvider {
    #[must_use]
    pub fn new(subscriber_buffer: usize) -> Self {
        Self {
            alerts: Arc::new(RwLock::new(HashMap::new())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            subscriber_buffer,
        }
    }

    /// Validate and merge a batch of alerts. Either every alert is
    /// accepted, or none are -- the contract disallows partial success.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Validation`] listing every offending
    /// alert if any fails [`Alert::validate`].
    pub async fn put(&self, incoming: Vec<Alert>) -> Result<(), ProviderError> {
        let mut offenders = Vec::new();
        for alert in &incoming {
            if let Err(e) = alert.validate() {
                offenders.push(format!("{}: {e}", alert.labels));
            }
        }
        if !offenders.is_empty() {
            return Err(ProviderError::Validation(offenders));
        }

        let mut merged = Vec::with_capacity(incoming.len());
        {
            let mut alerts = self.alerts.write().await;
            for alert in incoming {
                let fingerprint = alert.fingerprint();
                let updated = match alerts.get(&fingerprint) {
                    Some(existing) => Alert::merge(existing, &alert),
                    None => alert,
                };
                alerts.insert(fingerprint, updated.clone());
                merged.push(updated);
            }
        }

        self.publish(&merged).await;
        Ok(())
    }

    async fn publish(&self, merged: &[Alert]) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|entry| {
            for alert in merged {
                if entry.tx.try_send(ProviderEvent::Merged(alert.clone())).is_err() {
                    tracing::warn!("subscriber buffer overflowed, dropping subscription");
                    entry.overflowed.store(true, Ordering::Release);
                    return false;
                }
            }
            true
        });
    }

    /// Subscribe to the alert stream: the current snapshot first, then
    /// every future merged write.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);
        let snapshot: Vec<Alert> = self.alerts.read().await.values().cloned().collect();
        let _ = tx.try_send(ProviderEvent::Snapshot(snapshot));
        let overflowed = Arc::new(AtomicBool::new(false));
        self.subscribers
            .write()
            .await
            .push(SubscriberEntry { tx, overflowed: overflowed.clone() });
        Subscription { rx, overflowed }
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if no alert with this
    /// fingerprint is currently held.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Alert, ProviderError> {
        self.alerts
            .read()
            .await
            .get(fingerprint)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(fingerprint.to_string()))
    }

    #[must_use]
    pub async fn get_pending(&self) -> Vec<Alert> {
        self.alerts.read().await.values().cloned().collect()
    }

    /// Remove alerts whose `ends_at + resolve_timeout` is in the past.
    /// Returns how many were removed.
    pub async fn gc(&self, resolve_timeout: chrono::Duration) -> usize {
        let now = chrono::Utc::now();
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|_, alert| match alert.ends_at {
            None => true,
            Some(ends_at) => ends_at + resolve_timeout > now,
        });
        before - alerts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaymux_core::Labels;

    fn alert(name: &str) -> Alert {
        Alert::new(Labels::from_pairs([("alertname", name)]), Labels::new())
    }

    #[tokio::test]
    async fn put_rejects_whole_batch_on_any_invalid() {
        let provider = AlertProvider::default();
        let bad = Alert::new(Labels::new(), Labels::new());
        let result = provider.put(vec![alert("X"), bad]).await;
        assert!(result.is_err());
        assert!(provider.get_pending().await.is_empty());
    }

    #[tokio::test]
    async fn put_merges_by_fingerprint() {
        let provider = AlertProvider::default();
        let a = alert("X");
        let fp = a.fingerprint();
        provider.put(vec![a.clone()]).await.unwrap();
        provider.put(vec![a]).await.unwrap();
        assert_eq!(provider.get_pending().await.len(), 1);
        assert!(provider.get(&fp).await.is_ok());
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let provider = AlertProvider::default();
        let err = provider.get(&Fingerprint::new("missing")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn subscribe_emits_snapshot_then_updates() {
        let provider = AlertProvider::default();
        provider.put(vec![alert("X")]).await.unwrap();

        let mut sub = provider.subscribe().await;
        let first = sub.recv().await.unwrap().unwrap();
        assert!(matches!(first, ProviderEvent::Snapshot(a) if a.len() == 1));

        provider.put(vec![alert("Y")]).await.unwrap();
        let second = sub.recv().await.unwrap().unwrap();
        assert!(matches!(second, ProviderEvent::Merged(_)));
    }

    #[tokio::test]
    async fn subscriber_overflow_forces_reconnect() {
        let provider = AlertProvider::new(1);
        let mut sub = provider.subscribe().await;
        // Drain the initial snapshot so the buffer is empty, then flood it
        // past capacity without the subscriber ever calling recv() again.
        sub.recv().await.unwrap();
        for i in 0..10 {
            provider.put(vec![alert(&format!("Flood{i}"))]).await.unwrap();
        }
        let result = sub.recv().await;
        assert!(matches!(result, Err(ProviderError::Overflow)));
    }

    #[tokio::test]
    async fn gc_removes_alerts_past_resolve_timeout() {
        let provider = AlertProvider::default();
        let mut resolved = alert("X");
        resolved.ends_at = Some(chrono::Utc::now() - chrono::Duration::seconds(120));
        provider.put(vec![resolved]).await.unwrap();

        let removed = provider.gc(chrono::Duration::seconds(30)).await;
        assert_eq!(removed, 1);
        assert!(provider.get_pending().await.is_empty());
    }

    #[tokio::test]
    async fn gc_keeps_firing_alerts() {
        let provider = AlertProvider::default();
        provider.put(vec![alert("X")]).await.unwrap();
        let removed = provider.gc(chrono::Duration::seconds(30)).await;
        assert_eq!(removed, 0);
    }
}
