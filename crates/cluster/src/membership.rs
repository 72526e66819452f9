use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// Stable identity of one cluster member. Ordering between peer ids is
/// lexicographic and determines `position()`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PeerId(String);

impl PeerId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub addr: String,
}

/// Tracks the current peer set and this node's rank within it.
///
/// `settle` considers membership stable once it has gone unchanged for a
/// short debounce window, rather than requiring every peer to explicitly
/// ack a join -- good enough for a best-effort overlay where the
/// consequence of acting on a slightly stale view is a missed dedup
/// opportunity, not a correctness violation.
pub struct Membership {
    local_id: PeerId,
    peers: RwLock<Vec<Peer>>,
    generation: AtomicU64,
}

const SETTLE_DEBOUNCE: Duration = Duration::from_millis(200);

impl Membership {
    #[must_use]
    pub fn new(local_id: PeerId, local_addr: impl Into<String>) -> Self {
        Self {
            peers: RwLock::new(vec![Peer { id: local_id.clone(), addr: local_addr.into() }]),
            local_id,
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub async fn peers(&self) -> Vec<Peer> {
        self.peers.read().await.clone()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// This node's rank among the current peer set, sorted by `id`.
    /// Stable across a single membership view; changes only when the
    /// peer set itself changes.
    pub async fn position(&self) -> usize {
        let mut ids: Vec<&PeerId> = self.peers.read().await.iter().map(|p| &p.id).collect();
        ids.sort();
        ids.iter().position(|id| **id == self.local_id).unwrap_or(0)
    }

    /// Non-blocking best-effort version of [`Self::position`], for
    /// callers on a synchronous hot path. Returns `None` if the read
    /// lock is currently held for writing.
    #[must_use]
    pub fn try_position(&self) -> Option<usize> {
        let guard = self.peers.try_read().ok()?;
        let mut ids: Vec<&PeerId> = guard.iter().map(|p| &p.id).collect();
        ids.sort();
        Some(ids.iter().position(|id| **id == self.local_id).unwrap_or(0))
    }

    /// Non-blocking best-effort version of [`Self::peer_count`].
    #[must_use]
    pub fn try_peer_count(&self) -> Option<usize> {
        self.peers.try_read().ok().map(|guard| guard.len())
    }

    /// Replace the known peer set, e.g. after receiving a membership
    /// update from the transport layer.
    pub async fn set_peers(&self, mut peers: Vec<Peer>) {
        if !peers.iter().any(|p| p.id == self.local_id) {
            peers.push(Peer { id: self.local_id.clone(), addr: String::new() });
        }
        *self.peers.write().await = peers;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Block until the peer set hasn't changed for a short debounce
    /// window, or `timeout` elapses, whichever comes first. Returns
    /// whether membership settled (`false` means it timed out still
    /// churning).
    pub async fn settle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let before = self.generation.load(Ordering::SeqCst);
            tokio::time::sleep(SETTLE_DEBOUNCE.min(timeout)).await;
            let after = self.generation.load(Ordering::SeqCst);
            if before == after {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }
}

#[must_use]
pub fn shared(local_id: PeerId, local_addr: impl Into<String>) -> Arc<Membership> {
    Arc::new(Membership::new(local_id, local_addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn position_is_lexicographic_rank() {
        let membership = Membership::new(PeerId::new("b"), "addr-b");
        membership
            .set_peers(vec![
                Peer { id: PeerId::new("a"), addr: "addr-a".into() },
                Peer { id: PeerId::new("b"), addr: "addr-b".into() },
                Peer { id: PeerId::new("c"), addr: "addr-c".into() },
            ])
            .await;
        assert_eq!(membership.position().await, 1);
    }

    #[tokio::test]
    async fn settle_returns_true_once_peers_stop_changing() {
        let membership = Membership::new(PeerId::new("a"), "addr-a");
        assert!(membership.settle(Duration::from_millis(500)).await);
    }
}
