use async_trait::async_trait;
use relaymux_core::nflog::{NflogEntry, NflogKey};

/// The slice of cluster-gossip capability the pipeline needs: this
/// node's position among peers (for the gossip-wait stage) and a way to
/// check whether a peer already observed an equivalent notification (for
/// the wait-for-cluster-peers stage). A concrete gossip layer implements
/// this; tests and single-node deployments use [`SoloCluster`].
#[async_trait]
pub trait ClusterView: Send + Sync {
    /// This node's index among the current peer set, used to stagger
    /// notification sends so the first peer to notice an alert isn't
    /// always the one that sends it.
    fn position(&self) -> usize;

    /// Number of peers currently known, including this node.
    fn peer_count(&self) -> usize;

    /// Whether any peer has already logged a notification for `key`
    /// carrying the same firing/resolved fingerprint sets as `candidate`.
    async fn observed_elsewhere(&self, key: &NflogKey, candidate: &NflogEntry) -> bool;

    /// Push a freshly written notification-log entry out to peers.
    async fn broadcast(&self, key: NflogKey, entry: NflogEntry);
}

/// A [`ClusterView`] for a node with no peers: never waits, never finds
/// a peer that has already notified.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoloCluster;

#[async_trait]
impl ClusterView for SoloCluster {
    fn position(&self) -> usize {
        0
    }

    fn peer_count(&self) -> usize {
        1
    }

    async fn observed_elsewhere(&self, _key: &NflogKey, _candidate: &NflogEntry) -> bool {
        false
    }

    async fn broadcast(&self, _key: NflogKey, _entry: NflogEntry) {}
}
