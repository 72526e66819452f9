use std::sync::Arc;

use async_trait::async_trait;
use relaymux_core::nflog::{NflogEntry, NflogKey};
use relaymux_nflog::NflogStore;
use relaymux_pipeline::ClusterView;
use relaymux_silence::SilenceStore;

use crate::error::ClusterError;
use crate::frame::GossipFrame;
use crate::membership::Membership;
use crate::transport::GossipTransport;

/// One cluster member: membership view, a transport to flood frames
/// over, and the local nflog/silence stores that gossip keeps
/// eventually consistent with peers.
pub struct ClusterNode {
    membership: Arc<Membership>,
    transport: Arc<dyn GossipTransport>,
    nflog: Arc<NflogStore>,
    silences: Arc<SilenceStore>,
    nflog_retention: chrono::Duration,
}

impl ClusterNode {
    #[must_use]
    pub fn new(
        membership: Arc<Membership>,
        transport: Arc<dyn GossipTransport>,
        nflog: Arc<NflogStore>,
        silences: Arc<SilenceStore>,
    ) -> Self {
        Self { membership, transport, nflog, silences, nflog_retention: chrono::Duration::hours(4) }
    }

    /// The membership view backing this node, for callers (the status
    /// API) that need peer/position information without going through
    /// `ClusterView`.
    #[must_use]
    pub fn membership(&self) -> &Arc<Membership> {
        &self.membership
    }

    #[must_use]
    pub fn with_nflog_retention(mut self, retention: chrono::Duration) -> Self {
        self.nflog_retention = retention;
        self
    }

    /// Apply an incoming frame from a peer: merge it into the local
    /// store under the same monotonicity rule a local write would use.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if the merge itself fails.
    pub async fn ingest(&self, frame: GossipFrame) -> Result<(), ClusterError> {
        match frame {
            GossipFrame::SilenceMerge(silence) => {
                self.silences.merge_in(silence).await?;
            }
            GossipFrame::NflogMerge { key, entry } => {
                self.nflog.merge_in(&key, entry, self.nflog_retention).await?;
            }
            GossipFrame::FullState { silences, nflog } => {
                for silence in silences {
                    self.silences.merge_in(silence).await?;
                }
                for (key, entry) in nflog {
                    self.nflog.merge_in(&key, entry, self.nflog_retention).await?;
                }
            }
        }
        Ok(())
    }

    /// Broadcast a local silence mutation to peers.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if the transport fails to send.
    pub async fn broadcast_silence(&self, silence: relaymux_core::Silence) -> Result<(), ClusterError> {
        self.transport.broadcast_frame(&GossipFrame::SilenceMerge(silence)).await
    }

    /// Pull a full snapshot from the local stores and flood it, for the
    /// periodic anti-entropy pass. In a single-process overlay this is
    /// symmetric (every peer, including the one running it, just
    /// receives its own snapshot back through the channel); a real
    /// transport would target one random peer and pull rather than push.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if reading the snapshot or broadcasting
    /// it fails.
    pub async fn anti_entropy_pass(&self) -> Result<(), ClusterError> {
        let silences = self.silences.list().await?;
        let nflog = self
            .nflog
            .snapshot()
            .await?
            .into_iter()
            .filter_map(|(canonical, entry)| parse_nflog_key(&canonical).map(|key| (key, entry)))
            .collect();
        self.transport.broadcast_frame(&GossipFrame::FullState { silences, nflog }).await
    }
}

fn parse_nflog_key(canonical: &str) -> Option<NflogKey> {
    let rest = canonical.strip_prefix("nflog:").unwrap_or(canonical);
    let (receiver, group_key) = rest.split_once(':')?;
    Some(NflogKey::new(relaymux_core::ReceiverName::new(receiver), relaymux_core::GroupKey::new(group_key)))
}

#[async_trait]
impl ClusterView for ClusterNode {
    fn position(&self) -> usize {
        // `ClusterView::position` is synchronous -- a gossip-wait stagger
        // doesn't need a perfectly fresh view, so a non-blocking read
        // that degrades to "alone" under contention beats making every
        // pipeline call site await a membership lock.
        self.membership.try_position().unwrap_or(0)
    }

    fn peer_count(&self) -> usize {
        self.membership.try_peer_count().unwrap_or(1)
    }

    async fn observed_elsewhere(&self, key: &NflogKey, candidate: &NflogEntry) -> bool {
        match self.nflog.query_by_parts(&key.receiver, &key.group_key).await {
            Ok(entry) => entry.same_as(&candidate.firing_fingerprints, &candidate.resolved_fingerprints),
            Err(_) => false,
        }
    }

    async fn broadcast(&self, key: NflogKey, entry: NflogEntry) {
        if let Err(err) = self.transport.broadcast_frame(&GossipFrame::NflogMerge { key, entry }).await {
            tracing::warn!(error = %err, "failed to broadcast nflog entry to cluster");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relaymux_core::{GroupKey, ReceiverName};
    use relaymux_state_memory::MemoryStateStore;

    use super::*;
    use crate::membership::PeerId;
    use crate::transport::ChannelTransport;

    fn node() -> ClusterNode {
        ClusterNode::new(
            Arc::new(Membership::new(PeerId::new("a"), "addr-a")),
            Arc::new(ChannelTransport::new(8)),
            Arc::new(NflogStore::new(Arc::new(MemoryStateStore::new()))),
            Arc::new(SilenceStore::new(Arc::new(MemoryStateStore::new()))),
        )
    }

    #[tokio::test]
    async fn ingest_nflog_merge_makes_it_observable() {
        let node = node();
        let key = NflogKey::new(ReceiverName::new("default"), GroupKey::new("g1"));
        let entry = NflogEntry::new(vec!["a".into()], vec![], chrono::Duration::hours(1));
        node.ingest(GossipFrame::NflogMerge { key: key.clone(), entry: entry.clone() }).await.unwrap();

        assert!(ClusterView::observed_elsewhere(&node, &key, &entry).await);
    }

    #[tokio::test]
    async fn solo_node_reports_itself_as_position_zero_with_one_peer() {
        let node = node();
        assert_eq!(ClusterView::position(&node), 0);
        assert_eq!(ClusterView::peer_count(&node), 1);
    }
}
