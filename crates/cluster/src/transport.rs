use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::ClusterError;
use crate::frame::GossipFrame;
use crate::keyring::KeyRing;

/// Best-effort flood transport: send a frame, no delivery guarantee, no
/// ordering guarantee across peers. A production deployment would back
/// this with a TCP fan-out per peer; the trait boundary is what the
/// cluster node needs, not how bytes cross the wire.
#[async_trait]
pub trait GossipTransport: Send + Sync {
    async fn broadcast_frame(&self, frame: &GossipFrame) -> Result<(), ClusterError>;

    /// Decode a frame received over this transport, authenticating it
    /// against whatever key ring the transport was configured with.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Decode`] if the bytes don't decode, or
    /// (for a sealed frame) don't authenticate under the configured ring.
    fn decode_frame(&self, bytes: &[u8]) -> Result<GossipFrame, ClusterError>;
}

/// In-process transport backed by a `tokio::sync::broadcast` channel.
/// Every [`ChannelTransport`] cloned from the same [`subscribe`] source
/// receives every frame sent by any clone -- this is what lets a single
/// test process simulate a multi-peer cluster without sockets, and it's
/// also a reasonable default for a single-instance deployment with no
/// peers to talk to.
pub struct ChannelTransport {
    tx: broadcast::Sender<Vec<u8>>,
    keyring: Option<KeyRing>,
}

impl ChannelTransport {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx, keyring: None }
    }

    /// Encrypt every frame sent and verify every frame received against
    /// `keyring`, instead of sending/accepting plaintext.
    #[must_use]
    pub fn with_keyring(mut self, keyring: KeyRing) -> Self {
        self.keyring = Some(keyring);
        self
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl GossipTransport for ChannelTransport {
    async fn broadcast_frame(&self, frame: &GossipFrame) -> Result<(), ClusterError> {
        let encoded = frame.encode(self.keyring.as_ref())?;
        // No receivers is not an error -- a lone node with no peers yet.
        let _ = self.tx.send(encoded);
        Ok(())
    }

    fn decode_frame(&self, bytes: &[u8]) -> Result<GossipFrame, ClusterError> {
        GossipFrame::decode(bytes, self.keyring.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use relaymux_core::nflog::NflogEntry;
    use relaymux_core::{nflog::NflogKey, GroupKey, ReceiverName};

    use super::*;

    #[tokio::test]
    async fn subscriber_receives_broadcast_frame() {
        let transport = ChannelTransport::new(8);
        let mut rx = transport.subscribe();
        let frame = GossipFrame::NflogMerge {
            key: NflogKey::new(ReceiverName::new("default"), GroupKey::new("g1")),
            entry: NflogEntry::new(vec!["a".into()], vec![], chrono::Duration::hours(1)),
        };
        transport.broadcast_frame(&frame).await.unwrap();
        let received = rx.recv().await.unwrap();
        let decoded = transport.decode_frame(&received).unwrap();
        assert_eq!(decoded.encode(None).unwrap(), frame.encode(None).unwrap());
    }

    #[tokio::test]
    async fn keyring_configured_transport_encrypts_on_the_wire() {
        let transport = ChannelTransport::new(8).with_keyring(KeyRing::new([3u8; 32], []));
        let mut rx = transport.subscribe();
        let frame = GossipFrame::NflogMerge {
            key: NflogKey::new(ReceiverName::new("default"), GroupKey::new("g1")),
            entry: NflogEntry::new(vec!["a".into()], vec![], chrono::Duration::hours(1)),
        };
        transport.broadcast_frame(&frame).await.unwrap();
        let received = rx.recv().await.unwrap();

        // The plaintext JSON encoding of the key's receiver name would
        // appear verbatim in an unencrypted frame; it must not appear here.
        assert!(!received.windows(b"default".len()).any(|w| w == b"default"));
        let decoded = transport.decode_frame(&received).unwrap();
        assert!(matches!(decoded, GossipFrame::NflogMerge { .. }));
    }
}
