use relaymux_core::nflog::{NflogEntry, NflogKey};
use relaymux_core::Silence;

use crate::error::ClusterError;
use crate::keyring::KeyRing;

/// One gossip message. Tagged so a receiver can decode without knowing
/// the sender's framing ahead of time -- mirrors the length-delimited,
/// tag-byte wire format the project's transport layer uses for bulk
/// state (silences, nflog batches) versus liveness probes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum GossipFrame {
    SilenceMerge(Silence),
    NflogMerge { key: NflogKey, entry: NflogEntry },
    FullState { silences: Vec<Silence>, nflog: Vec<(NflogKey, NflogEntry)> },
}

impl GossipFrame {
    const TAG_SILENCE_MERGE: u8 = 1;
    const TAG_NFLOG_MERGE: u8 = 2;
    const TAG_FULL_STATE: u8 = 3;

    fn tag(&self) -> u8 {
        match self {
            Self::SilenceMerge(_) => Self::TAG_SILENCE_MERGE,
            Self::NflogMerge { .. } => Self::TAG_NFLOG_MERGE,
            Self::FullState { .. } => Self::TAG_FULL_STATE,
        }
    }

    const ENC_PLAIN: u8 = 0;
    const ENC_SEALED: u8 = 1;

    /// Encode as a tag byte, an encryption-flag byte, and the JSON
    /// payload (sealed under `keyring`'s primary key if one is given,
    /// plaintext otherwise). A real transport would additionally
    /// length-prefix this before writing it to a socket; that framing
    /// lives at the transport layer, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Encode`] if serialization or sealing fails.
    pub fn encode(&self, keyring: Option<&KeyRing>) -> Result<Vec<u8>, ClusterError> {
        let payload = serde_json::to_vec(self).map_err(|e| ClusterError::Encode(e.to_string()))?;
        let mut out = vec![self.tag()];
        match keyring {
            Some(ring) => {
                out.push(Self::ENC_SEALED);
                out.extend(ring.seal(&payload)?);
            }
            None => {
                out.push(Self::ENC_PLAIN);
                out.extend(payload);
            }
        }
        Ok(out)
    }

    /// Decode a frame produced by [`Self::encode`]. `keyring` must be
    /// supplied (and contain the key the sender used) if the frame was
    /// sealed; a plaintext frame decodes regardless.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Decode`] if the frame is too short, is
    /// sealed but no (matching) key ring is supplied, or the JSON payload
    /// is malformed.
    pub fn decode(bytes: &[u8], keyring: Option<&KeyRing>) -> Result<Self, ClusterError> {
        let enc_flag = *bytes.get(1).ok_or_else(|| ClusterError::Decode("frame shorter than header".into()))?;
        let rest = &bytes[2..];
        let payload = match enc_flag {
            Self::ENC_PLAIN => rest.to_vec(),
            Self::ENC_SEALED => {
                let ring = keyring.ok_or_else(|| ClusterError::Decode("received an encrypted frame but no key ring is configured".into()))?;
                ring.open(rest)?
            }
            other => return Err(ClusterError::Decode(format!("unknown encryption flag {other}"))),
        };
        serde_json::from_slice(&payload).map_err(|e| ClusterError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn nflog_merge_frame_round_trips() {
        let frame = GossipFrame::NflogMerge {
            key: NflogKey::new(relaymux_core::ReceiverName::new("default"), relaymux_core::GroupKey::new("g1")),
            entry: NflogEntry::new(vec!["a".into()], vec![], chrono::Duration::hours(1)),
        };
        let encoded = frame.encode(None).unwrap();
        let decoded = GossipFrame::decode(&encoded, None).unwrap();
        assert!(matches!(decoded, GossipFrame::NflogMerge { .. }));
    }

    #[test]
    fn decode_rejects_truncated_input() {
        assert!(GossipFrame::decode(&[], None).is_err());
    }

    #[test]
    fn full_state_frame_carries_snapshot() {
        let silence = relaymux_core::Silence::new(
            vec![relaymux_core::Matcher::equal("env", "staging")],
            Utc::now(),
            Utc::now() + chrono::Duration::hours(1),
            "op",
            "",
        )
        .unwrap();
        let frame = GossipFrame::FullState { silences: vec![silence], nflog: vec![] };
        let encoded = frame.encode(None).unwrap();
        let decoded = GossipFrame::decode(&encoded, None).unwrap();
        assert!(matches!(decoded, GossipFrame::FullState { .. }));
    }

    #[test]
    fn encrypted_frame_round_trips_under_matching_keyring() {
        let ring = KeyRing::new([7u8; 32], []);
        let frame = GossipFrame::NflogMerge {
            key: NflogKey::new(relaymux_core::ReceiverName::new("default"), relaymux_core::GroupKey::new("g1")),
            entry: NflogEntry::new(vec!["a".into()], vec![], chrono::Duration::hours(1)),
        };
        let encoded = frame.encode(Some(&ring)).unwrap();
        let decoded = GossipFrame::decode(&encoded, Some(&ring)).unwrap();
        assert!(matches!(decoded, GossipFrame::NflogMerge { .. }));
    }

    #[test]
    fn encrypted_frame_rejected_without_keyring() {
        let ring = KeyRing::new([7u8; 32], []);
        let frame = GossipFrame::NflogMerge {
            key: NflogKey::new(relaymux_core::ReceiverName::new("default"), relaymux_core::GroupKey::new("g1")),
            entry: NflogEntry::new(vec!["a".into()], vec![], chrono::Duration::hours(1)),
        };
        let encoded = frame.encode(Some(&ring)).unwrap();
        assert!(GossipFrame::decode(&encoded, None).is_err());
    }
}
