//! Symmetric key ring for gossip frame encryption: every outgoing frame
//! is authenticated-encrypted under the primary (first) key; an incoming
//! frame is decrypted by trying each key in turn, so a key rotation can
//! introduce a new primary while peers still holding the previous one
//! keep converging until they roll forward too.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::ClusterError;

const NONCE_LEN: usize = 12;

/// An ordered list of AES-256 keys. The first key is primary and seals
/// every frame this node sends; `open` tries every key so a frame sealed
/// under a not-yet-retired key still decodes during rotation.
#[derive(Clone)]
pub struct KeyRing {
    keys: Vec<[u8; 32]>,
}

impl KeyRing {
    /// Build a ring whose primary key is `primary`, optionally carrying
    /// additional keys (in order of recency) still accepted for decrypt.
    #[must_use]
    pub fn new(primary: [u8; 32], additional: impl IntoIterator<Item = [u8; 32]>) -> Self {
        let mut keys = vec![primary];
        keys.extend(additional);
        Self { keys }
    }

    /// Parse a ring from hex-encoded 32-byte keys: `primary` becomes the
    /// sealing key, `additional` are retired keys still accepted for
    /// decrypt during a rotation.
    pub fn from_hex(primary: &str, additional: &[String]) -> Result<Self, ClusterError> {
        let primary = Self::decode_hex_key(primary)?;
        let rest = additional.iter().map(|k| Self::decode_hex_key(k)).collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(primary, rest))
    }

    fn decode_hex_key(raw: &str) -> Result<[u8; 32], ClusterError> {
        let trimmed = raw.trim();
        let bytes = hex::decode(trimmed).map_err(|e| ClusterError::Encode(format!("invalid gossip key hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(ClusterError::Encode(format!("gossip key must be 32 bytes, got {}", bytes.len())));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(key)
    }

    /// Seal `plaintext` under the primary key, returning `nonce || ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Encode`] if the primary key is malformed.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, ClusterError> {
        let cipher = Aes256Gcm::new_from_slice(&self.keys[0]).map_err(|e| ClusterError::Encode(format!("invalid primary key: {e}")))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher.encrypt(&nonce, plaintext).map_err(|e| ClusterError::Encode(format!("seal failed: {e}")))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend(ciphertext);
        Ok(out)
    }

    /// Attempt to open `sealed` (as produced by [`Self::seal`]) against
    /// every key in the ring, primary first.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Decode`] if `sealed` is too short to carry
    /// a nonce, or no key in the ring authenticates it.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, ClusterError> {
        if sealed.len() < NONCE_LEN {
            return Err(ClusterError::Decode("sealed frame shorter than nonce".into()));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        for key in &self.keys {
            let Ok(cipher) = Aes256Gcm::new_from_slice(key) else {
                continue;
            };
            if let Ok(plaintext) = cipher.decrypt(nonce, ciphertext) {
                return Ok(plaintext);
            }
        }
        Err(ClusterError::Decode("frame did not authenticate under any key in the ring".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> [u8; 32] {
        [byte; 32]
    }

    #[test]
    fn seals_and_opens_with_primary_key() {
        let ring = KeyRing::new(key(1), []);
        let sealed = ring.seal(b"hello peer").unwrap();
        assert_eq!(ring.open(&sealed).unwrap(), b"hello peer");
    }

    #[test]
    fn open_fails_without_matching_key() {
        let sender = KeyRing::new(key(1), []);
        let receiver = KeyRing::new(key(2), []);
        let sealed = sender.seal(b"hello peer").unwrap();
        assert!(receiver.open(&sealed).is_err());
    }

    #[test]
    fn rotation_still_opens_frames_sealed_under_retired_key() {
        let old_ring = KeyRing::new(key(1), []);
        let sealed_by_old_primary = old_ring.seal(b"pre-rotation frame").unwrap();

        // New primary is key(2); key(1) stays accepted while peers roll forward.
        let rotated_ring = KeyRing::new(key(2), [key(1)]);
        assert_eq!(rotated_ring.open(&sealed_by_old_primary).unwrap(), b"pre-rotation frame");

        let sealed_by_new_primary = rotated_ring.seal(b"post-rotation frame").unwrap();
        assert_eq!(rotated_ring.open(&sealed_by_new_primary).unwrap(), b"post-rotation frame");
    }

    #[test]
    fn truncated_input_is_rejected() {
        let ring = KeyRing::new(key(1), []);
        assert!(ring.open(&[0u8; 4]).is_err());
    }

    #[test]
    fn from_hex_round_trips_with_additional_keys() {
        let primary = "11".repeat(32);
        let retired = "22".repeat(32);
        let ring = KeyRing::from_hex(&primary, &[retired]).unwrap();
        let sealed = ring.seal(b"payload").unwrap();
        assert_eq!(ring.open(&sealed).unwrap(), b"payload");
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(KeyRing::from_hex("abcd", &[]).is_err());
    }
}
