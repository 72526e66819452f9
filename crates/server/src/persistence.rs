//! Durable snapshots for silences and the notification log: each is a
//! length-prefixed sequence of JSON entries with a trailing SHA-256
//! checksum, written via the write-temp-then-rename pattern so a crash
//! mid-write never leaves a half-written file in place of the last good
//! one.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use relaymux_nflog::{NflogError, NflogStore};
use relaymux_silence::{SilenceError, SilenceStore};

const CHECKSUM_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot corrupt: {0}")]
    Corruption(String),

    #[error(transparent)]
    Silence(#[from] SilenceError),

    #[error(transparent)]
    Nflog(#[from] NflogError),
}

/// Where the two snapshot files live. `None` disables persistence
/// entirely -- state lives only in the configured [`StateStore`] for
/// the life of the process, same as before this module existed.
///
/// [`StateStore`]: relaymux_state::StateStore
#[derive(Clone)]
pub struct SnapshotPaths {
    pub silences: PathBuf,
    pub nflog: PathBuf,
}

impl SnapshotPaths {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self { silences: dir.join("silences.snapshot"), nflog: dir.join("nflog.snapshot") }
    }
}

/// Encode `items` as a length-prefixed sequence followed by a SHA-256
/// checksum of everything before it, and write the result atomically.
fn write_snapshot<T: serde::Serialize>(path: &Path, items: &[T]) -> Result<(), PersistenceError> {
    let mut body = Vec::new();
    for item in items {
        let encoded = serde_json::to_vec(item)?;
        body.extend_from_slice(&u32::try_from(encoded.len()).unwrap_or(u32::MAX).to_le_bytes());
        body.extend_from_slice(&encoded);
    }
    let mut hasher = Sha256::new();
    hasher.update(&body);
    let checksum = hasher.finalize();

    let temp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    {
        use std::io::Write;
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(&body)?;
        file.write_all(&checksum)?;
        file.sync_all()?;
    }
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Decode a file written by [`write_snapshot`]. Returns an empty list if
/// the file does not exist yet (first run). A checksum mismatch or
/// truncated framing is reported as [`PersistenceError::Corruption`];
/// the caller is expected to discard the snapshot and start empty, per
/// this project's corruption-handling policy.
fn load_snapshot<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistenceError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read(path)?;
    if data.len() < CHECKSUM_LEN {
        return Err(PersistenceError::Corruption(format!("{} is shorter than a checksum", path.display())));
    }
    let (body, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    let mut hasher = Sha256::new();
    hasher.update(body);
    if hasher.finalize().as_slice() != checksum {
        return Err(PersistenceError::Corruption(format!("checksum mismatch in {}", path.display())));
    }

    let mut items = Vec::new();
    let mut offset = 0;
    while offset < body.len() {
        let Some(len_bytes) = body.get(offset..offset + 4) else {
            return Err(PersistenceError::Corruption("truncated length prefix".into()));
        };
        let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
        offset += 4;
        let Some(payload) = body.get(offset..offset + len) else {
            return Err(PersistenceError::Corruption("truncated entry payload".into()));
        };
        items.push(serde_json::from_slice(payload)?);
        offset += len;
    }
    Ok(items)
}

/// Write the current silence and notify-log state to `paths`. Runs on a
/// blocking thread since the snapshot can be arbitrarily large and this
/// is called from the periodic scheduler loop alongside other async work.
///
/// # Errors
///
/// Returns a [`PersistenceError`] on a store read failure or if the
/// write-rename sequence fails.
pub async fn persist(silences: &SilenceStore, nflog: &NflogStore, paths: &SnapshotPaths) -> Result<(), PersistenceError> {
    let silence_dump = silences.snapshot().await?;
    let nflog_dump = nflog.snapshot().await?;
    let paths = paths.clone();
    tokio::task::spawn_blocking(move || {
        write_snapshot(&paths.silences, &silence_dump)?;
        write_snapshot(&paths.nflog, &nflog_dump)
    })
    .await
    .map_err(|e| PersistenceError::Corruption(format!("snapshot writer task panicked: {e}")))??;
    Ok(())
}

/// Load whatever snapshots exist at `paths` into `silences`/`nflog`. Meant
/// to run once at startup, before the scheduler or any request handler
/// can observe a partially restored store. A corrupt snapshot is logged
/// and skipped rather than treated as a fatal startup error -- the node
/// starts empty and re-converges from its peers (or from scratch, on a
/// single-node deployment).
pub async fn restore(silences: &SilenceStore, nflog: &NflogStore, paths: &SnapshotPaths) {
    match load_snapshot(&paths.silences) {
        Ok(dump) => {
            let count = dump.len();
            if let Err(err) = silences.restore(dump).await {
                tracing::warn!(error = %err, "failed to restore silence snapshot");
            } else if count > 0 {
                tracing::info!(count, "restored silences from snapshot");
            }
        }
        Err(err) => tracing::warn!(error = %err, "discarding silence snapshot"),
    }

    match load_snapshot(&paths.nflog) {
        Ok(dump) => {
            let count = dump.len();
            if let Err(err) = nflog.restore(dump).await {
                tracing::warn!(error = %err, "failed to restore notify-log snapshot");
            } else if count > 0 {
                tracing::info!(count, "restored notify-log entries from snapshot");
            }
        }
        Err(err) => tracing::warn!(error = %err, "discarding notify-log snapshot"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relaymux_core::Matcher;
    use relaymux_state_memory::MemoryStateStore;

    use super::*;

    #[test]
    fn write_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("relaymux-persistence-test-{:?}", std::thread::current().id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("entries.snapshot");

        write_snapshot(&path, &["alpha".to_string(), "beta".to_string()]).unwrap();
        let loaded: Vec<String> = load_snapshot(&path).unwrap();
        assert_eq!(loaded, vec!["alpha".to_string(), "beta".to_string()]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let path = std::env::temp_dir().join("relaymux-persistence-missing.snapshot");
        std::fs::remove_file(&path).ok();
        let loaded: Vec<String> = load_snapshot(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let dir = std::env::temp_dir().join(format!("relaymux-persistence-corrupt-{:?}", std::thread::current().id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("entries.snapshot");

        write_snapshot(&path, &["alpha".to_string()]).unwrap();
        let mut data = std::fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        std::fs::write(&path, data).unwrap();

        let result: Result<Vec<String>, _> = load_snapshot(&path);
        assert!(matches!(result, Err(PersistenceError::Corruption(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn persist_then_restore_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("relaymux-persistence-e2e-{:?}", std::thread::current().id()));
        std::fs::remove_dir_all(&dir).ok();
        let paths = SnapshotPaths::in_dir(&dir);

        let silences = SilenceStore::new(Arc::new(MemoryStateStore::new()) as Arc<dyn relaymux_state::StateStore>);
        let nflog = NflogStore::new(Arc::new(MemoryStateStore::new()) as Arc<dyn relaymux_state::StateStore>);

        let now = chrono::Utc::now();
        silences
            .create(vec![Matcher::equal("env", "staging")], now, now + chrono::Duration::hours(1), "op", "maint")
            .await
            .unwrap();
        nflog
            .log(
                &relaymux_core::nflog::NflogKey::new(relaymux_core::ReceiverName::new("default"), relaymux_core::GroupKey::new("g1")),
                vec!["fp1".into()],
                vec![],
                chrono::Duration::hours(1),
            )
            .await
            .unwrap();

        persist(&silences, &nflog, &paths).await.unwrap();

        let fresh_silences = SilenceStore::new(Arc::new(MemoryStateStore::new()) as Arc<dyn relaymux_state::StateStore>);
        let fresh_nflog = NflogStore::new(Arc::new(MemoryStateStore::new()) as Arc<dyn relaymux_state::StateStore>);
        restore(&fresh_silences, &fresh_nflog, &paths).await;

        assert_eq!(fresh_silences.list().await.unwrap().len(), 1);
        assert_eq!(fresh_nflog.snapshot().await.unwrap().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}
