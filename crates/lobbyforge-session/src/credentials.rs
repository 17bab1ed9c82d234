//! Credential persistence.
//!
//! One record per player, holding nothing but the salted digest:
//!
//! ```json
//! {"password": "9f86d081884c7d65..."}
//! ```
//!
//! [`CredentialStore`] is the seam: the session manager only ever calls
//! `persist` and `load`, so tests swap the file store for
//! [`MemoryCredentialStore`] (or a store that always fails).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use lobbyforge_protocol::PlayerId;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::CredentialError;

/// The on-disk shape of a credential record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Lowercase hex digest from [`hash_password`](crate::hash_password).
    pub password: String,
}

/// Reads and writes credential digests.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the store is shared by every
/// connect and command task for the lifetime of the server.
pub trait CredentialStore: Send + Sync + 'static {
    /// Stores `digest` for `player_id`, replacing any previous record.
    fn persist(
        &self,
        player_id: PlayerId,
        digest: &str,
    ) -> impl std::future::Future<Output = Result<(), CredentialError>> + Send;

    /// Reads the digest for `player_id`. `Ok(None)` means "never
    /// registered", which is not an error.
    fn load(
        &self,
        player_id: PlayerId,
    ) -> impl std::future::Future<Output = Result<Option<String>, CredentialError>>
    + Send;
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// Stores each record as `<dir>/<uuid>.json`.
///
/// Reads and writes for the same player are serialized through a
/// per-player async mutex; different players never wait on each other.
/// A player's mutex is only kept while some read or write for them is
/// running.
/// Writes go to a temp file first and are renamed into place, so a crash
/// mid-write never leaves a truncated record behind.
#[derive(Debug)]
pub struct FileCredentialStore {
    dir: PathBuf,
    locks: DashMap<PlayerId, Arc<Mutex<()>>>,
}

impl FileCredentialStore {
    /// Creates a store rooted at `dir`. The directory is created on the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the record for `player_id` lives.
    pub fn record_path(&self, player_id: PlayerId) -> PathBuf {
        self.dir.join(format!("{player_id}.json"))
    }

    /// The I/O lock for one player. The `DashMap` guard is dropped before
    /// this returns so it is never held across an `.await`.
    fn lock_for(&self, player_id: PlayerId) -> Arc<Mutex<()>> {
        self.locks.entry(player_id).or_default().clone()
    }

    /// Forgets the player's lock once nobody else holds or waits on it.
    /// The caller must have dropped its own clone.
    fn release_lock(&self, player_id: PlayerId) {
        self.locks
            .remove_if(&player_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn write_record(
        &self,
        player_id: PlayerId,
        digest: &str,
    ) -> Result<(), CredentialError> {
        let io_err = |source| CredentialError::Io { player_id, source };

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;

        let record = CredentialRecord {
            password: digest.to_string(),
        };
        let body = serde_json::to_vec_pretty(&record).map_err(|source| {
            CredentialError::Malformed { player_id, source }
        })?;

        let path = self.record_path(player_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;

        tracing::debug!(%player_id, path = %path.display(), "credential persisted");
        Ok(())
    }

    async fn read_record(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<String>, CredentialError> {
        let path = self.record_path(player_id);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None);
            }
            Err(source) => return Err(CredentialError::Io { player_id, source }),
        };

        let record: CredentialRecord = serde_json::from_slice(&body)
            .map_err(|source| CredentialError::Malformed { player_id, source })?;
        Ok(Some(record.password))
    }
}

impl CredentialStore for FileCredentialStore {
    async fn persist(
        &self,
        player_id: PlayerId,
        digest: &str,
    ) -> Result<(), CredentialError> {
        let lock = self.lock_for(player_id);
        let result = {
            let _guard = lock.lock().await;
            self.write_record(player_id, digest).await
        };
        drop(lock);
        self.release_lock(player_id);
        result
    }

    async fn load(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<String>, CredentialError> {
        let lock = self.lock_for(player_id);
        let result = {
            let _guard = lock.lock().await;
            self.read_record(player_id).await
        };
        drop(lock);
        self.release_lock(player_id);
        result
    }
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

/// Keeps records in memory. For tests and the replay demo.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: DashMap<PlayerId, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a record, as if the player had registered in an earlier
    /// run.
    pub fn with_record(self, player_id: PlayerId, digest: String) -> Self {
        self.records.insert(player_id, digest);
        self
    }

    pub fn get(&self, player_id: PlayerId) -> Option<String> {
        self.records.get(&player_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    async fn persist(
        &self,
        player_id: PlayerId,
        digest: &str,
    ) -> Result<(), CredentialError> {
        self.records.insert(player_id, digest.to_string());
        Ok(())
    }

    async fn load(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<String>, CredentialError> {
        Ok(self.get(player_id))
    }
}
