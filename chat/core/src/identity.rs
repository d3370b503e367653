//! Session Identity
//!
//! The opaque per-install identifier that correlates requests, settings and
//! server-side history. It is generated once, persisted in client-local
//! storage under [`IDENTITY_KEY`], and read back on every later start.
//!
//! A store that cannot be read is an error rather than a reason to mint a new
//! identity; silently regenerating would orphan the user's history.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Storage key for the identity
pub const IDENTITY_KEY: &str = "chat_session_id";

/// File name of the persisted client state inside the state directory
pub const STATE_FILE_NAME: &str = "client_state.json";

/// Errors from the client-local store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the store failed
    #[error("Failed to access client state at {path}: {source}")]
    Io {
        /// Store path
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The store exists but is not a JSON object of strings
    #[error("Client state at {path} is corrupt: {source}")]
    Corrupt {
        /// Store path
        path: PathBuf,
        /// The underlying parse error
        source: serde_json::Error,
    },
}

/// Client-local key/value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value
    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value
    async fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// JSON-file backed store
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store file inside `state_dir`, loading existing entries
    ///
    /// A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file exists but cannot be read or parsed.
    pub async fn open(state_dir: &Path) -> Result<Self, StoreError> {
        let path = state_dir.join(STATE_FILE_NAME);
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, entries })
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        tokio::fs::write(&self.path, text).await.map_err(io_err)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist().await
    }

    async fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.persist().await?;
        }
        Ok(())
    }
}

/// In-memory store (tests, ephemeral sessions)
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stable per-install client identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    /// Read the identity from the store, creating and persisting one if absent
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or written.
    pub async fn load_or_create<S: KeyValueStore + ?Sized>(
        store: &mut S,
    ) -> Result<Self, StoreError> {
        if let Some(existing) = store.get(IDENTITY_KEY).await? {
            if !existing.trim().is_empty() {
                tracing::debug!(identity = %existing, "Loaded session identity");
                return Ok(Self(existing));
            }
        }

        let identity = Self(uuid::Uuid::new_v4().to_string());
        store.set(IDENTITY_KEY, &identity.0).await?;
        tracing::info!(identity = %identity, "Created session identity");
        Ok(identity)
    }

    /// Wrap an existing identifier
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent on the wire
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_identity_created_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = FileStore::open(dir.path()).await.unwrap();
        let first = SessionIdentity::load_or_create(&mut store).await.unwrap();
        assert!(uuid::Uuid::parse_str(first.as_str()).is_ok());

        // Simulate a restart: reopen from disk
        let mut reopened = FileStore::open(dir.path()).await.unwrap();
        let second = SessionIdentity::load_or_create(&mut reopened).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cleared_storage_yields_new_identity() {
        let mut store = MemoryStore::new();
        let first = SessionIdentity::load_or_create(&mut store).await.unwrap();

        store.remove(IDENTITY_KEY).await.unwrap();
        let second = SessionIdentity::load_or_create(&mut store).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(STATE_FILE_NAME), "not json")
            .await
            .unwrap();

        let result = FileStore::open(dir.path()).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).await.unwrap();
        store.set("theme", "dark").await.unwrap();
        SessionIdentity::load_or_create(&mut store).await.unwrap();

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.get("theme").await.unwrap().as_deref(), Some("dark"));
        assert!(reopened.get(IDENTITY_KEY).await.unwrap().is_some());
    }
}
