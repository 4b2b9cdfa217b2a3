//! Storage for rendered receipt bytes.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("receipt archive io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("receipt archive lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait ReceiptArchive: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArchiveError>;

    /// `None` if nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ArchiveError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), ArchiveError>;
}

/// Keys are generated internally; anything outside `[A-Za-z0-9._-]` or
/// starting with a dot is rejected so a key can never leave the archive
/// directory.
fn validate_key(key: &str) -> Result<(), ArchiveError> {
    let ok = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(ArchiveError::InvalidKey(key.to_string()))
    }
}

/// One file per receipt under a root directory.
#[derive(Debug, Clone)]
pub struct FsReceiptArchive {
    root: PathBuf,
}

impl FsReceiptArchive {
    /// Creates `root` if it does not exist.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ArchiveError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ReceiptArchive for FsReceiptArchive {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        let path = self.path_for(key)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ArchiveError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory archive for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReceiptArchive {
    inner: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryReceiptArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReceiptArchive for InMemoryReceiptArchive {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        validate_key(key)?;
        let mut map = self.inner.write().map_err(|_| ArchiveError::Poisoned)?;
        map.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        let map = self.inner.read().map_err(|_| ArchiveError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), ArchiveError> {
        let mut map = self.inner.write().map_err(|_| ArchiveError::Poisoned)?;
        map.remove(key);
        Ok(())
    }
}
