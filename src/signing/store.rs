//! Key Record Persistence
//!
//! The custodian never touches the filesystem directly; it reads and writes
//! opaque bytes through a [`KeyStore`]. [`FileKeyStore`] writes each save to
//! its own uniquely named temp file and renames it into place, so a reader
//! never sees half a record, even with concurrent writers.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record under the locator.
    #[error("key record not found: {0}")]
    NotFound(String),
    /// Locator would escape the store or is empty.
    #[error("invalid key locator: '{0}'")]
    InvalidLocator(String),
    /// Underlying I/O failure.
    #[error("key store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Byte storage keyed by locator.
pub trait KeyStore: Send + Sync {
    /// Read the record under `locator`.
    fn load(&self, locator: &str) -> Result<Vec<u8>, StoreError>;

    /// Replace the record under `locator`.
    fn save(&self, locator: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Whether a record exists.
    fn exists(&self, locator: &str) -> Result<bool, StoreError>;

    /// Remove a record; removing a missing record succeeds.
    fn delete(&self, locator: &str) -> Result<(), StoreError>;
}

impl<S: KeyStore + ?Sized> KeyStore for Arc<S> {
    fn load(&self, locator: &str) -> Result<Vec<u8>, StoreError> {
        (**self).load(locator)
    }

    fn save(&self, locator: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).save(locator, bytes)
    }

    fn exists(&self, locator: &str) -> Result<bool, StoreError> {
        (**self).exists(locator)
    }

    fn delete(&self, locator: &str) -> Result<(), StoreError> {
        (**self).delete(locator)
    }
}

/// Reject locators that could name anything outside the store directory.
fn check_locator(locator: &str) -> Result<(), StoreError> {
    let bad = locator.is_empty()
        || locator == "."
        || locator.contains("..")
        || locator.contains('/')
        || locator.contains('\\')
        || locator.contains('\0');

    if bad {
        return Err(StoreError::InvalidLocator(locator.to_string()));
    }
    Ok(())
}

/// One JSON file per record under a base directory.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    base_dir: PathBuf,
}

impl FileKeyStore {
    /// Open (and create if needed) a store rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Store directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the record file for `locator`.
    fn record_path(&self, locator: &str) -> Result<PathBuf, StoreError> {
        check_locator(locator)?;
        Ok(self.base_dir.join(format!("{}.json", locator)))
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self, locator: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.record_path(locator)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(locator.to_string()),
            _ => StoreError::Io(e),
        })
    }

    fn save(&self, locator: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.record_path(locator)?;

        // Unique temp file per save; removed on drop if anything fails
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", locator))
            .suffix(".tmp")
            .tempfile_in(&self.base_dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        // Atomic rename
        temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        Ok(())
    }

    fn exists(&self, locator: &str) -> Result<bool, StoreError> {
        Ok(self.record_path(locator)?.is_file())
    }

    fn delete(&self, locator: &str) -> Result<(), StoreError> {
        let path = self.record_path(locator)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self, locator: &str) -> Result<Vec<u8>, StoreError> {
        check_locator(locator)?;
        self.records
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))
    }

    fn save(&self, locator: &str, bytes: &[u8]) -> Result<(), StoreError> {
        check_locator(locator)?;
        self.records.write().insert(locator.to_string(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, locator: &str) -> Result<bool, StoreError> {
        check_locator(locator)?;
        Ok(self.records.read().contains_key(locator))
    }

    fn delete(&self, locator: &str) -> Result<(), StoreError> {
        check_locator(locator)?;
        self.records.write().remove(locator);
        Ok(())
    }
}
