use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::receipt::Receipt;
use crate::traits::ReceiptStore;

/// Default snapshot file name.
pub const DEFAULT_STORE_FILE: &str = "receipts.json";

/// What `put` does when the snapshot cannot be written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Keep the in-memory mutation, log the failure, report success.
    #[default]
    BestEffort,
    /// Undo the in-memory mutation and return the failure. A successful
    /// `put` implies the snapshot on disk contains the receipt.
    Strict,
}

/// Write-through receipt store backed by a single JSON snapshot.
///
/// Every mutation rewrites the whole file while holding the write lock, so
/// concurrent `put` calls are serialized and the file always reflects the
/// last completed mutation. The snapshot is written to a temporary file in
/// the same directory and renamed over the old one.
///
/// On-disk format: a pretty-printed JSON object keyed by receipt ID.
/// ```text
/// {
///   "<id>": { "ID": "<id>", "FilePath": "uploads/<uuid>.jpg", "UserID": "<owner>" }
/// }
/// ```
pub struct JsonFileStore {
    path: PathBuf,
    policy: PersistPolicy,
    receipts: RwLock<HashMap<String, Receipt>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading any existing snapshot.
    ///
    /// A missing file yields an empty store. A file that is not a valid
    /// snapshot is reported as [`StoreError::Corrupt`].
    pub fn open(path: impl Into<PathBuf>, policy: PersistPolicy) -> StoreResult<Self> {
        let store = Self {
            path: path.into(),
            policy,
            receipts: RwLock::new(HashMap::new()),
        };
        store.load()?;
        Ok(store)
    }

    /// Path to the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> PersistPolicy {
        self.policy
    }

    fn read_snapshot(&self) -> StoreResult<HashMap<String, Receipt>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no receipt snapshot; starting empty");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn write_snapshot(&self, receipts: &HashMap<String, Receipt>) -> StoreResult<()> {
        // Sorted on disk so successive snapshots diff cleanly.
        let ordered: BTreeMap<&String, &Receipt> = receipts.iter().collect();
        let json = serde_json::to_vec_pretty(&ordered)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.persist_error(e))?;
        tmp.write_all(&json).map_err(|e| self.persist_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.persist_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.persist_error(e.error))?;

        debug!(path = %self.path.display(), receipts = receipts.len(), "receipt snapshot written");
        Ok(())
    }

    fn persist_error(&self, source: io::Error) -> StoreError {
        StoreError::Persist {
            path: self.path.clone(),
            source,
        }
    }
}

impl ReceiptStore for JsonFileStore {
    fn put(&self, id: &str, file_path: &Path, user_id: &str) -> StoreResult<()> {
        let receipt = Receipt::new(id, file_path, user_id);
        let mut map = self.receipts.write().map_err(|_| StoreError::Poisoned)?;
        let previous = map.insert(id.to_string(), receipt);

        if let Err(e) = self.write_snapshot(&map) {
            match self.policy {
                PersistPolicy::BestEffort => {
                    warn!(receipt_id = id, error = %e, "receipt kept in memory but not persisted");
                }
                PersistPolicy::Strict => {
                    match previous {
                        Some(previous) => map.insert(id.to_string(), previous),
                        None => map.remove(id),
                    };
                    return Err(e);
                }
            }
        }

        debug!(receipt_id = id, user_id, "receipt stored");
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Receipt>> {
        let map = self.receipts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn list_by_owner(&self, user_id: &str) -> StoreResult<Vec<Receipt>> {
        let map = self.receipts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().filter(|r| r.is_owned_by(user_id)).cloned().collect())
    }

    fn load(&self) -> StoreResult<()> {
        let loaded = self.read_snapshot()?;
        let count = loaded.len();
        *self.receipts.write().map_err(|_| StoreError::Poisoned)? = loaded;
        info!(path = %self.path.display(), receipts = count, "receipts loaded");
        Ok(())
    }

    fn persist(&self) -> StoreResult<()> {
        // Write lock so a snapshot never interleaves with a concurrent put.
        let map = self.receipts.write().map_err(|_| StoreError::Poisoned)?;
        self.write_snapshot(&map)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.receipts.read().map_err(|_| StoreError::Poisoned)?.len())
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("receipt_count", &self.len().unwrap_or_default())
            .finish()
    }
}
