use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::receipt::Receipt;
use crate::traits::ReceiptStore;

/// In-memory, HashMap-based receipt store.
///
/// Intended for tests and embedding. `load` and `persist` are no-ops since
/// there is no backing snapshot.
pub struct InMemoryReceiptStore {
    receipts: RwLock<HashMap<String, Receipt>>,
}

impl InMemoryReceiptStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            receipts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryReceiptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptStore for InMemoryReceiptStore {
    fn put(&self, id: &str, file_path: &Path, user_id: &str) -> StoreResult<()> {
        let mut map = self.receipts.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(id.to_string(), Receipt::new(id, file_path, user_id));
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
        Ok(())
    }

    fn persist(&self) -> StoreResult<()> {
        Ok(())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.receipts.read().map_err(|_| StoreError::Poisoned)?.len())
    }
}

impl std::fmt::Debug for InMemoryReceiptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryReceiptStore")
            .field("receipt_count", &count)
            .finish()
    }
}
