use std::path::Path;

use crate::error::StoreResult;
use crate::receipt::Receipt;

/// Receipt metadata store.
///
/// All implementations must satisfy these invariants:
/// - An ID maps to at most one receipt. `put` on an existing ID replaces it.
/// - Concurrent reads are always safe; mutations are serialized.
/// - `list_by_owner` returns every receipt whose owner matches, in no
///   particular order, and an empty vector when there are none.
pub trait ReceiptStore: Send + Sync {
    /// Insert or overwrite the receipt for `id`.
    ///
    /// File-backed implementations persist the full mapping before returning.
    /// Whether a failed persist is reported depends on the backend's policy.
    fn put(&self, id: &str, file_path: &Path, user_id: &str) -> StoreResult<()>;

    /// Look up a receipt by ID. Returns `Ok(None)` if it does not exist.
    fn get(&self, id: &str) -> StoreResult<Option<Receipt>>;

    /// All receipts owned by `user_id`.
    fn list_by_owner(&self, user_id: &str) -> StoreResult<Vec<Receipt>>;

    /// Replace the in-memory mapping with the persisted snapshot.
    fn load(&self) -> StoreResult<()>;

    /// Write the full in-memory mapping to the backing snapshot.
    fn persist(&self) -> StoreResult<()>;

    /// Number of receipts currently held.
    fn len(&self) -> StoreResult<usize>;

    /// Returns `true` if the store holds no receipts.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
