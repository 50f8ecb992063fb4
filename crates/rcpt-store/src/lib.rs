//! Receipt metadata storage.
//!
//! Maps a receipt ID to the location of its uploaded image and the identity
//! that owns it. The file-backed store mirrors the whole mapping to a single
//! pretty-printed JSON document after every mutation.
//!
//! # Storage Backends
//!
//! All backends implement the [`ReceiptStore`] trait:
//!
//! - [`InMemoryReceiptStore`] -- `HashMap`-based store for tests and embedding
//! - [`JsonFileStore`] -- write-through store backed by `receipts.json`
//!
//! # Design Rules
//!
//! 1. A receipt ID maps to at most one receipt; `put` on an existing ID
//!    overwrites it (last write wins).
//! 2. Mutations are serialized behind a write lock, including the disk write.
//! 3. Reads never touch the disk.
//! 4. A missing snapshot file loads as an empty store; a malformed one is an
//!    error.
//! 5. Nothing is ever deleted.

pub mod error;
pub mod file;
pub mod memory;
pub mod receipt;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{JsonFileStore, PersistPolicy, DEFAULT_STORE_FILE};
pub use memory::InMemoryReceiptStore;
pub use receipt::Receipt;
pub use traits::ReceiptStore;
