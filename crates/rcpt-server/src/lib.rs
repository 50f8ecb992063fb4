//! HTTP server for receipt images.
//!
//! Users upload receipt images, list their own receipts, and fetch each one
//! either as the original bytes, resized to a requested box, or as a set of
//! three thumbnails written next to the original. Ownership is checked
//! against the opaque `X-User-ID` header on every receipt access.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod thumbnail;
pub mod uploads;
pub mod workflow;

pub use auth::{Identity, USER_ID_HEADER};
pub use config::{ServerConfig, DEFAULT_UPLOAD_DIR};
pub use error::{ServerError, ServerResult};
pub use handler::{HealthResponse, SizeParams};
pub use server::ReceiptServer;
pub use thumbnail::{ThumbnailManifest, ThumbnailSize};
pub use uploads::UploadDir;
pub use workflow::{ReceiptImage, ReceiptService, UploadedFile};
