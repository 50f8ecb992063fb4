use std::io;
use std::path::{Path, PathBuf};

use rcpt_image::ImageFormat;
use tracing::info;
use uuid::Uuid;

/// Directory holding uploaded originals and generated thumbnails.
///
/// Originals are named by a fresh UUID, so concurrent uploads never collide.
/// Thumbnails are named `{receipt_id}_{width}x{height}.jpg` and are
/// overwritten when regenerated. Nothing here is ever deleted.
#[derive(Clone, Debug)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist.
    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Write an uploaded original and return its path. The extension comes
    /// from the sniffed format, never from the client's file name.
    pub async fn save_original(&self, data: &[u8], format: ImageFormat) -> io::Result<PathBuf> {
        let ext = format.extensions_str().first().copied().unwrap_or("img");
        let path = self.root.join(format!("{}.{ext}", Uuid::new_v4()));
        tokio::fs::write(&path, data).await?;
        info!(path = %path.display(), bytes = data.len(), "original saved");
        Ok(path)
    }

    /// Deterministic path of the thumbnail of `receipt_id` at the given
    /// resolved pixel size.
    pub fn thumbnail_path(&self, receipt_id: &str, width: u32, height: u32) -> PathBuf {
        self.root
            .join(format!("{}_{width}x{height}.jpg", file_component(receipt_id)))
    }

    pub async fn write_thumbnail(&self, path: &Path, jpeg: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, jpeg).await?;
        info!(path = %path.display(), bytes = jpeg.len(), "thumbnail written");
        Ok(())
    }
}

/// Keep a receipt ID from escaping the upload directory.
fn file_component(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
