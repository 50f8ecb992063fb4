//! Receipt upload, listing, retrieval, and thumbnail generation.
//!
//! Retrieval runs a small state machine per request:
//!
//! 1. ownership check against the store (404 / 403)
//! 2. no size requested: serve the original bytes untouched
//! 3. one size requested: single-result resize, re-encoded as JPEG
//! 4. thumbnails: fan-out resize to every [`ThumbnailSize`], each written next
//!    to the original. The first failure aborts the response; thumbnails
//!    already written stay on disk.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rcpt_image::{mime_type, GenericImageView, ResizeOrchestrator, TargetSize};
use rcpt_store::{Receipt, ReceiptStore};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::{ServerError, ServerResult};
use crate::thumbnail::{ThumbnailManifest, ThumbnailSize};
use crate::uploads::UploadDir;

/// A file part of an upload request.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// What a retrieval request resolves to.
#[derive(Debug)]
pub enum ReceiptImage {
    /// The stored bytes, verbatim.
    Original { data: Vec<u8>, content_type: &'static str },
    /// A resized copy, encoded as JPEG.
    Resized { jpeg: Vec<u8> },
}

pub struct ReceiptService {
    store: Arc<dyn ReceiptStore>,
    orchestrator: ResizeOrchestrator,
    uploads: UploadDir,
    resize_timeout: Duration,
}

impl ReceiptService {
    pub fn new(
        store: Arc<dyn ReceiptStore>,
        orchestrator: ResizeOrchestrator,
        uploads: UploadDir,
        resize_timeout: Duration,
    ) -> Self {
        Self {
            store,
            orchestrator,
            uploads,
            resize_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn ReceiptStore> {
        &self.store
    }

    /// Store every uploaded file as a new receipt owned by `identity`.
    ///
    /// All files are validated before any is written, so a request with one
    /// bad file creates no receipts.
    pub async fn upload(&self, identity: &Identity, files: Vec<UploadedFile>) -> ServerResult<Vec<String>> {
        if files.is_empty() {
            return Err(ServerError::InvalidRequest("no receipt file in upload".into()));
        }

        let mut formats = Vec::with_capacity(files.len());
        for file in &files {
            let format = self
                .orchestrator
                .probe(file.data.clone())
                .await
                .map_err(|e| ServerError::InvalidImage(format!("{}: {e}", file.file_name)))?;
            formats.push(format);
        }

        let mut ids = Vec::with_capacity(files.len());
        for (file, format) in files.iter().zip(formats) {
            let path = self.uploads.save_original(&file.data, format).await?;
            let id = Uuid::new_v4().to_string();
            self.put(id.clone(), path, identity.user_id.clone()).await?;
            info!(receipt_id = %id, user_id = %identity.user_id, file_name = %file.file_name, "receipt uploaded");
            ids.push(id);
        }
        Ok(ids)
    }

    async fn put(&self, id: String, path: PathBuf, user_id: String) -> ServerResult<()> {
        // The file-backed store writes its snapshot synchronously.
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.put(&id, &path, &user_id))
            .await
            .map_err(|e| ServerError::Internal(format!("store task failed: {e}")))??;
        Ok(())
    }

    /// The caller's receipts, sorted by ID. Having none is a 404.
    pub fn list(&self, identity: &Identity) -> ServerResult<Vec<Receipt>> {
        let mut receipts = self.store.list_by_owner(&identity.user_id)?;
        if receipts.is_empty() {
            return Err(ServerError::NoReceipts);
        }
        receipts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(receipts)
    }

    /// Look up `receipt_id` and check that `identity` owns it.
    pub fn authorize(&self, identity: &Identity, receipt_id: &str) -> ServerResult<Receipt> {
        let receipt = self
            .store
            .get(receipt_id)?
            .ok_or_else(|| ServerError::ReceiptNotFound(receipt_id.to_string()))?;
        if !receipt.is_owned_by(&identity.user_id) {
            return Err(ServerError::Forbidden {
                receipt_id: receipt_id.to_string(),
                user_id: identity.user_id.clone(),
            });
        }
        Ok(receipt)
    }

    /// Serve the original, or a single resized JPEG.
    pub async fn retrieve(&self, receipt: &Receipt, target: TargetSize) -> ServerResult<ReceiptImage> {
        if target.is_unconstrained() {
            let data = tokio::fs::read(receipt.path()).await?;
            let content_type = mime_type(&data);
            return Ok(ReceiptImage::Original { data, content_type });
        }

        let image = self
            .orchestrator
            .resize_one(receipt.file_path.clone(), target, self.deadline())
            .await?;
        let jpeg = self.orchestrator.encode_jpeg(image).await?;
        debug!(receipt_id = %receipt.id, %target, bytes = jpeg.len(), "resized receipt served");
        Ok(ReceiptImage::Resized { jpeg })
    }

    /// Generate and persist every thumbnail size for `receipt`.
    pub async fn thumbnails(&self, receipt: &Receipt) -> ServerResult<ThumbnailManifest> {
        let requests = ThumbnailSize::ALL.iter().map(|size| (*size, size.target())).collect();
        let mut outcomes = self
            .orchestrator
            .fan_out(receipt.file_path.clone(), requests, self.deadline());

        let mut manifest = ThumbnailManifest::default();
        while let Some(outcome) = outcomes.recv().await {
            let image = outcome.result?;
            let (width, height) = image.dimensions();
            let path = self.uploads.thumbnail_path(&receipt.id, width, height);
            let jpeg = self.orchestrator.encode_jpeg(image).await?;
            self.uploads.write_thumbnail(&path, &jpeg).await?;
            debug!(receipt_id = %receipt.id, size = outcome.tag.name(), path = %path.display(), "thumbnail ready");
            manifest.set(outcome.tag, &path);
        }

        if let Some(size) = manifest.missing() {
            return Err(ServerError::Internal(format!(
                "no {} thumbnail produced for receipt {}",
                size.name(),
                receipt.id
            )));
        }
        info!(receipt_id = %receipt.id, "thumbnails generated");
        Ok(manifest)
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.resize_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcpt_image::ImageError;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use rcpt_store::{InMemoryReceiptStore, JsonFileStore, PersistPolicy};
    use std::io::Cursor;
    use std::path::Path;

    fn png(width: u32, height: u32) -> Bytes {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([9, 99, 199])))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    fn service(dir: &tempfile::TempDir) -> ReceiptService {
        ReceiptService::new(
            Arc::new(InMemoryReceiptStore::new()),
            ResizeOrchestrator::new(4, 85),
            UploadDir::new(dir.path()),
            Duration::from_secs(30),
        )
    }

    fn file(name: &str, data: Bytes) -> UploadedFile {
        UploadedFile { file_name: name.into(), data }
    }

    #[tokio::test]
    async fn upload_creates_one_receipt_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let me = Identity::user("u1");

        let ids = svc
            .upload(&me, vec![file("a.png", png(10, 10)), file("b.png", png(20, 20))])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        let listed = svc.list(&me).unwrap();
        assert_eq!(listed.len(), 2);
        for r in listed {
            assert!(r.path().exists());
            assert_eq!(r.user_id, "u1");
        }
    }

    #[tokio::test]
    async fn one_bad_file_rejects_the_whole_upload() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);

        let err = svc
            .upload(
                &Identity::user("u1"),
                vec![file("a.png", png(10, 10)), file("notes.txt", Bytes::from_static(b"hello"))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidImage(_)));
        assert!(svc.store().is_empty().unwrap());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_upload_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let err = svc.upload(&Identity::user("u1"), vec![]).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn strict_persist_failure_fails_upload_and_keeps_no_record() {
        let dir = tempfile::tempdir().unwrap();
        // The store's directory does not exist, so every snapshot write fails.
        let store = JsonFileStore::open(dir.path().join("missing/receipts.json"), PersistPolicy::Strict).unwrap();
        let svc = ReceiptService::new(
            Arc::new(store),
            ResizeOrchestrator::new(2, 85),
            UploadDir::new(dir.path()),
            Duration::from_secs(30),
        );
        let me = Identity::user("u1");

        let err = svc.upload(&me, vec![file("a.png", png(10, 10))]).await.unwrap_err();
        assert!(matches!(err, ServerError::Store(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(svc.store().is_empty().unwrap());
        assert!(matches!(svc.list(&me), Err(ServerError::NoReceipts)));
    }

    #[tokio::test]
    async fn best_effort_persist_failure_keeps_record_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("missing/receipts.json"), PersistPolicy::BestEffort).unwrap();
        let svc = ReceiptService::new(
            Arc::new(store),
            ResizeOrchestrator::new(2, 85),
            UploadDir::new(dir.path()),
            Duration::from_secs(30),
        );
        let me = Identity::user("u1");

        let ids = svc.upload(&me, vec![file("a.png", png(10, 10))]).await.unwrap();
        assert_eq!(svc.list(&me).unwrap()[0].id, ids[0]);
    }

    #[tokio::test]
    async fn resize_with_oversized_computed_side_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let me = Identity::user("u1");
        let id = svc.upload(&me, vec![file("thin.png", png(1, 10_000))]).await.unwrap().remove(0);
        let receipt = svc.authorize(&me, &id).unwrap();

        let err = svc.retrieve(&receipt, TargetSize::new(10_000, 0)).await.unwrap_err();
        assert!(matches!(err, ServerError::Image(ImageError::OutputTooLarge { .. })));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn authorize_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        svc.store().put("r1", Path::new("x.png"), "owner").unwrap();

        assert!(svc.authorize(&Identity::user("owner"), "r1").is_ok());
        assert!(matches!(
            svc.authorize(&Identity::user("other"), "r1"),
            Err(ServerError::Forbidden { .. })
        ));
        assert!(matches!(
            svc.authorize(&Identity::user("owner"), "r2"),
            Err(ServerError::ReceiptNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_is_sorted_and_empty_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        svc.store().put("b", Path::new("b.png"), "u1").unwrap();
        svc.store().put("a", Path::new("a.png"), "u1").unwrap();
        svc.store().put("c", Path::new("c.png"), "u2").unwrap();

        let ids: Vec<String> = svc.list(&Identity::user("u1")).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(matches!(svc.list(&Identity::user("u3")), Err(ServerError::NoReceipts)));
    }

    #[tokio::test]
    async fn retrieve_original_and_resized() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let me = Identity::user("u1");
        let original = png(300, 150);
        let id = svc.upload(&me, vec![file("r.png", original.clone())]).await.unwrap().remove(0);
        let receipt = svc.authorize(&me, &id).unwrap();

        match svc.retrieve(&receipt, TargetSize::default()).await.unwrap() {
            ReceiptImage::Original { data, content_type } => {
                assert_eq!(data, original.to_vec());
                assert_eq!(content_type, "image/png");
            }
            other => panic!("expected original, got {other:?}"),
        }

        match svc.retrieve(&receipt, TargetSize::new(100, 0)).await.unwrap() {
            ReceiptImage::Resized { jpeg } => {
                let decoded = image::load_from_memory(&jpeg).unwrap();
                assert_eq!(decoded.dimensions(), (100, 50));
            }
            other => panic!("expected resized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn thumbnails_are_tagged_by_request() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let me = Identity::user("u1");
        let id = svc.upload(&me, vec![file("r.png", png(800, 400))]).await.unwrap().remove(0);
        let receipt = svc.authorize(&me, &id).unwrap();

        let manifest = svc.thumbnails(&receipt).await.unwrap();
        assert!(manifest.is_complete());
        assert!(manifest.small.ends_with(&format!("{id}_100x50.jpg")));
        assert!(manifest.medium.ends_with(&format!("{id}_200x100.jpg")));
        assert!(manifest.large.ends_with(&format!("{id}_400x200.jpg")));
        for size in ThumbnailSize::ALL {
            let img = image::open(manifest.get(size)).unwrap();
            assert!(img.width() <= size.max_width());
        }
    }

    #[tokio::test]
    async fn thumbnails_of_unreadable_original_fail() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let receipt = Receipt::new("r1", dir.path().join("gone.png"), "u1");
        let err = svc.thumbnails(&receipt).await.unwrap_err();
        assert!(matches!(err, ServerError::Image(_)));
    }
}
