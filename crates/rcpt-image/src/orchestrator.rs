use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ImageError, ImageResult};
use crate::transform::{self, TargetSize};

/// Outcome of one fan-out worker, tagged with what the caller submitted.
#[derive(Debug)]
pub struct ResizeOutcome<T> {
    /// Caller-supplied identity of the request.
    pub tag: T,
    /// The size that was requested (not the size produced).
    pub target: TargetSize,
    pub result: ImageResult<DynamicImage>,
}

/// Runs image transforms on the blocking pool.
///
/// A shared semaphore bounds how many decodes, resizes, and encodes run at
/// once across all requests. Every call takes a deadline; a worker still
/// waiting for a permit or for its transform when the deadline passes
/// reports [`ImageError::Timeout`]. The blocking transform is not
/// interrupted, but it keeps its permit until it returns.
///
/// Workers are never cancelled because a sibling failed.
#[derive(Clone, Debug)]
pub struct ResizeOrchestrator {
    permits: Arc<Semaphore>,
    jpeg_quality: u8,
}

impl ResizeOrchestrator {
    pub fn new(max_concurrent: usize, jpeg_quality: u8) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            jpeg_quality,
        }
    }

    /// Single-result mode: one worker, one result.
    pub async fn resize_one(
        &self,
        source: PathBuf,
        target: TargetSize,
        deadline: Instant,
    ) -> ImageResult<DynamicImage> {
        let (tx, rx) = oneshot::channel();
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let result = run_transform(permits, source, target, deadline).await;
            // The caller may have gone away; nothing to do then.
            let _ = tx.send(result);
        });

        rx.await
            .map_err(|_| ImageError::Worker("resize worker dropped its result".into()))?
    }

    /// Fan-out mode: one worker per request, all reading the same source.
    ///
    /// Outcomes arrive on the returned channel in completion order, and the
    /// caller may consume each one as soon as it lands rather than after the
    /// whole batch is done. Every request yields exactly one outcome, a
    /// panicking worker included, so the channel closes once all of them
    /// have been sent and draining it never waits on a result that will not
    /// come. Dropping the receiver early does not stop running workers.
    pub fn fan_out<T>(
        &self,
        source: PathBuf,
        requests: Vec<(T, TargetSize)>,
        deadline: Instant,
    ) -> mpsc::Receiver<ResizeOutcome<T>>
    where
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(requests.len().max(1));
        let mut workers = JoinSet::new();

        debug!(source = %source.display(), workers = requests.len(), "fan-out resize");
        for (tag, target) in requests {
            let permits = Arc::clone(&self.permits);
            let source = source.clone();
            workers.spawn(tagged(tag, target, run_transform(permits, source, target, deadline)));
        }

        tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(outcome) => {
                        // Keep draining even if the receiver is gone.
                        let _ = tx.send(outcome).await;
                    }
                    Err(e) => warn!(error = %e, "resize worker task failed"),
                }
            }
        });

        rx
    }

    /// Encode `image` as JPEG at the configured quality.
    pub async fn encode_jpeg(&self, image: DynamicImage) -> ImageResult<Vec<u8>> {
        let quality = self.jpeg_quality;
        self.run_blocking(move || transform::encode_jpeg(&image, quality))
            .await
    }

    /// Fully decode uploaded bytes to check they are an image.
    pub async fn probe(&self, data: Bytes) -> ImageResult<ImageFormat> {
        self.run_blocking(move || transform::probe(&data)).await
    }

    async fn run_blocking<R, F>(&self, work: F) -> ImageResult<R>
    where
        F: FnOnce() -> ImageResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ImageError::Worker("image worker pool closed".into()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        })
        .await
        .map_err(|e| ImageError::Worker(e.to_string()))?
    }
}

/// Run `work` as its own task so a panic comes back as an error carrying the
/// caller's tag instead of a bare `JoinError`.
async fn tagged<T, F>(tag: T, target: TargetSize, work: F) -> ResizeOutcome<T>
where
    F: Future<Output = ImageResult<DynamicImage>> + Send + 'static,
{
    let result = match tokio::spawn(work).await {
        Ok(result) => result,
        Err(e) => {
            warn!(%target, error = %e, "resize worker task failed");
            Err(ImageError::Worker(e.to_string()))
        }
    };
    ResizeOutcome { tag, target, result }
}

async fn run_transform(
    permits: Arc<Semaphore>,
    source: PathBuf,
    target: TargetSize,
    deadline: Instant,
) -> ImageResult<DynamicImage> {
    let work = async move {
        let permit = permits
            .acquire_owned()
            .await
            .map_err(|_| ImageError::Worker("image worker pool closed".into()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            transform::resize(&source, target)
        })
        .await
        .map_err(|e| ImageError::Worker(e.to_string()))?
    };

    match tokio::time::timeout_at(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            warn!(%target, "resize deadline exceeded");
            Err(ImageError::Timeout { target })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::collections::HashMap;
    use std::time::Duration;

    fn write_png(dir: &tempfile::TempDir, width: u32, height: u32) -> PathBuf {
        let path = dir.path().join("source.png");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 10, 10])))
            .save(&path)
            .unwrap();
        path
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn single_result_mode() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, 400, 300);
        let orch = ResizeOrchestrator::new(2, 85);

        let img = orch
            .resize_one(source, TargetSize::square(100), far_deadline())
            .await
            .unwrap();
        assert_eq!(img.dimensions(), (100, 75));
    }

    async fn exploding_decode() -> ImageResult<DynamicImage> {
        panic!("decoder blew up")
    }

    #[tokio::test]
    async fn panicking_worker_still_reports_its_tag() {
        let outcome = tagged("medium", TargetSize::square(200), exploding_decode()).await;
        assert_eq!(outcome.tag, "medium");
        assert_eq!(outcome.target, TargetSize::square(200));
        assert!(matches!(outcome.result, Err(ImageError::Worker(_))));
    }

    #[tokio::test]
    async fn single_result_mode_reports_failure() {
        let orch = ResizeOrchestrator::new(1, 85);
        let err = orch
            .resize_one(PathBuf::from("does/not/exist.png"), TargetSize::square(100), far_deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }));
    }

    #[tokio::test]
    async fn fan_out_tags_every_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, 800, 600);
        let orch = ResizeOrchestrator::new(4, 85);

        let requests = vec![
            ("small", TargetSize::square(100)),
            ("medium", TargetSize::square(200)),
            ("large", TargetSize::square(400)),
        ];
        let mut rx = orch.fan_out(source, requests, far_deadline());

        let mut sizes = HashMap::new();
        while let Some(outcome) = rx.recv().await {
            let img = outcome.result.unwrap();
            sizes.insert(outcome.tag, img.dimensions());
        }

        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes["small"], (100, 75));
        assert_eq!(sizes["medium"], (200, 150));
        assert_eq!(sizes["large"], (400, 300));
    }

    #[tokio::test]
    async fn fan_out_runs_every_worker_despite_failures() {
        let orch = ResizeOrchestrator::new(4, 85);
        let requests = vec![(1, TargetSize::square(100)), (2, TargetSize::square(200)), (3, TargetSize::square(400))];
        let mut rx = orch.fan_out(PathBuf::from("missing.png"), requests, far_deadline());

        let mut failures = 0;
        while let Some(outcome) = rx.recv().await {
            assert!(outcome.result.is_err());
            failures += 1;
        }
        assert_eq!(failures, 3);
    }

    #[tokio::test]
    async fn worker_waiting_past_deadline_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, 50, 50);
        let orch = ResizeOrchestrator::new(1, 85);

        // Hold the only permit so the worker cannot start.
        let _held = Arc::clone(&orch.permits).acquire_owned().await.unwrap();

        let deadline = Instant::now() + Duration::from_millis(50);
        let err = orch
            .resize_one(source, TargetSize::square(10), deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Timeout { target } if target == TargetSize::square(10)));
    }

    #[tokio::test]
    async fn encode_and_probe() {
        let orch = ResizeOrchestrator::new(1, 90);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, Rgb([1, 2, 3])));
        let jpeg = orch.encode_jpeg(img).await.unwrap();

        let format = orch.probe(Bytes::from(jpeg)).await.unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert!(orch.probe(Bytes::from_static(b"not an image")).await.is_err());
    }
}
