use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{
    database::Repository,
    errors::Result,
    models::{now_millis, Job, Photo},
    services::{
        image_processor::{ImageProcessor, OutputFormat, HIGH_RES_HEIGHT, LOW_RES_HEIGHT},
        metrics::MetricsService,
    },
    storage::{ObjectStore, StorageError, UPLOADS_BUCKET},
};

pub const SUCCESS_REASON: &str = "Generated all thumbnails and copied original.";
pub const UNREADABLE_REASON: &str = "Failed to read image file.";

#[derive(Debug)]
enum JobFailure {
    Unreadable,
    Storage(StorageError),
    Processing(String),
    Database(String),
}

impl JobFailure {
    fn reason(&self) -> String {
        match self {
            JobFailure::Unreadable => UNREADABLE_REASON.to_string(),
            JobFailure::Storage(e) => format!("Storage error: {}", e),
            JobFailure::Processing(msg) => format!("Image processing error: {}", msg),
            JobFailure::Database(msg) => format!("Database error: {}", msg),
        }
    }
}

impl From<StorageError> for JobFailure {
    fn from(e: StorageError) -> Self {
        JobFailure::Storage(e)
    }
}

/// Periodically turns staged uploads into published photos and clears out
/// finished jobs.
pub struct JobWorker {
    repo: Arc<dyn Repository>,
    storage: Arc<dyn ObjectStore>,
    metrics: Arc<MetricsService>,
    interval: Duration,
    expiry: Duration,
}

impl JobWorker {
    pub fn new(
        repo: Arc<dyn Repository>,
        storage: Arc<dyn ObjectStore>,
        metrics: Arc<MetricsService>,
        interval: Duration,
        expiry: Duration,
    ) -> Self {
        Self {
            repo,
            storage,
            metrics,
            interval,
            expiry,
        }
    }

    /// Runs one pass over every job.
    pub async fn run_once(&self) -> Result<()> {
        tracing::info!("Looking for jobs to process");
        let jobs = self.repo.list_jobs().await?;

        for mut job in jobs {
            if job.processing {
                if let Err(e) = self.process(&mut job).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to update job");
                }
            } else if job.age_millis(now_millis()) > self.expiry.as_millis() as i64 {
                tracing::warn!(job_id = %job.id, file_name = %job.file_name, "Deleting expired job");
                self.repo.delete_job(job.id).await?;
                self.metrics.record_expired_job();
            }
        }

        tracing::info!("Finished processing jobs for this cycle");
        Ok(())
    }

    async fn process(&self, job: &mut Job) -> Result<()> {
        tracing::info!(
            job_id = %job.id,
            file_name = %job.file_name,
            category = %job.category,
            "Processing staged upload"
        );

        match self.publish(job).await {
            Ok(photo) => {
                tracing::info!(job_id = %job.id, photo_id = %photo.id, "Published photo");
                job.finish(true, SUCCESS_REASON);
            }
            Err(failure) => {
                tracing::warn!(job_id = %job.id, failure = ?failure, "Job failed");
                job.finish(false, failure.reason());
            }
        }

        self.metrics.record_job(job.success);
        self.repo.update_job(job).await
    }

    async fn publish(&self, job: &Job) -> std::result::Result<Photo, JobFailure> {
        let data = self.storage.get_object(UPLOADS_BUCKET, &job.file_name).await?;

        let (low_res, high_res) = tokio::task::spawn_blocking(move || {
            let img = ImageProcessor::decode(&data).map_err(|_| JobFailure::Unreadable)?;
            let thumbnail = |height| {
                ImageProcessor::encode(&ImageProcessor::thumbnail(&img, height), OutputFormat::Jpeg)
                    .map_err(|e| JobFailure::Processing(e.to_string()))
            };
            Ok::<_, JobFailure>((thumbnail(LOW_RES_HEIGHT)?, thumbnail(HIGH_RES_HEIGHT)?))
        })
        .await
        .map_err(|e| JobFailure::Processing(e.to_string()))??;

        let photo = Photo::for_upload(job.category, &job.file_name);
        let bucket = job.category.to_string();
        let jpeg = OutputFormat::Jpeg.content_type();

        self.storage
            .put_object(&bucket, &photo.low_res, low_res, jpeg)
            .await?;
        self.storage
            .put_object(&bucket, &photo.high_res, high_res, jpeg)
            .await?;
        self.storage
            .copy_object(UPLOADS_BUCKET, &job.file_name, &bucket, &photo.full_photo)
            .await?;

        self.repo
            .insert_photo(&photo)
            .await
            .map_err(|e| JobFailure::Database(e.to_string()))?;

        self.storage
            .remove_object(UPLOADS_BUCKET, &job.file_name)
            .await?;

        Ok(photo)
    }

    /// Starts the periodic loop; it exits once `shutdown` flips or its sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = self.interval.as_secs(), "Job worker started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            tracing::error!(error = %e, "Job worker cycle failed");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }

            tracing::info!("Job worker stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRepository;
    use crate::models::Category;
    use crate::storage::{ensure_bucket, LocalObjectStore};
    use image::{DynamicImage, GenericImageView, RgbImage};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        repo: Arc<MemoryRepository>,
        storage: Arc<LocalObjectStore>,
        worker: JobWorker,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(MemoryRepository::new());
        let storage = Arc::new(LocalObjectStore::new(dir.path()).unwrap());
        ensure_bucket(storage.as_ref(), UPLOADS_BUCKET).await.unwrap();

        let worker = JobWorker::new(
            repo.clone(),
            storage.clone(),
            Arc::new(MetricsService::new()),
            Duration::from_secs(60),
            Duration::from_secs(900),
        );

        Fixture {
            _dir: dir,
            repo,
            storage,
            worker,
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        ImageProcessor::encode(&img, OutputFormat::Png).unwrap()
    }

    #[tokio::test]
    async fn test_publishes_staged_upload() {
        let f = fixture().await;
        let category = Category::new("Coast");
        f.repo.insert_category(&category).await.unwrap();
        f.storage.make_bucket(&category.bucket()).await.unwrap();
        f.storage
            .put_object(UPLOADS_BUCKET, "a.png", png(1600, 1200), "image/png")
            .await
            .unwrap();

        let job = Job::new(category.id, "a.png");
        f.repo.insert_job(&job).await.unwrap();

        f.worker.run_once().await.unwrap();

        let jobs = f.repo.list_jobs().await.unwrap();
        assert!(!jobs[0].processing);
        assert!(jobs[0].success);
        assert_eq!(jobs[0].reason.as_deref(), Some(SUCCESS_REASON));

        let page = f.repo.photos_by_category(category.id, 0, 10).await.unwrap();
        assert_eq!(page.total_items, 1);
        let photo = &page.photos[0];
        assert_eq!(photo.low_res, "480_a.png");

        let bucket = category.bucket();
        let low = f.storage.get_object(&bucket, "480_a.png").await.unwrap();
        assert_eq!(image::load_from_memory(&low).unwrap().dimensions(), (640, 480));
        let high = f.storage.get_object(&bucket, "1080_a.png").await.unwrap();
        assert_eq!(image::load_from_memory(&high).unwrap().dimensions(), (1440, 1080));
        assert!(f.storage.stat_object(&bucket, "original_a.png").await.is_ok());
        assert!(matches!(
            f.storage.stat_object(UPLOADS_BUCKET, "a.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_image_fails_job() {
        let f = fixture().await;
        f.storage
            .put_object(UPLOADS_BUCKET, "bad.jpg", b"garbage".to_vec(), "image/jpeg")
            .await
            .unwrap();
        f.repo.insert_job(&Job::new(uuid::Uuid::new_v4(), "bad.jpg")).await.unwrap();

        f.worker.run_once().await.unwrap();

        let job = &f.repo.list_jobs().await.unwrap()[0];
        assert!(!job.processing);
        assert!(!job.success);
        assert_eq!(job.reason.as_deref(), Some(UNREADABLE_REASON));
    }

    #[tokio::test]
    async fn test_missing_upload_reports_storage_error() {
        let f = fixture().await;
        f.repo.insert_job(&Job::new(uuid::Uuid::new_v4(), "gone.jpg")).await.unwrap();

        f.worker.run_once().await.unwrap();

        let job = &f.repo.list_jobs().await.unwrap()[0];
        assert!(!job.success);
        assert!(job.reason.as_deref().unwrap().starts_with("Storage error: "));
    }

    #[tokio::test]
    async fn test_expired_jobs_are_deleted() {
        let f = fixture().await;
        let mut old = Job::new(uuid::Uuid::new_v4(), "old.jpg");
        old.finish(false, UNREADABLE_REASON);
        old.timestamp = now_millis() - 16 * 60 * 1000;
        let mut recent = Job::new(uuid::Uuid::new_v4(), "recent.jpg");
        recent.finish(true, SUCCESS_REASON);
        f.repo.insert_job(&old).await.unwrap();
        f.repo.insert_job(&recent).await.unwrap();

        f.worker.run_once().await.unwrap();

        let jobs = f.repo.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, recent.id);
    }

    #[tokio::test]
    async fn test_spawned_worker_stops_on_shutdown() {
        let f = fixture().await;
        let (tx, rx) = watch::channel(false);
        let handle = f.worker.spawn(rx);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
