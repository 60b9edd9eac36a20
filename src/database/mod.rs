use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    errors::Result,
    models::{Category, Job, LoginAttempt, Photo, PhotoPage},
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryRepository;
pub use mysql::MySqlRepository;

/// Persistence operations used by handlers and the job worker.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn ping(&self) -> Result<()>;

    // Categories
    async fn insert_category(&self, category: &Category) -> Result<()>;
    async fn find_category(&self, id: Uuid) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn update_category(&self, category: &Category) -> Result<bool>;
    async fn delete_category(&self, id: Uuid) -> Result<bool>;

    // Photos
    async fn insert_photo(&self, photo: &Photo) -> Result<()>;
    async fn find_photo(&self, id: Uuid) -> Result<Option<Photo>>;
    async fn photos_by_category(&self, category: Uuid, page: u32, size: u32) -> Result<PhotoPage>;
    async fn delete_photo(&self, id: Uuid) -> Result<bool>;

    // Jobs
    async fn insert_job(&self, job: &Job) -> Result<()>;
    async fn list_jobs(&self) -> Result<Vec<Job>>;
    async fn update_job(&self, job: &Job) -> Result<()>;
    async fn delete_job(&self, id: Uuid) -> Result<bool>;

    // Login attempts
    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()>;
    /// Failed attempts from `ip_addr` strictly after `since` (epoch millis).
    async fn count_failed_attempts(&self, ip_addr: &str, since: i64) -> Result<i64>;
}

/// Picks the backend from the URL scheme: `memory://` or a MySQL URL.
pub async fn connect(database_url: &str) -> Result<Arc<dyn Repository>> {
    if database_url.starts_with("memory:") {
        tracing::warn!("Using in-memory repository, data will not survive a restart");
        return Ok(Arc::new(MemoryRepository::new()));
    }

    let repository = MySqlRepository::new(database_url).await?;
    repository.migrate().await?;
    tracing::info!("Connected to database and applied migrations");
    Ok(Arc::new(repository))
}
