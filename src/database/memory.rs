use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    database::Repository,
    errors::Result,
    models::{Category, Job, LoginAttempt, Photo, PhotoPage},
};

/// Process-local repository used for development and tests.
#[derive(Default)]
pub struct MemoryRepository {
    categories: RwLock<HashMap<Uuid, Category>>,
    photos: RwLock<Vec<Photo>>,
    jobs: RwLock<Vec<Job>>,
    login_attempts: RwLock<Vec<LoginAttempt>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        self.categories
            .write()
            .await
            .insert(category.id, category.clone());
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> =
            self.categories.read().await.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update_category(&self, category: &Category) -> Result<bool> {
        let mut categories = self.categories.write().await;
        match categories.get_mut(&category.id) {
            Some(existing) => {
                *existing = category.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        Ok(self.categories.write().await.remove(&id).is_some())
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<()> {
        self.photos.write().await.push(photo.clone());
        Ok(())
    }

    async fn find_photo(&self, id: Uuid) -> Result<Option<Photo>> {
        Ok(self.photos.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn photos_by_category(&self, category: Uuid, page: u32, size: u32) -> Result<PhotoPage> {
        let photos = self.photos.read().await;
        let matching: Vec<&Photo> = photos.iter().filter(|p| p.category == category).collect();
        let total_items = matching.len() as u64;
        let start = page as usize * size as usize;

        let photos = matching
            .into_iter()
            .skip(start)
            .take(size as usize)
            .cloned()
            .collect();

        Ok(PhotoPage {
            photos,
            page,
            size,
            total_items,
        })
    }

    async fn delete_photo(&self, id: Uuid) -> Result<bool> {
        let mut photos = self.photos.write().await;
        let before = photos.len();
        photos.retain(|p| p.id != id);
        Ok(photos.len() != before)
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        self.jobs.write().await.push(job.clone());
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.jobs.read().await.clone())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        if let Some(existing) = self.jobs.write().await.iter_mut().find(|j| j.id == job.id) {
            *existing = job.clone();
        }
        Ok(())
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|j| j.id != id);
        Ok(jobs.len() != before)
    }

    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()> {
        self.login_attempts.write().await.push(attempt.clone());
        Ok(())
    }

    async fn count_failed_attempts(&self, ip_addr: &str, since: i64) -> Result<i64> {
        let count = self
            .login_attempts
            .read()
            .await
            .iter()
            .filter(|a| a.ip_addr == ip_addr && !a.success && a.timestamp > since)
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now_millis;

    #[tokio::test]
    async fn test_category_crud() {
        let repo = MemoryRepository::new();
        let mut category = Category::new("Birds");
        repo.insert_category(&category).await.unwrap();

        category.name = "Wildlife".to_string();
        assert!(repo.update_category(&category).await.unwrap());
        assert_eq!(
            repo.find_category(category.id).await.unwrap().unwrap().name,
            "Wildlife"
        );

        assert!(repo.delete_category(category.id).await.unwrap());
        assert!(!repo.delete_category(category.id).await.unwrap());
        assert!(!repo.update_category(&category).await.unwrap());
    }

    #[tokio::test]
    async fn test_photo_paging() {
        let repo = MemoryRepository::new();
        let category = Uuid::new_v4();
        for i in 0..25 {
            repo.insert_photo(&Photo::for_upload(category, &format!("{}.jpg", i)))
                .await
                .unwrap();
        }
        repo.insert_photo(&Photo::for_upload(Uuid::new_v4(), "other.jpg"))
            .await
            .unwrap();

        let page = repo.photos_by_category(category, 2, 10).await.unwrap();
        assert_eq!(page.total_items, 25);
        assert_eq!(page.photos.len(), 5);
        assert_eq!(page.total_pages(), 3);

        let beyond = repo.photos_by_category(category, 5, 10).await.unwrap();
        assert!(beyond.photos.is_empty());
        assert_eq!(beyond.total_items, 25);
    }

    #[tokio::test]
    async fn test_failed_attempt_window() {
        let repo = MemoryRepository::new();
        let mut old = LoginAttempt::new("admin", "10.0.0.1", "curl", false);
        old.timestamp = now_millis() - 2 * 24 * 60 * 60 * 1000;
        repo.record_login_attempt(&old).await.unwrap();
        repo.record_login_attempt(&LoginAttempt::new("admin", "10.0.0.1", "curl", false))
            .await
            .unwrap();
        repo.record_login_attempt(&LoginAttempt::new("admin", "10.0.0.1", "curl", true))
            .await
            .unwrap();
        repo.record_login_attempt(&LoginAttempt::new("admin", "10.0.0.2", "curl", false))
            .await
            .unwrap();

        let since = now_millis() - 24 * 60 * 60 * 1000;
        assert_eq!(repo.count_failed_attempts("10.0.0.1", since).await.unwrap(), 1);
        assert_eq!(repo.count_failed_attempts("10.0.0.3", since).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_job_update_and_delete() {
        let repo = MemoryRepository::new();
        let mut job = Job::new(Uuid::new_v4(), "a.jpg");
        repo.insert_job(&job).await.unwrap();

        job.finish(true, "done");
        repo.update_job(&job).await.unwrap();
        let jobs = repo.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].processing);

        assert!(repo.delete_job(job.id).await.unwrap());
        assert!(repo.list_jobs().await.unwrap().is_empty());
    }
}
