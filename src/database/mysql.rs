use async_trait::async_trait;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use uuid::Uuid;

use crate::{
    database::Repository,
    errors::Result,
    models::{Category, Job, LoginAttempt, Photo, PhotoPage},
};

#[derive(Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query("INSERT INTO categories (id, name, colour) VALUES (?, ?, ?)")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.colour)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, colour FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name, colour FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }

    async fn update_category(&self, category: &Category) -> Result<bool> {
        let result = sqlx::query("UPDATE categories SET name = ?, colour = ? WHERE id = ?")
            .bind(&category.name)
            .bind(&category.colour)
            .bind(category.id)
            .execute(&self.pool)
            .await?;

        // MySQL reports zero affected rows when the values are unchanged.
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        Ok(self.find_category(category.id).await?.is_some())
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<()> {
        sqlx::query(
            "INSERT INTO photos (id, category, low_res, high_res, full_photo) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(photo.id)
        .bind(photo.category)
        .bind(&photo.low_res)
        .bind(&photo.high_res)
        .bind(&photo.full_photo)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_photo(&self, id: Uuid) -> Result<Option<Photo>> {
        let photo = sqlx::query_as::<_, Photo>(
            "SELECT id, category, low_res, high_res, full_photo FROM photos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(photo)
    }

    async fn photos_by_category(&self, category: Uuid, page: u32, size: u32) -> Result<PhotoPage> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM photos WHERE category = ?")
            .bind(category)
            .fetch_one(&self.pool)
            .await?;

        let photos = sqlx::query_as::<_, Photo>(
            r#"
            SELECT id, category, low_res, high_res, full_photo
            FROM photos
            WHERE category = ?
            ORDER BY id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(category)
        .bind(size as i64)
        .bind(page as i64 * size as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(PhotoPage {
            photos,
            page,
            size,
            total_items: total.max(0) as u64,
        })
    }

    async fn delete_photo(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, category, file_name, success, processing, reason, `timestamp`)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id)
        .bind(job.category)
        .bind(&job.file_name)
        .bind(job.success)
        .bind(job.processing)
        .bind(&job.reason)
        .bind(job.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, category, file_name, success, processing, reason, `timestamp`
            FROM jobs
            ORDER BY `timestamp`
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        sqlx::query("UPDATE jobs SET success = ?, processing = ?, reason = ? WHERE id = ?")
            .bind(job.success)
            .bind(job.processing)
            .bind(&job.reason)
            .bind(job.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (id, username, ip_addr, user_agent, `timestamp`, success)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(attempt.id)
        .bind(&attempt.username)
        .bind(&attempt.ip_addr)
        .bind(&attempt.user_agent)
        .bind(attempt.timestamp)
        .bind(attempt.success)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_failed_attempts(&self, ip_addr: &str, since: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE ip_addr = ? AND success = FALSE AND `timestamp` > ?
            "#,
        )
        .bind(ip_addr)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
