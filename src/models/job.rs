use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::now_millis;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub category: Uuid,
    pub file_name: String,
    pub success: bool,
    pub processing: bool,
    pub reason: Option<String>,
    pub timestamp: i64,
}

impl Job {
    pub fn new(category: Uuid, file_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            file_name: file_name.into(),
            success: false,
            processing: true,
            reason: None,
            timestamp: now_millis(),
        }
    }

    /// Marks the job finished, successfully or not.
    pub fn finish(&mut self, success: bool, reason: impl Into<String>) {
        self.processing = false;
        self.success = success;
        self.reason = Some(reason.into());
    }

    pub fn age_millis(&self, now: i64) -> i64 {
        now - self.timestamp
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostJobParams {
    pub category: String,
    pub file_name: String,
}
