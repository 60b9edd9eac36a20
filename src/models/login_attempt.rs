use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::now_millis;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAttempt {
    pub id: Uuid,
    pub username: String,
    pub ip_addr: String,
    pub user_agent: String,
    pub timestamp: i64,
    pub success: bool,
}

// Column widths in the `login_attempts` table.
pub const MAX_USERNAME_LEN: usize = 255;
pub const MAX_IP_ADDR_LEN: usize = 64;
pub const MAX_USER_AGENT_LEN: usize = 512;

pub fn clip_to_column(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

impl LoginAttempt {
    /// Client supplied values are clipped to their column widths.
    pub fn new(username: &str, ip_addr: &str, user_agent: &str, success: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: if username.is_empty() {
                "unknown".to_string()
            } else {
                clip_to_column(username, MAX_USERNAME_LEN)
            },
            ip_addr: clip_to_column(ip_addr, MAX_IP_ADDR_LEN),
            user_agent: clip_to_column(user_agent, MAX_USER_AGENT_LEN),
            timestamp: now_millis(),
            success,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}
