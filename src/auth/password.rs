use bcrypt::{hash, verify};
use crate::errors::{AppError, Result};

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str, cost: u32) -> Result<String> {
        hash(password, cost)
            .map_err(|e| AppError::Auth(format!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Auth(format!("Failed to verify password: {}", e)))
    }

    /// Runs verification on the blocking pool; bcrypt is deliberately slow.
    pub async fn verify_password_async(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
    }
}
