use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_duration: Duration,
}

impl JwtService {
    pub fn new(secret: &str, session_duration: std::time::Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            session_duration: Duration::from_std(session_duration)
                .unwrap_or_else(|_| Duration::days(1)),
        }
    }

    pub fn generate_session_token(&self, username: &str, roles: &[String]) -> Result<(String, Claims)> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            roles: roles.to_vec(),
            exp: (now + self.session_duration).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Auth(format!("Failed to generate session token: {}", e)))?;

        Ok((token, claims))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}
