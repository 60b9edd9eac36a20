use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::{
    config::Config,
    database::Repository,
    errors::{AppError, Result},
    models::{clip_to_column, now_millis, LoginAttempt, MAX_IP_ADDR_LEN},
};

pub mod jwt;
pub mod password;
pub mod session;

pub use jwt::*;
pub use password::*;
pub use session::*;

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const SESSION_COOKIE: &str = "SESSION";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }
}

/// Splits an `Authorization: Basic ...` value into username and password.
pub fn parse_basic_credentials(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Checks credentials for the single configured admin and manages session tokens.
pub struct AuthService {
    admin_username: String,
    admin_password_hash: String,
    jwt: JwtService,
    revoked: RevocationList,
    repo: Arc<dyn Repository>,
    max_failures: i64,
    failure_window_ms: i64,
}

impl AuthService {
    pub fn new(config: &Config, repo: Arc<dyn Repository>) -> Result<Self> {
        let admin_password_hash =
            PasswordService::hash_password(&config.admin_password, config.bcrypt_cost)?;

        Ok(Self {
            admin_username: config.admin_username.clone(),
            admin_password_hash,
            jwt: JwtService::new(&config.jwt_secret, config.session_ttl),
            revoked: RevocationList::new(),
            repo,
            max_failures: config.login_max_failures,
            failure_window_ms: config.login_failure_window.as_millis() as i64,
        })
    }

    pub async fn is_locked_out(&self, ip_addr: &str) -> Result<bool> {
        // Attempts are stored with the clipped address, so look them up the same way.
        let ip_addr = clip_to_column(ip_addr, MAX_IP_ADDR_LEN);
        let since = now_millis() - self.failure_window_ms;
        let failures = self.repo.count_failed_attempts(&ip_addr, since).await?;
        Ok(failures >= self.max_failures)
    }

    /// Verifies a username/password pair, enforcing the per-IP lockout and
    /// recording the attempt. Blocked attempts are not recorded.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip_addr: &str,
        user_agent: &str,
    ) -> Result<Principal> {
        if self.is_locked_out(ip_addr).await? {
            tracing::warn!(
                username = %username,
                ip = %ip_addr,
                "Blocking login due to recent failed attempts"
            );
            return Err(AppError::TooManyAttempts);
        }

        // The hash is checked even for an unknown username so both cases take as long.
        let password_ok = PasswordService::verify_password_async(
            password.to_string(),
            self.admin_password_hash.clone(),
        )
        .await?;
        let valid = password_ok && username == self.admin_username;

        self.repo
            .record_login_attempt(&LoginAttempt::new(username, ip_addr, user_agent, valid))
            .await?;

        if valid {
            tracing::info!(username = %username, ip = %ip_addr, user_agent = %user_agent, "Successful login");
            metrics::counter!("login_attempts_total", "outcome" => "success").increment(1);
            Ok(Principal {
                username: username.to_string(),
                roles: vec![ROLE_ADMIN.to_string()],
            })
        } else {
            tracing::warn!(username = %username, ip = %ip_addr, user_agent = %user_agent, "Failed login attempt");
            metrics::counter!("login_attempts_total", "outcome" => "failure").increment(1);
            Err(AppError::Auth("Bad credentials".to_string()))
        }
    }

    pub fn issue_session(&self, principal: &Principal) -> Result<(String, Claims)> {
        self.jwt
            .generate_session_token(&principal.username, &principal.roles)
    }

    /// Resolves a session token, rejecting revoked ones.
    pub fn verify_session(&self, token: &str) -> Option<(Principal, Claims)> {
        let claims = self.jwt.verify_token(token).ok()?;
        if self.revoked.is_revoked(&claims.jti) {
            return None;
        }

        let principal = Principal {
            username: claims.sub.clone(),
            roles: claims.roles.clone(),
        };
        Some((principal, claims))
    }

    pub fn revoke_session(&self, claims: &Claims) {
        self.revoked.revoke(&claims.jti, claims.exp);
    }
}
