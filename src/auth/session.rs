use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Token ids revoked by logout, kept until the token would have expired anyway.
#[derive(Default)]
pub struct RevocationList {
    revoked: Mutex<HashMap<String, i64>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// `expires_at` is in epoch seconds, as in the token's `exp` claim.
    pub fn revoke(&self, jti: &str, expires_at: i64) {
        let now = chrono::Utc::now().timestamp();
        let mut revoked = self.entries();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(jti.to_string(), expires_at);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.entries().contains_key(jti)
    }

    // A panic elsewhere must not make revoked tokens valid again.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.revoked.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoke_and_purge() {
        let list = RevocationList::new();
        let now = chrono::Utc::now().timestamp();

        list.revoke("expired", now - 10);
        assert!(list.is_revoked("expired"));

        // The next revocation drops entries past their expiry.
        list.revoke("live", now + 3600);
        assert!(!list.is_revoked("expired"));
        assert!(list.is_revoked("live"));
    }

    #[test]
    fn test_poisoned_lock_keeps_revocations() {
        let list = RevocationList::new();
        list.revoke("jti-1", chrono::Utc::now().timestamp() + 3600);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = list.revoked.lock().unwrap();
            panic!("poison the lock");
        }));
        assert!(result.is_err());
        assert!(list.revoked.is_poisoned());

        assert!(list.is_revoked("jti-1"));
        list.revoke("jti-2", chrono::Utc::now().timestamp() + 3600);
        assert!(list.is_revoked("jti-2"));
    }
}
