use once_cell::sync::Lazy;

use crate::config;

/// Hashed at the configured cost so a miss costs as much as a real check
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("no-such-account-0").ok());

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, config::config().security.bcrypt_cost)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Password hash could not be verified: {}", e);
            false
        }
    }
}

/// Spends one bcrypt verification and fails. Used when no account matched,
/// so response time does not reveal which emails are registered.
pub fn reject_unknown_account(password: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = bcrypt::verify(password, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_own_hash() {
        let hash = bcrypt::hash("s3cret-pass", 4).unwrap();
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong-pass1", &hash));
    }

    #[test]
    fn unknown_accounts_pay_full_cost() {
        let cost = config::config().security.bcrypt_cost;
        let hash = DUMMY_HASH.as_deref().unwrap();
        assert!(hash.starts_with(&format!("$2b${:02}$", cost)));
        assert!(!reject_unknown_account("no-such-account-0x"));
        assert!(!reject_unknown_account(""));
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify_password("anything1", "not-a-bcrypt-hash"));
    }
}
