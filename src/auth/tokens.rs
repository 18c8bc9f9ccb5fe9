use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

const REFRESH_TOKEN_LEN: usize = 64;

/// Opaque refresh token handed to the client
pub fn generate_refresh_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Only the digest is persisted
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
