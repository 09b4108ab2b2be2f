/// Password-reset tokens
///
/// A token is 32 random base62 characters handed to the caller once. Only
/// its SHA-256 hex is stored on the user record, and verification compares
/// digests in constant time. Tokens are single use and expire one hour after
/// issuance by default.
///
/// # Example
///
/// ```
/// use stocktake_shared::auth::reset_token::{generate_reset_token, verify_reset_token};
///
/// let (token, stored_hash) = generate_reset_token();
/// assert_eq!(token.len(), 32);
/// assert!(verify_reset_token(&token, &stored_hash));
/// assert!(!verify_reset_token("not-the-token", &stored_hash));
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a reset token (characters)
pub const RESET_TOKEN_LENGTH: usize = 32;

/// Default token lifetime (seconds)
pub const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 3600;

/// Longest accepted token lifetime (seconds, 30 days)
pub const MAX_RESET_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 3600;

/// Generates a new reset token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hash)
pub fn generate_reset_token() -> (String, String) {
    let token = generate_random_string(RESET_TOKEN_LENGTH);
    let hash = hash_reset_token(&token);
    (token, hash)
}

/// Random base62 string
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            char::from(CHARSET[idx])
        })
        .collect()
}

/// Hex-encoded SHA-256 of a token (64 characters)
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a presented token against the stored hash
pub fn verify_reset_token(token: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_reset_token(token), stored_hash)
}

/// Constant-time string comparison
///
/// Always walks the full length once lengths agree, accumulating
/// differences without short-circuiting.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
