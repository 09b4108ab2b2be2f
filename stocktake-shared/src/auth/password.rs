/// Password hashing
///
/// New digests use Argon2id (PHC string format). Accounts created by the
/// first release of the app carry a legacy digest,
/// `hex(SHA-256(password || "salt_key_for_hashing"))`; those still verify and
/// are upgraded to Argon2id on the next successful sign-in.
///
/// # Argon2id defaults
///
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use stocktake_shared::auth::password::{hash_password, verify_password, Argon2Settings};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = Argon2Settings::default();
/// let hash = hash_password("hunter22", &settings)?;
///
/// assert!(verify_password("hunter22", &hash)?);
/// assert!(!verify_password("hunter23", &hash)?);
/// # Ok(())
/// # }
/// ```

use super::reset_token::constant_time_compare;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Fixed salt of the legacy digest scheme
pub const LEGACY_SALT: &str = "salt_key_for_hashing";

/// Minimum password length (characters)
pub const MIN_PASSWORD_LENGTH: usize = 6;

const ARGON2_PREFIX: &str = "$argon2";

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Digest scheme used for newly written passwords
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PasswordScheme {
    /// Argon2id PHC strings
    #[default]
    Argon2id,

    /// Salted SHA-256 hex, byte-compatible with existing stored digests
    LegacySha256,
}

impl fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordScheme::Argon2id => write!(f, "argon2id"),
            PasswordScheme::LegacySha256 => write!(f, "legacy-sha256"),
        }
    }
}

impl FromStr for PasswordScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "argon2id" | "argon2" => Ok(PasswordScheme::Argon2id),
            "legacy-sha256" | "sha256" => Ok(PasswordScheme::LegacySha256),
            other => Err(format!("Unknown password scheme: {}", other)),
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Settings {
    /// Memory cost in KB
    pub m_cost: u32,

    /// Number of passes
    pub t_cost: u32,

    /// Parallel lanes
    pub p_cost: u32,
}

impl Default for Argon2Settings {
    fn default() -> Self {
        Self {
            m_cost: 65536, // 64 MB
            t_cost: 3,
            p_cost: 4,
        }
    }
}

/// Hashes a password using Argon2id
///
/// # Returns
///
/// PHC string (algorithm, parameters, salt and hash), e.g.
/// `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the parameters are rejected or
/// hashing fails
pub fn hash_password(password: &str, settings: &Argon2Settings) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(settings.m_cost)
        .t_cost(settings.t_cost)
        .p_cost(settings.p_cost)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Legacy digest: lowercase hex of `SHA-256(password || LEGACY_SALT)`
pub fn legacy_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(LEGACY_SALT.as_bytes());
    hex::encode(hasher.finalize())
}

/// Produces a digest with the requested scheme
pub fn digest_password(
    password: &str,
    scheme: PasswordScheme,
    settings: &Argon2Settings,
) -> Result<String, PasswordError> {
    match scheme {
        PasswordScheme::Argon2id => hash_password(password, settings),
        PasswordScheme::LegacySha256 => Ok(legacy_digest(password)),
    }
}

/// Whether a stored digest uses the legacy scheme
pub fn is_legacy_digest(stored: &str) -> bool {
    !stored.starts_with(ARGON2_PREFIX)
}

/// Whether a stored digest should be rewritten under `scheme`
pub fn needs_rehash(stored: &str, scheme: PasswordScheme) -> bool {
    scheme == PasswordScheme::Argon2id && is_legacy_digest(stored)
}

/// Verifies a password against a stored digest of either scheme
///
/// Both paths compare in constant time.
///
/// # Returns
///
/// `Ok(true)` if the password matches, `Ok(false)` if it doesn't
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if an Argon2 digest cannot be
/// parsed, `PasswordError::VerifyError` for other verifier failures
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    if is_legacy_digest(stored) {
        return Ok(constant_time_compare(&legacy_digest(password), stored));
    }

    let parsed_hash = PasswordHash::new(stored)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters are embedded in the hash
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Checks the minimum length requirement (counted in characters)
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {} characters long",
            min_length
        ));
    }
    Ok(())
}
