/// Authentication and session management
///
/// This module owns the user registry, the current-user session and every
/// credential operation:
///
/// # Modules
///
/// - [`service`]: The [`AuthService`] trait and its local implementation
/// - [`session`]: Single-writer current-user cell with a change stream
/// - [`password`]: Argon2id hashing plus legacy salted SHA-256 verification
/// - [`reset_token`]: Single-use password-reset token generation
/// - [`federated`]: Federated identity provider seam (Google sign-in)
///
/// # Example
///
/// ```no_run
/// use stocktake_shared::auth::{AuthService, LocalAuthService};
///
/// # async fn example(auth: LocalAuthService) -> Result<(), Box<dyn std::error::Error>> {
/// let user = auth.register_with_email("ada@example.com", "hunter22", "Ada").await?;
/// assert!(auth.is_authenticated());
///
/// auth.sign_out().await;
/// let again = auth.sign_in_with_email("ADA@example.com", "hunter22").await?;
/// assert_eq!(user.id, again.id);
/// # Ok(())
/// # }
/// ```

pub mod federated;
pub mod password;
pub mod reset_token;
pub mod service;
pub mod session;

pub use federated::{
    FederatedConfig, FederatedError, FederatedProfile, IdentityProvider, MockIdentityProvider,
    StaticProfileProvider, UnconfiguredProvider,
};
pub use password::{Argon2Settings, PasswordError, PasswordScheme};
pub use service::{AuthService, LocalAuthService, ResetTicket};
pub use session::{SessionController, SessionHandle};

use crate::storage::StorageError;
use serde::{Deserialize, Serialize};

/// Error type for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Another account already uses this (lowercased) email
    #[error("User with this email already exists")]
    DuplicateEmail,

    /// Email failed the syntactic check
    #[error("Please enter a valid email address")]
    InvalidEmail,

    /// Password shorter than the configured minimum
    #[error("{0}")]
    WeakPassword(String),

    /// Unknown email, wrong password or non-email account
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Identity provider unreachable or failed
    #[error("Sign-in failed. Please try again later.")]
    FederatedAuthUnavailable,

    /// Identity provider returned a profile without an email
    #[error("Invalid user data received from the identity provider")]
    InvalidFederatedProfile,

    /// User closed the federated sign-in prompt
    #[error("Sign-in was cancelled. Please try again.")]
    SignInCancelled,

    /// User refused the federated permissions
    #[error("Access denied. Please grant permission to continue.")]
    AccessDenied,

    /// Identity provider rejected the app configuration
    #[error("Authentication configuration error. Please contact support.")]
    FederatedMisconfigured,

    /// No account for this email
    #[error("User not found")]
    UserNotFound,

    /// Operation not available for this account's auth method
    #[error("Password reset not supported for this account")]
    UnsupportedAuthMethod,

    /// Reset token missing or does not match
    #[error("Invalid password reset token")]
    InvalidToken,

    /// Reset token past its expiry
    #[error("Password reset token has expired")]
    ExpiredToken,

    /// Auth settings cannot be applied (e.g. a reset lifetime out of range)
    #[error("Authentication configuration error: {0}")]
    Misconfigured(String),

    /// Registry could not be persisted
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Password digest could not be produced or checked
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl AuthError {
    /// Whether the user can fix this by changing their input
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            AuthError::Storage(_) | AuthError::Password(_) | AuthError::Misconfigured(_)
        )
    }
}

impl From<FederatedError> for AuthError {
    fn from(error: FederatedError) -> Self {
        match error {
            FederatedError::Cancelled => AuthError::SignInCancelled,
            FederatedError::AccessDenied => AuthError::AccessDenied,
            FederatedError::Configuration(_) => AuthError::FederatedMisconfigured,
            FederatedError::Unavailable(_) | FederatedError::Other(_) => {
                AuthError::FederatedAuthUnavailable
            }
        }
    }
}

/// Auth result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Scheme for newly written password digests
    ///
    /// Default: Argon2id. Legacy digests always verify regardless.
    pub password_scheme: PasswordScheme,

    /// Argon2id cost parameters
    pub argon2: Argon2Settings,

    /// Reset token lifetime in seconds
    ///
    /// Default: 3600 (1 hour). Values outside
    /// `1..=MAX_RESET_TOKEN_TTL_SECONDS` make reset requests fail with
    /// [`AuthError::Misconfigured`].
    pub reset_token_ttl_seconds: i64,

    /// Minimum password length in characters
    ///
    /// Default: 6
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_scheme: PasswordScheme::default(),
            argon2: Argon2Settings::default(),
            reset_token_ttl_seconds: reset_token::DEFAULT_RESET_TOKEN_TTL_SECONDS,
            min_password_length: password::MIN_PASSWORD_LENGTH,
        }
    }
}
