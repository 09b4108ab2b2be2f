/// Federated identity provider seam
///
/// The auth service never talks to Google directly; it calls an
/// [`IdentityProvider`]. On device that is the platform sign-in plugin; in
/// the CLI it is [`StaticProfileProvider`], which hands back a profile the
/// platform sign-in already produced. Tests use [`MockIdentityProvider`],
/// which replays scripted outcomes.
///
/// # Outcomes
///
/// ```text
/// IdentityProvider::sign_in()
///   ├─> Ok(profile)               -> upsert user, start session
///   ├─> Err(Cancelled)            -> AuthError::SignInCancelled
///   ├─> Err(AccessDenied)         -> AuthError::AccessDenied
///   ├─> Err(Configuration)        -> AuthError::FederatedMisconfigured
///   └─> Err(Unavailable | Other)  -> AuthError::FederatedAuthUnavailable
/// ```
///
/// # Example
///
/// ```
/// use stocktake_shared::auth::federated::{FederatedProfile, IdentityProvider, MockIdentityProvider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = MockIdentityProvider::new();
/// provider.push_profile(FederatedProfile::new("1234", "grace@example.com", "Grace"));
///
/// let profile = provider.sign_in().await?;
/// assert_eq!(profile.email.as_deref(), Some("grace@example.com"));
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Errors reported by an identity provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FederatedError {
    /// Provider unreachable or not initialised
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    /// User closed the sign-in prompt
    #[error("Sign-in was cancelled by the user")]
    Cancelled,

    /// User refused the requested permissions
    #[error("Access denied by the user")]
    AccessDenied,

    /// Client id / redirect configuration rejected by the provider
    #[error("Identity provider configuration error: {0}")]
    Configuration(String),

    /// Any other provider failure
    #[error("Identity provider error: {0}")]
    Other(String),
}

/// Identity provider result type alias
pub type FederatedResult<T> = Result<T, FederatedError>;

/// Profile returned by a successful federated sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedProfile {
    /// Provider subject id, stable per account
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,
}

impl FederatedProfile {
    /// Profile with id, email and name
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        FederatedProfile {
            id: id.into(),
            email: Some(email.into()),
            name: Some(name.into()),
            image_url: None,
        }
    }

    /// Attaches an avatar URL
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedConfig {
    /// OAuth client id (None disables federated sign-in)
    pub client_id: Option<String>,

    /// Requested scopes
    pub scopes: Vec<String>,

    /// Ask for a refresh token
    pub grant_offline_access: bool,
}

impl Default for FederatedConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            scopes: vec!["profile".to_string(), "email".to_string()],
            grant_offline_access: true,
        }
    }
}

/// Federated identity provider contract
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Prepares the provider; called once when the auth service is built
    async fn initialize(&self, config: &FederatedConfig) -> FederatedResult<()>;

    /// Runs the (possibly interactive) sign-in flow
    async fn sign_in(&self) -> FederatedResult<FederatedProfile>;

    /// Ends the provider-side session
    async fn sign_out(&self) -> FederatedResult<()>;
}

/// Provider used when no federated sign-in is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredProvider;

#[async_trait]
impl IdentityProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn initialize(&self, _config: &FederatedConfig) -> FederatedResult<()> {
        Ok(())
    }

    async fn sign_in(&self) -> FederatedResult<FederatedProfile> {
        Err(FederatedError::Unavailable(
            "No identity provider configured".to_string(),
        ))
    }

    async fn sign_out(&self) -> FederatedResult<()> {
        Ok(())
    }
}

/// Provider for a profile obtained outside the process
///
/// The CLI receives the Google profile as arguments after the platform
/// sign-in finished, so every `sign_in` returns that same profile.
#[derive(Debug, Clone)]
pub struct StaticProfileProvider {
    profile: FederatedProfile,
}

impl StaticProfileProvider {
    pub fn new(profile: FederatedProfile) -> Self {
        StaticProfileProvider { profile }
    }
}

#[async_trait]
impl IdentityProvider for StaticProfileProvider {
    fn name(&self) -> &str {
        "static-profile"
    }

    async fn initialize(&self, _config: &FederatedConfig) -> FederatedResult<()> {
        Ok(())
    }

    async fn sign_in(&self) -> FederatedResult<FederatedProfile> {
        Ok(self.profile.clone())
    }

    async fn sign_out(&self) -> FederatedResult<()> {
        Ok(())
    }
}

/// Scripted provider for tests
///
/// Each `sign_in` pops the next scripted outcome; with nothing scripted it
/// reports `Unavailable`.
#[derive(Debug, Default)]
pub struct MockIdentityProvider {
    outcomes: Mutex<VecDeque<FederatedResult<FederatedProfile>>>,
    initialized: AtomicBool,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl MockIdentityProvider {
    /// Creates a provider with nothing scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful sign-in
    pub fn push_profile(&self, profile: FederatedProfile) {
        self.push(Ok(profile));
    }

    /// Queues a failed sign-in
    pub fn push_error(&self, error: FederatedError) {
        self.push(Err(error));
    }

    fn push(&self, outcome: FederatedResult<FederatedProfile>) {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    /// Whether `initialize` has been called
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Number of `sign_in` calls so far
    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    /// Number of `sign_out` calls so far
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self, _config: &FederatedConfig) -> FederatedResult<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_in(&self) -> FederatedResult<FederatedProfile> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(FederatedError::Unavailable(
                    "No scripted sign-in outcome".to_string(),
                ))
            })
    }

    async fn sign_out(&self) -> FederatedResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
