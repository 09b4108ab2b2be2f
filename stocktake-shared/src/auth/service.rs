/// Authentication service
///
/// [`LocalAuthService`] keeps the user registry under the `users` key of the
/// durable store, mirrors the signed-in user to the fast store under
/// `currentUser`, and is the only writer of the session cell.
///
/// # Flows
///
/// ```text
/// register_with_email ─> validate ─> digest ─> append + persist ─> start session
/// sign_in_with_email  ─> lookup ─> verify (upgrade legacy digest) ─> start session
/// sign_in_with_google ─> provider.sign_in ─> upsert by id ─> start session
/// sign_out            ─> capture work progress ─> provider.sign_out ─> clear session
/// request_password_reset ─> issue token (hash stored, 1h expiry)
/// reset_password      ─> check token + expiry ─> new digest, token cleared
/// ```
///
/// Every read-modify-write of the registry runs under one lock.

use super::{
    password, reset_token, AuthConfig, AuthError, AuthResult, FederatedConfig, FederatedProfile,
    IdentityProvider, PasswordError, SessionController, SessionHandle, UnconfiguredProvider,
};
use crate::clock::TimeSource;
use crate::models::{AuthMethod, User};
use crate::progress::WorkProgressService;
use crate::storage::{keys, load_collection, read_collection, save_json, KeyValueStore, Mirror};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use validator::Validate;

/// Issued password-reset token
///
/// The plaintext token exists only here; the registry stores its hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication capability
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Read side of the session (sync snapshot + change stream)
    fn session(&self) -> SessionHandle;

    /// Creates an email account and signs it in
    async fn register_with_email(&self, email: &str, password: &str, name: &str)
        -> AuthResult<User>;

    /// Signs in an email account
    async fn sign_in_with_email(&self, email: &str, password: &str) -> AuthResult<User>;

    /// Signs in through the federated identity provider
    async fn sign_in_with_google(&self) -> AuthResult<User>;

    /// Captures work progress, then ends the session; never fails
    async fn sign_out(&self);

    /// Current user, falling back to the session mirror and then to a
    /// federated sign-in; may prompt the user
    async fn current_user(&self) -> Option<User>;

    /// Current user from the in-process session only; never prompts
    fn current_user_sync(&self) -> Option<User>;

    /// Whether someone is signed in
    fn is_authenticated(&self) -> bool;

    /// Looks up a user by email (case-insensitive)
    async fn user_by_email(&self, email: &str) -> Option<User>;

    /// Whether an account exists for this email
    async fn is_email_registered(&self, email: &str) -> bool;

    /// Number of registered users
    async fn total_users(&self) -> usize;

    /// Users registered with the given method
    async fn users_by_auth_method(&self, method: AuthMethod) -> Vec<User>;

    /// Issues a single-use reset token for an email account
    async fn request_password_reset(&self, email: &str) -> AuthResult<ResetTicket>;

    /// Replaces the password if the reset token is valid and unexpired
    async fn reset_password(&self, email: &str, token: &str, new_password: &str)
        -> AuthResult<()>;
}

#[derive(Debug, Validate)]
struct EmailCandidate {
    #[validate(email)]
    email: String,
}

/// Syntactic email check: `local@domain.tld`, no whitespace
fn is_valid_email(email: &str) -> bool {
    let candidate = EmailCandidate {
        email: email.to_string(),
    };
    if candidate.validate().is_err() {
        return false;
    }

    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn position_by_email(users: &[User], normalized: &str) -> Option<usize> {
    users
        .iter()
        .position(|user| User::normalize_email(&user.email) == normalized)
}

/// Applies a federated profile to an existing record
///
/// Fields absent from the profile keep their local values.
fn merge_federated(existing: &User, profile: &FederatedProfile, email: String) -> User {
    User {
        email,
        name: profile
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| existing.name.clone()),
        image_url: profile.image_url.clone().or_else(|| existing.image_url.clone()),
        auth_method: AuthMethod::Google,
        ..existing.clone()
    }
}

/// Auth service backed by the key-value store
pub struct LocalAuthService {
    store: Arc<dyn KeyValueStore>,
    mirror: Mirror,
    provider: Arc<dyn IdentityProvider>,
    progress: Option<Arc<dyn WorkProgressService>>,
    session: SessionController,
    clock: Arc<dyn TimeSource>,
    config: AuthConfig,
    registry_lock: Mutex<()>,
}

impl LocalAuthService {
    /// Creates the service
    ///
    /// Federated sign-in is unavailable until a provider is attached with
    /// [`with_identity_provider`](Self::with_identity_provider).
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        mirror: Mirror,
        session: SessionController,
        clock: Arc<dyn TimeSource>,
        config: AuthConfig,
    ) -> Self {
        LocalAuthService {
            store,
            mirror,
            provider: Arc::new(UnconfiguredProvider),
            progress: None,
            session,
            clock,
            config,
            registry_lock: Mutex::new(()),
        }
    }

    /// Attaches the federated identity provider
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Attaches the snapshotter used to capture work progress on sign-out
    pub fn with_progress_capture(mut self, progress: Arc<dyn WorkProgressService>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Initialises the identity provider and restores a mirrored session
    ///
    /// Provider failures are logged; federated sign-in then reports the
    /// provider's error when attempted.
    pub async fn initialize(&self, federated: &FederatedConfig) -> Option<User> {
        if let Err(e) = self.provider.initialize(federated).await {
            error!(provider = self.provider.name(), error = %e, "Failed to initialize identity provider");
        }
        self.restore_session().await
    }

    /// Loads the mirrored user (if any) into the session
    pub async fn restore_session(&self) -> Option<User> {
        let user: User = self.mirror.get_as(keys::CURRENT_USER).await?;
        self.session.set(&user);
        info!(user_id = %user.id, "Restored user session");
        Some(user.sanitized())
    }

    async fn read_users(&self) -> Vec<User> {
        read_collection(self.store.as_ref(), keys::USERS).await
    }

    /// Only call with `registry_lock` held
    async fn load_users(&self) -> Vec<User> {
        load_collection(self.store.as_ref(), keys::USERS).await
    }

    async fn save_users(&self, users: &[User]) -> AuthResult<()> {
        save_json(self.store.as_ref(), keys::USERS, users)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to persist user registry");
                AuthError::from(e)
            })
    }

    async fn start_session(&self, user: &User) -> User {
        let public = user.sanitized();
        self.session.set(&public);
        self.mirror.set_as(keys::CURRENT_USER, &public).await;
        public
    }

    async fn digest(&self, plain: &str) -> AuthResult<String> {
        let plain = plain.to_string();
        let scheme = self.config.password_scheme;
        let settings = self.config.argon2;

        let digest = tokio::task::spawn_blocking(move || {
            password::digest_password(&plain, scheme, &settings)
        })
        .await
        .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))??;

        Ok(digest)
    }

    async fn verify(&self, plain: &str, stored: &str) -> AuthResult<bool> {
        let plain = plain.to_string();
        let stored = stored.to_string();

        let matches = tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored))
            .await
            .map_err(|e| PasswordError::VerifyError(format!("Verify task failed: {}", e)))??;

        Ok(matches)
    }

    fn check_password_strength(&self, plain: &str) -> AuthResult<()> {
        password::validate_password_strength(plain, self.config.min_password_length)
            .map_err(AuthError::WeakPassword)
    }

    /// Expiry for a token issued now
    fn reset_token_expiry(&self) -> AuthResult<DateTime<Utc>> {
        let seconds = self.config.reset_token_ttl_seconds;
        if !(1..=reset_token::MAX_RESET_TOKEN_TTL_SECONDS).contains(&seconds) {
            return Err(AuthError::Misconfigured(format!(
                "reset token lifetime must be 1..={} seconds, got {}",
                reset_token::MAX_RESET_TOKEN_TTL_SECONDS,
                seconds
            )));
        }

        Duration::try_seconds(seconds)
            .and_then(|ttl| self.clock.now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::Misconfigured(format!("reset token expiry out of range ({}s)", seconds))
            })
    }
}

#[async_trait]
impl AuthService for LocalAuthService {
    fn session(&self) -> SessionHandle {
        self.session.handle()
    }

    async fn register_with_email(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> AuthResult<User> {
        let email = User::normalize_email(email);

        let _guard = self.registry_lock.lock().await;
        let mut users = self.load_users().await;

        if position_by_email(&users, &email).is_some() {
            debug!("Registration rejected: duplicate email");
            return Err(AuthError::DuplicateEmail);
        }
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        self.check_password_strength(password)?;

        let user = User {
            id: User::generate_id(),
            email,
            name: name.trim().to_string(),
            image_url: None,
            registered_at: self.clock.now(),
            auth_method: AuthMethod::Email,
            password: Some(self.digest(password).await?),
            reset_token: None,
            reset_token_expiry: None,
        };

        users.push(user.clone());
        self.save_users(&users).await?;

        let public = self.start_session(&user).await;
        info!(user_id = %public.id, "User registered");
        Ok(public)
    }

    async fn sign_in_with_email(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = User::normalize_email(email);

        let _guard = self.registry_lock.lock().await;
        let mut users = self.load_users().await;

        let idx = position_by_email(&users, &email).ok_or(AuthError::InvalidCredentials)?;
        let user = &users[idx];

        if user.auth_method != AuthMethod::Email {
            debug!(user_id = %user.id, method = %user.auth_method, "Email sign-in on non-email account");
            return Err(AuthError::InvalidCredentials);
        }
        let stored = user.password.clone().ok_or(AuthError::InvalidCredentials)?;

        match self.verify(password, &stored).await {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials),
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Stored password digest unusable");
                return Err(AuthError::InvalidCredentials);
            }
        }

        if password::needs_rehash(&stored, self.config.password_scheme) {
            match self.digest(password).await {
                Ok(upgraded) => {
                    let user_id = users[idx].id.clone();
                    users[idx] = User {
                        password: Some(upgraded),
                        ..users[idx].clone()
                    };
                    match self.save_users(&users).await {
                        Ok(()) => info!(user_id = %user_id, "Upgraded legacy password digest"),
                        Err(e) => warn!(user_id = %user_id, error = %e, "Digest upgrade not persisted"),
                    }
                }
                Err(e) => warn!(error = %e, "Digest upgrade failed"),
            }
        }

        let public = self.start_session(&users[idx]).await;
        info!(user_id = %public.id, "User signed in with email");
        Ok(public)
    }

    async fn sign_in_with_google(&self) -> AuthResult<User> {
        let profile = self.provider.sign_in().await.map_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Federated sign-in failed");
            AuthError::from(e)
        })?;

        let email = profile
            .email
            .as_deref()
            .map(User::normalize_email)
            .filter(|email| !email.is_empty())
            .ok_or(AuthError::InvalidFederatedProfile)?;
        if profile.id.trim().is_empty() {
            return Err(AuthError::InvalidFederatedProfile);
        }

        let _guard = self.registry_lock.lock().await;
        let mut users = self.load_users().await;

        if let Some(owner) = position_by_email(&users, &email) {
            if users[owner].id != profile.id {
                warn!(user_id = %users[owner].id, "Federated email already owned by another account");
                return Err(AuthError::DuplicateEmail);
            }
        }

        let user = match users.iter().position(|user| user.id == profile.id) {
            Some(idx) => {
                let merged = merge_federated(&users[idx], &profile, email);
                users[idx] = merged.clone();
                debug!(user_id = %merged.id, "Existing federated user refreshed");
                merged
            }
            None => {
                let created = User {
                    id: profile.id.clone(),
                    name: profile
                        .name
                        .clone()
                        .filter(|name| !name.trim().is_empty())
                        .unwrap_or_else(|| email.clone()),
                    email,
                    image_url: profile.image_url.clone(),
                    registered_at: self.clock.now(),
                    auth_method: AuthMethod::Google,
                    password: None,
                    reset_token: None,
                    reset_token_expiry: None,
                };
                users.push(created.clone());
                debug!(user_id = %created.id, "New federated user created");
                created
            }
        };

        self.save_users(&users).await?;

        let public = self.start_session(&user).await;
        info!(user_id = %public.id, provider = self.provider.name(), "User signed in with federated provider");
        Ok(public)
    }

    async fn sign_out(&self) {
        let current = self.session.handle().current();

        if let (Some(user), Some(progress)) = (&current, &self.progress) {
            debug!(user_id = %user.id, "Capturing work progress before sign-out");
            progress.auto_save().await;
        }

        if let Some(user) = &current {
            if user.auth_method == AuthMethod::Google {
                if let Err(e) = self.provider.sign_out().await {
                    warn!(provider = self.provider.name(), error = %e, "Provider sign-out failed");
                }
            }
        }

        self.session.clear();
        self.mirror.remove(keys::CURRENT_USER).await;

        match current {
            Some(user) => info!(user_id = %user.id, "User signed out"),
            None => debug!("Sign-out with no active session"),
        }
    }

    async fn current_user(&self) -> Option<User> {
        if let Some(user) = self.current_user_sync() {
            return Some(user);
        }
        if let Some(user) = self.restore_session().await {
            return Some(user);
        }

        match self.sign_in_with_google().await {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "No current user");
                None
            }
        }
    }

    fn current_user_sync(&self) -> Option<User> {
        self.session.handle().current()
    }

    fn is_authenticated(&self) -> bool {
        self.session.handle().is_authenticated()
    }

    async fn user_by_email(&self, email: &str) -> Option<User> {
        let email = User::normalize_email(email);
        let users = self.read_users().await;
        position_by_email(&users, &email).map(|idx| users[idx].sanitized())
    }

    async fn is_email_registered(&self, email: &str) -> bool {
        self.user_by_email(email).await.is_some()
    }

    async fn total_users(&self) -> usize {
        self.read_users().await.len()
    }

    async fn users_by_auth_method(&self, method: AuthMethod) -> Vec<User> {
        self.read_users()
            .await
            .iter()
            .filter(|user| user.auth_method == method)
            .map(User::sanitized)
            .collect()
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<ResetTicket> {
        let email = User::normalize_email(email);

        let _guard = self.registry_lock.lock().await;
        let mut users = self.load_users().await;

        let idx = position_by_email(&users, &email).ok_or(AuthError::UserNotFound)?;
        if users[idx].auth_method != AuthMethod::Email {
            return Err(AuthError::UnsupportedAuthMethod);
        }

        let expires_at = self.reset_token_expiry().map_err(|e| {
            error!(error = %e, "Cannot issue password reset token");
            e
        })?;
        let (token, token_hash) = reset_token::generate_reset_token();

        users[idx] = User {
            reset_token: Some(token_hash),
            reset_token_expiry: Some(expires_at),
            ..users[idx].clone()
        };
        self.save_users(&users).await?;

        info!(user_id = %users[idx].id, expires_at = %expires_at, "Password reset token issued");
        Ok(ResetTicket { token, expires_at })
    }

    async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let email = User::normalize_email(email);

        let _guard = self.registry_lock.lock().await;
        let mut users = self.load_users().await;

        let idx = position_by_email(&users, &email).ok_or(AuthError::UserNotFound)?;
        let user = &users[idx];

        let stored_hash = user.reset_token.as_deref().ok_or(AuthError::InvalidToken)?;
        if !reset_token::verify_reset_token(token, stored_hash) {
            debug!(user_id = %user.id, "Reset token mismatch");
            return Err(AuthError::InvalidToken);
        }

        match user.reset_token_expiry {
            Some(expiry) if self.clock.now() <= expiry => {}
            _ => {
                debug!(user_id = %user.id, "Reset token expired");
                return Err(AuthError::ExpiredToken);
            }
        }

        self.check_password_strength(new_password)?;
        let digest = self.digest(new_password).await?;

        users[idx] = User {
            password: Some(digest),
            reset_token: None,
            reset_token_expiry: None,
            ..users[idx].clone()
        };
        self.save_users(&users).await?;

        info!(user_id = %users[idx].id, "Password reset completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        password::Argon2Settings, session, FederatedError, MockIdentityProvider, PasswordScheme,
    };
    use crate::clock::ManualTimeSource;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    struct Harness {
        auth: LocalAuthService,
        store: Arc<MemoryStore>,
        mirror: Mirror,
        clock: Arc<ManualTimeSource>,
        provider: Arc<MockIdentityProvider>,
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            argon2: Argon2Settings {
                m_cost: 1024,
                t_cost: 1,
                p_cost: 1,
            },
            ..AuthConfig::default()
        }
    }

    fn harness_with(config: AuthConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let mirror = Mirror::in_memory();
        let clock = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        ));
        let provider = Arc::new(MockIdentityProvider::new());
        let (controller, _handle) = session::channel();

        let auth = LocalAuthService::new(
            store.clone(),
            mirror.clone(),
            controller,
            clock.clone(),
            config,
        )
        .with_identity_provider(provider.clone());

        Harness {
            auth,
            store,
            mirror,
            clock,
            provider,
        }
    }

    fn harness() -> Harness {
        harness_with(test_config())
    }

    async fn stored_users(store: &MemoryStore) -> Vec<User> {
        read_collection(store, keys::USERS).await
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));

        assert!(!is_valid_email("ada@localhost"));
        assert!(!is_valid_email("ada.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada @example.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn test_register_persists_digest_and_starts_session() {
        let h = harness();

        let user = h
            .auth
            .register_with_email("Ada@Example.com", "hunter22", "Ada")
            .await
            .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert!(user.password.is_none());
        assert_eq!(user.auth_method, AuthMethod::Email);
        assert_eq!(h.auth.current_user_sync().map(|u| u.id), Some(user.id.clone()));

        let stored = stored_users(&h.store).await;
        assert_eq!(stored.len(), 1);
        let digest = stored[0].password.as_deref().unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("hunter22"));

        let mirrored: Option<User> = h.mirror.get_as(keys::CURRENT_USER).await;
        assert_eq!(mirrored.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_register_validation_order() {
        let h = harness();
        h.auth
            .register_with_email("ada@example.com", "hunter22", "Ada")
            .await
            .unwrap();

        // Duplicate wins over a weak password
        assert!(matches!(
            h.auth.register_with_email("ADA@example.com", "x", "Ada").await,
            Err(AuthError::DuplicateEmail)
        ));
        assert!(matches!(
            h.auth.register_with_email("not-an-email", "x", "Bob").await,
            Err(AuthError::InvalidEmail)
        ));
        assert!(matches!(
            h.auth.register_with_email("bob@example.com", "12345", "Bob").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert_eq!(h.auth.total_users().await, 1);
    }

    #[tokio::test]
    async fn test_register_with_legacy_scheme_writes_legacy_digest() {
        let h = harness_with(AuthConfig {
            password_scheme: PasswordScheme::LegacySha256,
            ..test_config()
        });

        h.auth
            .register_with_email("ada@example.com", "secret123", "Ada")
            .await
            .unwrap();

        let stored = stored_users(&h.store).await;
        assert_eq!(
            stored[0].password.as_deref(),
            Some(password::legacy_digest("secret123").as_str())
        );
    }

    #[tokio::test]
    async fn test_sign_in_upgrades_legacy_digest() {
        let h = harness();
        let legacy = User {
            id: "user_legacy".to_string(),
            email: "old@example.com".to_string(),
            name: "Old Timer".to_string(),
            image_url: None,
            registered_at: h.clock.now(),
            auth_method: AuthMethod::Email,
            password: Some(password::legacy_digest("secret123")),
            reset_token: None,
            reset_token_expiry: None,
        };
        save_json(h.store.as_ref(), keys::USERS, &vec![legacy]).await.unwrap();

        let user = h
            .auth
            .sign_in_with_email("old@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(user.id, "user_legacy");

        let stored = stored_users(&h.store).await;
        assert!(stored[0].password.as_deref().unwrap().starts_with("$argon2id$"));

        // Still signs in after the upgrade
        h.auth.sign_out().await;
        assert!(h.auth.sign_in_with_email("old@example.com", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_in_rejects_federated_account() {
        let h = harness();
        h.provider
            .push_profile(FederatedProfile::new("g-1", "grace@example.com", "Grace"));
        h.auth.sign_in_with_google().await.unwrap();

        assert!(matches!(
            h.auth.sign_in_with_email("grace@example.com", "whatever").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            h.auth.sign_in_with_email("nobody@example.com", "whatever").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_google_upsert_preserves_local_fields() {
        let h = harness();
        h.provider.push_profile(
            FederatedProfile::new("g-1", "Grace@Example.com", "Grace")
                .with_image_url("https://example.com/a.png"),
        );
        let first = h.auth.sign_in_with_google().await.unwrap();
        assert_eq!(first.email, "grace@example.com");
        let registered_at = first.registered_at;

        h.clock.advance(Duration::days(3));
        h.provider.push_profile(FederatedProfile {
            id: "g-1".to_string(),
            email: Some("grace@example.com".to_string()),
            name: Some("Grace Hopper".to_string()),
            image_url: None,
        });
        let second = h.auth.sign_in_with_google().await.unwrap();

        assert_eq!(second.name, "Grace Hopper");
        assert_eq!(second.image_url.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(second.registered_at, registered_at);
        assert_eq!(h.auth.total_users().await, 1);
        assert_eq!(h.auth.users_by_auth_method(AuthMethod::Google).await.len(), 1);
    }

    #[tokio::test]
    async fn test_google_profile_without_email() {
        let h = harness();
        h.provider.push_profile(FederatedProfile {
            id: "g-2".to_string(),
            email: None,
            name: Some("Nameless".to_string()),
            image_url: None,
        });

        assert!(matches!(
            h.auth.sign_in_with_google().await,
            Err(AuthError::InvalidFederatedProfile)
        ));
        assert!(!h.auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_google_collaborator_outcomes() {
        let h = harness();
        h.provider.push_error(FederatedError::Cancelled);
        h.provider.push_error(FederatedError::AccessDenied);
        h.provider.push_error(FederatedError::Unavailable("offline".into()));

        assert!(matches!(
            h.auth.sign_in_with_google().await,
            Err(AuthError::SignInCancelled)
        ));
        assert!(matches!(
            h.auth.sign_in_with_google().await,
            Err(AuthError::AccessDenied)
        ));
        assert!(matches!(
            h.auth.sign_in_with_google().await,
            Err(AuthError::FederatedAuthUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_google_email_owned_by_email_account() {
        let h = harness();
        h.auth
            .register_with_email("ada@example.com", "hunter22", "Ada")
            .await
            .unwrap();
        h.provider
            .push_profile(FederatedProfile::new("g-9", "ada@example.com", "Ada"));

        assert!(matches!(
            h.auth.sign_in_with_google().await,
            Err(AuthError::DuplicateEmail)
        ));
        assert_eq!(h.auth.total_users().await, 1);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_and_mirror() {
        let h = harness();
        h.provider
            .push_profile(FederatedProfile::new("g-1", "grace@example.com", "Grace"));
        h.auth.sign_in_with_google().await.unwrap();

        h.auth.sign_out().await;

        assert!(!h.auth.is_authenticated());
        assert!(h.mirror.get(keys::CURRENT_USER).await.is_none());
        assert_eq!(h.provider.sign_out_calls(), 1);
    }

    #[tokio::test]
    async fn test_current_user_restores_from_mirror() {
        let h = harness();
        let user = h
            .auth
            .register_with_email("ada@example.com", "hunter22", "Ada")
            .await
            .unwrap();

        // A second service over the same stores starts without a session
        let (controller, _) = session::channel();
        let restarted = LocalAuthService::new(
            h.store.clone(),
            h.mirror.clone(),
            controller,
            h.clock.clone(),
            test_config(),
        )
        .with_identity_provider(h.provider.clone());

        assert!(restarted.current_user_sync().is_none());
        assert_eq!(restarted.current_user().await.map(|u| u.id), Some(user.id));
        assert_eq!(h.provider.sign_in_calls(), 0);
    }

    #[tokio::test]
    async fn test_current_user_falls_back_to_provider() {
        let h = harness();
        assert!(h.auth.current_user().await.is_none());
        assert_eq!(h.provider.sign_in_calls(), 1);

        h.provider
            .push_profile(FederatedProfile::new("g-1", "grace@example.com", "Grace"));
        let user = h.auth.current_user().await.expect("federated fallback");
        assert_eq!(user.id, "g-1");
    }

    #[tokio::test]
    async fn test_password_reset_lifecycle() {
        let h = harness();
        h.auth
            .register_with_email("ada@example.com", "hunter22", "Ada")
            .await
            .unwrap();

        let ticket = h.auth.request_password_reset("ADA@example.com").await.unwrap();
        assert_eq!(ticket.expires_at, h.clock.now() + Duration::hours(1));

        let stored = stored_users(&h.store).await;
        assert_ne!(stored[0].reset_token.as_deref(), Some(ticket.token.as_str()));

        h.auth
            .reset_password("ada@example.com", &ticket.token, "brand-new")
            .await
            .unwrap();

        // Single use
        assert!(matches!(
            h.auth
                .reset_password("ada@example.com", &ticket.token, "another1")
                .await,
            Err(AuthError::InvalidToken)
        ));

        h.auth.sign_out().await;
        assert!(h.auth.sign_in_with_email("ada@example.com", "brand-new").await.is_ok());
        assert!(matches!(
            h.auth.sign_in_with_email("ada@example.com", "hunter22").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_errors() {
        let h = harness();
        h.auth
            .register_with_email("ada@example.com", "hunter22", "Ada")
            .await
            .unwrap();

        assert!(matches!(
            h.auth.request_password_reset("nobody@example.com").await,
            Err(AuthError::UserNotFound)
        ));
        // No token issued yet
        assert!(matches!(
            h.auth.reset_password("ada@example.com", "guess", "brand-new").await,
            Err(AuthError::InvalidToken)
        ));

        let ticket = h.auth.request_password_reset("ada@example.com").await.unwrap();
        assert!(matches!(
            h.auth.reset_password("ada@example.com", &ticket.token, "short").await,
            Err(AuthError::WeakPassword(_))
        ));

        h.clock.advance(Duration::hours(1) + Duration::seconds(1));
        assert!(matches!(
            h.auth
                .reset_password("ada@example.com", &ticket.token, "brand-new")
                .await,
            Err(AuthError::ExpiredToken)
        ));
    }

    #[tokio::test]
    async fn test_reset_ttl_out_of_range_is_an_error() {
        for ttl in [100_000_000_000_000, i64::MAX, 0, -60] {
            let h = harness_with(AuthConfig {
                reset_token_ttl_seconds: ttl,
                ..test_config()
            });
            h.auth
                .register_with_email("ada@example.com", "hunter22", "Ada")
                .await
                .unwrap();

            assert!(matches!(
                h.auth.request_password_reset("ada@example.com").await,
                Err(AuthError::Misconfigured(_))
            ));
            let stored = stored_users(&h.store).await;
            assert!(stored[0].reset_token.is_none());
        }
    }

    #[tokio::test]
    async fn test_reset_ttl_at_maximum() {
        let h = harness_with(AuthConfig {
            reset_token_ttl_seconds: reset_token::MAX_RESET_TOKEN_TTL_SECONDS,
            ..test_config()
        });
        h.auth
            .register_with_email("ada@example.com", "hunter22", "Ada")
            .await
            .unwrap();

        let ticket = h.auth.request_password_reset("ada@example.com").await.unwrap();
        assert_eq!(ticket.expires_at, h.clock.now() + Duration::days(30));
    }

    #[tokio::test]
    async fn test_federated_account_cannot_reset() {
        let h = harness();
        h.provider
            .push_profile(FederatedProfile::new("g-1", "grace@example.com", "Grace"));
        h.auth.sign_in_with_google().await.unwrap();

        assert!(matches!(
            h.auth.request_password_reset("grace@example.com").await,
            Err(AuthError::UnsupportedAuthMethod)
        ));
    }

    #[tokio::test]
    async fn test_initialize_calls_provider() {
        let h = harness();
        assert!(h.auth.initialize(&FederatedConfig::default()).await.is_none());
        assert!(h.provider.is_initialized());
    }
}
