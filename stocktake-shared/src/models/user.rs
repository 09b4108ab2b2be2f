/// User model
///
/// A user is created on first registration (email) or first federated
/// sign-in and is never hard-deleted. Only the auth service sees the
/// `password` digest and reset-token fields; everything handed to callers
/// goes through [`User::sanitized`].
///
/// # Stored shape
///
/// ```json
/// {
///   "id": "user_4f1c...",
///   "email": "ada@example.com",
///   "name": "Ada",
///   "registeredAt": "2024-05-01T09:30:00Z",
///   "authMethod": "email",
///   "password": "$argon2id$v=19$..."
/// }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How the user authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Email + password
    Email,

    /// Google federated sign-in
    Google,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Email => write!(f, "email"),
            AuthMethod::Google => write!(f, "google"),
        }
    }
}

/// Registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque stable identifier
    ///
    /// `user_<uuid>` for email accounts, the provider's subject id for
    /// federated ones
    pub id: String,

    /// Lowercased email address, unique across users
    pub email: String,

    /// Display name
    pub name: String,

    /// Optional avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// When the account was created
    pub registered_at: DateTime<Utc>,

    /// How the account authenticates
    pub auth_method: AuthMethod,

    /// Password digest (email accounts only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// SHA-256 of the outstanding reset token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,

    /// When the outstanding reset token stops being accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token_expiry: Option<DateTime<Utc>>,
}

impl User {
    /// Generates a fresh id for an email account
    pub fn generate_id() -> String {
        format!("user_{}", Uuid::new_v4().simple())
    }

    /// Canonical form used for storage and lookups
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Copy without credentials or reset state
    ///
    /// This is the only form that leaves the auth service and the only
    /// form stored in the session.
    pub fn sanitized(&self) -> User {
        User {
            password: None,
            reset_token: None,
            reset_token_expiry: None,
            ..self.clone()
        }
    }

    /// Whether a reset token has been issued and not yet consumed
    pub fn has_pending_reset(&self) -> bool {
        self.reset_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_user() -> User {
        User {
            id: "user_1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            image_url: None,
            registered_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            auth_method: AuthMethod::Email,
            password: Some("digest".to_string()),
            reset_token: Some("token-hash".to_string()),
            reset_token_expiry: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()),
        }
    }

    #[test]
    fn test_sanitized_strips_secrets() {
        let user = sample_user();
        let public = user.sanitized();

        assert_eq!(public.id, user.id);
        assert_eq!(public.email, user.email);
        assert!(public.password.is_none());
        assert!(public.reset_token.is_none());
        assert!(public.reset_token_expiry.is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert_eq!(json["authMethod"], "email");
        assert!(json.get("registeredAt").is_some());
        assert!(json.get("resetTokenExpiry").is_some());
        // Absent optionals are omitted
        assert!(json.get("imageUrl").is_none());
    }

    #[test]
    fn test_deserializes_minimal_federated_record() {
        let json = serde_json::json!({
            "id": "10987654321",
            "email": "grace@example.com",
            "name": "Grace",
            "imageUrl": "https://example.com/g.png",
            "registeredAt": "2024-02-03T04:05:06.789Z",
            "authMethod": "google"
        });

        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.auth_method, AuthMethod::Google);
        assert!(user.password.is_none());
        assert_eq!(user.image_url.as_deref(), Some("https://example.com/g.png"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(User::normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_generate_id_is_unique() {
        let a = User::generate_id();
        let b = User::generate_id();
        assert!(a.starts_with("user_"));
        assert_ne!(a, b);
    }
}
