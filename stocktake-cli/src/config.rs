/// Configuration management for the CLI
///
/// This module loads configuration from environment variables (and a `.env`
/// file when present) into the library's typed config structs.
///
/// # Environment Variables
///
/// - `STOCKTAKE_DATA_DIR`: Directory for the JSON documents (default: data)
/// - `STOCKTAKE_PERSIST_SESSION`: Keep the signed-in user between runs (default: true)
/// - `STOCKTAKE_PASSWORD_SCHEME`: `argon2id` or `legacy-sha256` (default: argon2id)
/// - `STOCKTAKE_RESET_TOKEN_TTL_SECS`: Reset token lifetime (default: 3600)
/// - `GOOGLE_CLIENT_ID`: OAuth client id for federated sign-in (optional)
/// - `GOOGLE_SCOPES`: Comma-separated scopes (default: profile,email)
/// - `RUST_LOG`: Log filter (default: stocktake=info,stocktake_shared=info)
///
/// # Example
///
/// ```ignore
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Data lives in {}", config.storage.data_dir.display());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;
use stocktake_shared::auth::reset_token::MAX_RESET_TOKEN_TTL_SECONDS;
use stocktake_shared::auth::{AuthConfig, FederatedConfig, PasswordScheme};
use stocktake_shared::storage::StorageConfig;

/// Complete CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub federated: FederatedConfig,
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got {:?}", key, other),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but has an invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("STOCKTAKE_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| StorageConfig::default().data_dir);

        // One process per command, so the session has to outlive it
        let persist_session = match lookup("STOCKTAKE_PERSIST_SESSION") {
            Some(value) => parse_bool("STOCKTAKE_PERSIST_SESSION", &value)?,
            None => true,
        };

        let mut auth = AuthConfig::default();
        if let Some(scheme) = lookup("STOCKTAKE_PASSWORD_SCHEME") {
            auth.password_scheme = scheme
                .parse::<PasswordScheme>()
                .map_err(|e| anyhow::anyhow!("STOCKTAKE_PASSWORD_SCHEME: {}", e))?;
        }
        if let Some(ttl) = lookup("STOCKTAKE_RESET_TOKEN_TTL_SECS") {
            let ttl = ttl.trim().parse::<i64>()?;
            if !(1..=MAX_RESET_TOKEN_TTL_SECONDS).contains(&ttl) {
                anyhow::bail!(
                    "STOCKTAKE_RESET_TOKEN_TTL_SECS must be between 1 and {}",
                    MAX_RESET_TOKEN_TTL_SECONDS
                );
            }
            auth.reset_token_ttl_seconds = ttl;
        }

        let mut federated = FederatedConfig {
            client_id: lookup("GOOGLE_CLIENT_ID").filter(|id| !id.trim().is_empty()),
            ..FederatedConfig::default()
        };
        if let Some(scopes) = lookup("GOOGLE_SCOPES") {
            let scopes: Vec<String> = scopes
                .split(',')
                .map(str::trim)
                .filter(|scope| !scope.is_empty())
                .map(str::to_string)
                .collect();
            if !scopes.is_empty() {
                federated.scopes = scopes;
            }
        }

        Ok(Self {
            storage: StorageConfig {
                data_dir,
                persist_session,
            },
            auth,
            federated,
        })
    }
}
