//! # Stocktake CLI
//!
//! Command-line front end for the Stocktake service layer. Each invocation
//! builds the services over the configured data directory, runs one
//! command through the public service traits and exits.
//!
//! ## Usage
//!
//! ```bash
//! stocktake register -e ada@example.com -n "Ada Lovelace" -p hunter22
//! stocktake add -n Plywood -q 2 --length 4 --width 2 --unit ft
//! stocktake list
//! stocktake logout
//! ```
//!
//! Passwords may also be supplied through `STOCKTAKE_PASSWORD`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use stocktake_shared::auth::{FederatedProfile, IdentityProvider, StaticProfileProvider};
use stocktake_shared::factory::{ServiceBuilder, ServiceFactory};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::inventory::{AddArgs, UpdateArgs};
use config::Config;

#[derive(Parser)]
#[command(name = "stocktake")]
#[command(author, version, about = "Stocktake inventory tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an email account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        #[arg(short, long, env = "STOCKTAKE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "STOCKTAKE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with a Google profile obtained from the platform sign-in
    LoginGoogle {
        /// Google account id
        #[arg(long)]
        id: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long)]
        image_url: Option<String>,
    },
    /// Save work progress and sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Issue a password-reset token
    RequestReset {
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password with a reset token
    ResetPassword {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        token: String,

        /// New password
        #[arg(short, long, env = "STOCKTAKE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Add an inventory item
    Add(AddArgs),
    /// List inventory items
    List,
    /// Show one item as JSON
    Show { id: String },
    /// Update an inventory item
    Update {
        id: String,

        #[command(flatten)]
        changes: UpdateArgs,
    },
    /// Delete an inventory item
    Delete { id: String },
    /// Search items by name, description or category
    Search { query: String },
    /// Inventory totals
    Stats {
        /// Restrict to one category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Manage work progress
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
}

#[derive(Subcommand)]
enum ProgressAction {
    /// Save a snapshot (captures the session store when no fields are given)
    Save {
        /// Active tab
        #[arg(long)]
        tab: Option<String>,

        /// In-progress form as JSON
        #[arg(long)]
        form: Option<String>,
    },
    /// Show a snapshot
    Show {
        /// User id (default: signed-in user)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Restore the signed-in user's snapshot
    Restore,
    /// Delete a snapshot
    Clear {
        /// User id (default: signed-in user)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List snapshots
    List {
        /// Saved at or after (RFC 3339)
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Saved at or before (RFC 3339)
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },
}

/// Identity provider for this invocation
///
/// Only `login-google` carries a profile; every other command runs without
/// federated sign-in.
fn identity_provider(command: &Commands) -> Option<Arc<dyn IdentityProvider>> {
    match command {
        Commands::LoginGoogle {
            id,
            email,
            name,
            image_url,
        } => {
            Some(Arc::new(StaticProfileProvider::new(FederatedProfile {
                id: id.clone(),
                email: Some(email.clone()),
                name: name.clone(),
                image_url: image_url.clone(),
            })))
        }
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stocktake=info,stocktake_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing::debug!(
        data_dir = %config.storage.data_dir.display(),
        persist_session = config.storage.persist_session,
        "Stocktake v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let mut builder = ServiceBuilder::from_storage_config(&config.storage)
        .await?
        .auth_config(config.auth.clone())
        .federated_config(config.federated.clone());
    if let Some(provider) = identity_provider(&cli.command) {
        builder = builder.identity_provider(provider);
    }
    let factory = builder.build().await;

    run(cli.command, &factory).await
}

async fn run(command: Commands, factory: &dyn ServiceFactory) -> anyhow::Result<()> {
    let auth = factory.auth_service();
    let inventory = factory.inventory_service();
    let progress = factory.work_progress_service();

    match command {
        Commands::Register {
            email,
            name,
            password,
        } => commands::auth::register(auth.as_ref(), &email, &name, &password).await,
        Commands::Login { email, password } => {
            commands::auth::login(auth.as_ref(), &email, &password).await
        }
        Commands::LoginGoogle { .. } => commands::auth::login_google(auth.as_ref()).await,
        Commands::Logout => commands::auth::logout(auth.as_ref()).await,
        Commands::Whoami => commands::auth::whoami(auth.as_ref()).await,
        Commands::RequestReset { email } => {
            commands::auth::request_reset(auth.as_ref(), &email).await
        }
        Commands::ResetPassword {
            email,
            token,
            password,
        } => commands::auth::reset_password(auth.as_ref(), &email, &token, &password).await,
        Commands::Add(args) => commands::inventory::add(inventory.as_ref(), args).await,
        Commands::List => commands::inventory::list(inventory.as_ref()).await,
        Commands::Show { id } => commands::inventory::show(inventory.as_ref(), &id).await,
        Commands::Update { id, changes } => {
            commands::inventory::update(inventory.as_ref(), &id, changes).await
        }
        Commands::Delete { id } => commands::inventory::delete(inventory.as_ref(), &id).await,
        Commands::Search { query } => {
            commands::inventory::search(inventory.as_ref(), &query).await
        }
        Commands::Stats { category } => {
            commands::inventory::stats(inventory.as_ref(), category.as_deref()).await
        }
        Commands::Progress { action } => match action {
            ProgressAction::Save { tab, form } => {
                commands::progress::save(progress.as_ref(), tab, form).await
            }
            ProgressAction::Show { user } => {
                commands::progress::show(progress.as_ref(), user.as_deref()).await
            }
            ProgressAction::Restore => commands::progress::restore(progress.as_ref()).await,
            ProgressAction::Clear { user } => {
                commands::progress::clear(progress.as_ref(), user.as_deref()).await
            }
            ProgressAction::List { since, until } => {
                commands::progress::list(progress.as_ref(), since, until).await
            }
        },
    }
}
