//! Account commands.
//!
//! # Usage
//!
//! ```bash
//! stocktake register -e ada@example.com -n "Ada Lovelace" -p hunter22
//! stocktake login -e ada@example.com -p hunter22
//! stocktake whoami
//! stocktake request-reset -e ada@example.com
//! stocktake reset-password -e ada@example.com -t <token> -p new-secret
//! stocktake logout
//! ```

use stocktake_shared::auth::AuthService;
use stocktake_shared::models::User;

fn describe(user: &User) -> String {
    format!("{} <{}> [{}] id={}", user.name, user.email, user.auth_method, user.id)
}

/// Create an email account and sign in.
pub async fn register(
    auth: &dyn AuthService,
    email: &str,
    name: &str,
    password: &str,
) -> anyhow::Result<()> {
    let user = auth.register_with_email(email, password, name).await?;
    println!("Registered and signed in as {}", describe(&user));
    Ok(())
}

/// Sign in with email and password.
pub async fn login(auth: &dyn AuthService, email: &str, password: &str) -> anyhow::Result<()> {
    let user = auth.sign_in_with_email(email, password).await?;
    println!("Signed in as {}", describe(&user));
    Ok(())
}

/// Sign in through the configured identity provider.
pub async fn login_google(auth: &dyn AuthService) -> anyhow::Result<()> {
    let user = auth.sign_in_with_google().await?;
    println!("Signed in as {}", describe(&user));
    Ok(())
}

/// Sign out, saving work progress first.
pub async fn logout(auth: &dyn AuthService) -> anyhow::Result<()> {
    match auth.current_user_sync() {
        Some(user) => {
            auth.sign_out().await;
            println!("Signed out {}", user.email);
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

/// Show the signed-in user.
pub async fn whoami(auth: &dyn AuthService) -> anyhow::Result<()> {
    match auth.current_user_sync() {
        Some(user) => println!("{}", describe(&user)),
        None => println!("Not signed in"),
    }
    Ok(())
}

/// Issue a password-reset token.
///
/// There is no mail channel, so the token is printed for the user to copy.
pub async fn request_reset(auth: &dyn AuthService, email: &str) -> anyhow::Result<()> {
    let ticket = auth.request_password_reset(email).await?;
    println!("Reset token: {}", ticket.token);
    println!("Expires at:  {}", ticket.expires_at.to_rfc3339());
    Ok(())
}

/// Replace a password using a reset token.
pub async fn reset_password(
    auth: &dyn AuthService,
    email: &str,
    token: &str,
    password: &str,
) -> anyhow::Result<()> {
    auth.reset_password(email, token, password).await?;
    println!("Password updated for {}", email);
    Ok(())
}
