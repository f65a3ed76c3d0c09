//! Command-line driver for the session manager.
//!
//! Restores the stored session, optionally signs in with `LOGIN_EMAIL` and
//! `LOGIN_PASSWORD`, then logs the resulting session and exits.

use std::env;

use supply_session::models::LoginRequest;
use supply_session::{Config, SessionManager};
use tracing::{info, warn};
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let config = Config::from_env()?;
    let manager = SessionManager::from_config(&config)?;
    manager.init().await;

    if !manager.is_logged_in() {
        if let (Ok(email), Ok(password)) = (env::var("LOGIN_EMAIL"), env::var("LOGIN_PASSWORD")) {
            let outcome = manager
                .login_user(&LoginRequest::new(email, password))
                .await?;
            if !outcome.success {
                warn!("Login failed: {}", outcome.message);
            }
        }
    }

    let state = manager.snapshot();
    info!(
        "Logged in: {}, user: {:?}, companies: {}, selected: {:?}, owner: {:?}",
        state.is_logged_in(),
        state.user.email,
        state.companies.len(),
        state.selected_company.as_ref().map(|company| &company.name),
        state.ownership
    );

    manager.dispose().await;
    Ok(())
}
