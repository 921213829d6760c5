// server/src/cli/handlers_user.rs
use anyhow::Result;
use log::info;
use medwallet::{authenticate, MedWallet};
use models::{Role, SessionContext};
use serde_json::{json, Value};

/// Checks the credentials and persists the session for later commands.
pub async fn handle_login_command(
    wallet: &MedWallet,
    role: Role,
    email: &str,
    password: &str,
) -> Result<Value> {
    let session = authenticate(&wallet.config.auth, role, email, password)?;
    wallet.cache.save_session(&session).await?;
    Ok(json!(session))
}

pub async fn handle_logout_command(wallet: &MedWallet, mut session: SessionContext) -> Result<Value> {
    let was = session.role();
    session.sign_out();
    wallet.cache.clear_session().await?;
    if let Some(role) = was {
        info!("Signed out {}", role);
    }
    Ok(json!(session))
}

pub fn handle_whoami_command(session: &SessionContext) -> Result<Value> {
    Ok(json!(session))
}
