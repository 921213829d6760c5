// lib/src/auth.rs
use log::{info, warn};
use models::errors::{RecordError, RecordResult};
use models::{Role, SessionContext};

use crate::config::AuthSettings;

/// Checks `email`/`password` against the account configured for `role`.
/// Emails compare case-insensitively.
pub fn authenticate(
    settings: &AuthSettings,
    role: Role,
    email: &str,
    password: &str,
) -> RecordResult<SessionContext> {
    let credential = settings
        .credentials
        .get(&role)
        .ok_or_else(|| RecordError::Auth(format!("no {} account is configured", role)))?;

    if !credential.email.eq_ignore_ascii_case(email.trim()) || credential.password != password {
        warn!("Rejected {} login for {}", role, email);
        return Err(RecordError::Auth("invalid credentials".to_string()));
    }
    info!("Signed in {} as {}", credential.user_id, role);
    Ok(SessionContext::authenticated(role, credential.user_id.clone()))
}
