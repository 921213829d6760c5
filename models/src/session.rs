// models/src/session.rs
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::{RecordError, RecordResult, ValidationError};
use crate::identifiers::RecordScope;

/// Identity used when a session carries no explicit user id.
pub const DEFAULT_USER_ID: &str = "demo-user";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            _ => Err(ValidationError::UnknownVariant {
                kind: "role".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is acting and in which role. Passed explicitly to every service that
/// needs identity; persisted only at process boundaries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionContext {
    pub is_authenticated: bool,
    pub user_role: Option<Role>,
    pub user_id: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(role: Role, user_id: impl Into<String>) -> Self {
        SessionContext {
            is_authenticated: true,
            user_role: Some(role),
            user_id: Some(user_id.into()),
        }
    }

    pub fn user_id(&self) -> &str {
        self.user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_USER_ID)
    }

    /// Scope holding the session user's own record blobs.
    pub fn scope(&self) -> RecordResult<RecordScope> {
        Ok(RecordScope::new(self.user_id())?)
    }

    pub fn role(&self) -> Option<Role> {
        if self.is_authenticated {
            self.user_role
        } else {
            None
        }
    }

    pub fn require_role(&self, role: Role) -> RecordResult<()> {
        self.require_any(&[role])
    }

    pub fn require_any(&self, roles: &[Role]) -> RecordResult<()> {
        match self.role() {
            Some(role) if roles.contains(&role) => Ok(()),
            Some(role) => Err(RecordError::Auth(format!(
                "role '{}' may not perform this action",
                role
            ))),
            None => Err(RecordError::Auth("not signed in".to_string())),
        }
    }

    pub fn sign_out(&mut self) {
        *self = Self::anonymous();
    }
}
