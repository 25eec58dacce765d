use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Anonymous,
    Client,
    Admin,
}

/// What the authentication provider tells us about the current visitor.
///
/// Public estimation never consults this; only attaching an estimate to a
/// client account does.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("saving an estimate to an account requires a signed-in client")]
    NotAuthenticated,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn client(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role: Role::Client,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role: Role::Admin,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role != Role::Anonymous && self.user_id.is_some()
    }

    /// The account an estimate may be filed under.
    pub fn account_owner(&self) -> Result<&str, AccessError> {
        match (&self.role, &self.user_id) {
            (Role::Client | Role::Admin, Some(id)) => Ok(id.as_str()),
            _ => Err(AccessError::NotAuthenticated),
        }
    }
}
