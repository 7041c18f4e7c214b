//! A user role assignment and its synthesized identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Association of a user, by email, with a role within a VTEX account.
///
/// Every field identifies the assignment: there is no way of updating one in place, changing any
/// of them means deleting the assignment and creating a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub email: String,
    pub name: String,
    pub account: String,
    pub role_name: String,
}

impl UserRole {
    /// Builds the assignment, defaulting the display name to the local part of the email when it
    /// is absent or empty.
    pub fn new(
        email: impl Into<String>,
        name: Option<String>,
        account: impl Into<String>,
        role_name: impl Into<String>,
    ) -> Self {
        let email = email.into();
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_name(&email).to_string());
        Self {
            email,
            name,
            account: account.into(),
            role_name: role_name.into(),
        }
    }

    pub fn id(&self) -> UserRoleId {
        UserRoleId {
            email: self.email.clone(),
            account: self.account.clone(),
            role_name: self.role_name.clone(),
        }
    }
}

/// Local part of an email, or the whole value if it has no `@`.
pub fn default_name(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

/// Payload accepted by both the create and the remove endpoints.
#[derive(Debug, Serialize)]
pub struct UserRoleRequest<'a> {
    pub users: Vec<&'a UserRole>,
}

impl<'a> From<&'a UserRole> for UserRoleRequest<'a> {
    fn from(user_role: &'a UserRole) -> Self {
        Self {
            users: vec![user_role],
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum UserRoleIdError {
    #[error("expected identifier format email:account:role_name, got: `{0}`")]
    InvalidFormat(String),
}

/// Identifier of an assignment, rendered as `email:account:role_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserRoleId {
    pub email: String,
    pub account: String,
    pub role_name: String,
}

impl fmt::Display for UserRoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.email, self.account, self.role_name)
    }
}

impl FromStr for UserRoleId {
    type Err = UserRoleIdError;

    // The role name keeps any further `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(email), Some(account), Some(role_name)) => Ok(Self {
                email: email.to_string(),
                account: account.to_string(),
                role_name: role_name.to_string(),
            }),
            _ => Err(UserRoleIdError::InvalidFormat(s.to_string())),
        }
    }
}

impl From<UserRoleId> for UserRole {
    fn from(id: UserRoleId) -> Self {
        UserRole::new(id.email, None, id.account, id.role_name)
    }
}
