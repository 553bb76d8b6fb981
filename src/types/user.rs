//! User-related types for the banking ledger

use super::transaction::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The role a user acts under
///
/// Roles gate the maintenance operations: clients hold base rights, bankers
/// may adjust limits and child status, admins may additionally change roles
/// and names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Banker,
    Admin,
}

impl UserRole {
    /// Parse a role from its lowercase name, defaulting to `Client` for
    /// anything unrecognized
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => UserRole::Admin,
            "banker" => UserRole::Banker,
            _ => UserRole::Client,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserRole::Client => "client",
            UserRole::Banker => "banker",
            UserRole::Admin => "admin",
        };
        write!(f, "{}", name)
    }
}

/// A registered user of the bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Caller-supplied identifier, unique across users
    pub id: UserId,

    /// Role gating maintenance operations
    pub role: UserRole,

    /// Display name
    pub name: String,

    /// Whether this user is a child
    ///
    /// Child users may only open Debit and ChildSaving accounts.
    pub is_child: bool,
}

impl User {
    /// Whether this user may change per-account spending limits
    pub fn can_modify_limits(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Banker)
    }

    /// Whether this user may change another user's child flag
    pub fn can_modify_child_flag(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Banker)
    }

    /// Whether this user may change roles and names
    pub fn can_administer(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}
