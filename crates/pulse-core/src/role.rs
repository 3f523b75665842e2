//! # Roles
//!
//! Caller roles, ordered by privilege level.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Roles in Pulse, ordered by privilege level.
///
/// The `Ord` derivation follows declaration order:
/// `Employee < CompanyAdmin < PlatformAdmin`, so access checks are a single
/// `>=` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Answers surveys assigned to them.
    Employee,
    /// Manages one company's departments, teams, employees and surveys.
    CompanyAdmin,
    /// Operates the service; creates companies.
    PlatformAdmin,
}

impl Role {
    /// The snake_case name used in tokens, storage and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::CompanyAdmin => "company_admin",
            Self::PlatformAdmin => "platform_admin",
        }
    }

    /// Parse a role from its snake_case name.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        match name {
            "employee" => Ok(Self::Employee),
            "company_admin" => Ok(Self::CompanyAdmin),
            "platform_admin" => Ok(Self::PlatformAdmin),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
