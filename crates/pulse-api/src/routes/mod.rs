//! # API Route Modules
//!
//! - `companies`: tenant provisioning (platform admins).
//! - `me`: the caller's own profile and pending assignments.
//! - `departments`, `employees`, `teams`: company structure (company admins).
//! - `surveys`: survey authoring and schedule status.
//! - `assignments`: sending surveys to employees and employee submission.
//! - `guest_invites`: sending surveys to external guests by email link.
//! - `guest`: the unauthenticated guest survey flow, keyed by link token.
//! - `responses`: reading submitted answers.
//! - `diagnostics`: configuration and connectivity report.

pub mod assignments;
pub mod companies;
pub mod departments;
pub mod diagnostics;
pub mod employees;
pub mod guest;
pub mod guest_invites;
pub mod me;
pub mod responses;
pub mod surveys;
pub mod teams;

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use pulse_core::CompanyId;

use crate::error::AppError;
use crate::state::{Store, Tenanted};

/// Fetch a record of the caller's company, or 404.
pub(crate) fn fetch_scoped<T>(
    store: &Store<T>,
    id: Uuid,
    company: CompanyId,
    what: &str,
) -> Result<T, AppError>
where
    T: Clone + Send + Sync + Tenanted,
{
    store
        .get_scoped(&id, company)
        .ok_or_else(|| AppError::NotFound(format!("{what} {id} not found")))
}

/// Distinguish an absent field from an explicit `null` in partial updates.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Trim an optional free-text field; blank becomes `None`.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
