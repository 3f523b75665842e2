//! # Contact Values
//!
//! Validated email addresses and person names.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of an email address (RFC 5321 path limit).
const MAX_EMAIL_LEN: usize = 254;

/// Maximum length of a first or last name.
const MAX_NAME_LEN: usize = 100;

/// A normalized email address: trimmed and lower-cased.
///
/// Validation is deliberately shallow: one `@`, a non-empty local part, and
/// a domain with at least one interior dot. Deliverability is the mail
/// provider's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalize an email address.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() || normalized.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::InvalidEmail(raw.to_string()));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidEmail(raw.to_string()));
        }

        let mut parts = normalized.split('@');
        let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => (local, domain),
            _ => return Err(ValidationError::InvalidEmail(raw.to_string())),
        };

        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains("..");
        if local.is_empty() || !domain_ok {
            return Err(ValidationError::InvalidEmail(raw.to_string()));
        }

        Ok(Self(normalized))
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// A person's first and last name, trimmed.
///
/// The first name is required. The last name may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    /// Validate and trim a name pair.
    pub fn new(first: &str, last: &str) -> Result<Self, ValidationError> {
        let first = first.trim();
        let last = last.trim();
        if first.is_empty() {
            return Err(ValidationError::InvalidName {
                field: "first_name",
                reason: "must not be empty".into(),
            });
        }
        if first.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::InvalidName {
                field: "first_name",
                reason: format!("must not exceed {MAX_NAME_LEN} characters"),
            });
        }
        if last.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::InvalidName {
                field: "last_name",
                reason: format!("must not exceed {MAX_NAME_LEN} characters"),
            });
        }
        Ok(Self {
            first: first.to_string(),
            last: last.to_string(),
        })
    }

    /// "First Last", or just "First" when the last name is empty.
    pub fn full(&self) -> String {
        if self.last.is_empty() {
            self.first.clone()
        } else {
            format!("{} {}", self.first, self.last)
        }
    }
}
