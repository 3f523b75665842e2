//! # Identity Newtypes
//!
//! UUID-backed identifiers for every record kind. Each identifier is a
//! distinct type, always valid by construction, and serializes as a bare
//! UUID string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// A tenant. Every other record belongs to exactly one company.
    CompanyId
);
uuid_id!(
    /// A department within a company.
    DepartmentId
);
uuid_id!(
    /// A team within a company, optionally attached to a department.
    TeamId
);
uuid_id!(
    /// A person (employee or admin) within a company.
    ProfileId
);
uuid_id!(
    /// A survey authored by a company admin.
    SurveyId
);
uuid_id!(
    /// A survey sent to an internal employee, awaiting their response.
    AssignmentId
);
uuid_id!(
    /// A survey sent to an external guest through a tokenized link.
    GuestInviteId
);
uuid_id!(
    /// A submitted survey response.
    ResponseId
);
