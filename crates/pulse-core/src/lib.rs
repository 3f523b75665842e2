//! # pulse-core: Foundational Types for Pulse
//!
//! Pulse is a multi-tenant employee survey service. This crate defines the
//! type-system primitives every other crate builds on. It depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `CompanyId`, `TeamId`,
//!    `ProfileId`, `SurveyId` and friends are distinct types. You cannot pass
//!    a `TeamId` where a `DepartmentId` is expected.
//!
//! 2. **Validated values at the boundary.** [`EmailAddress`] and
//!    [`InviteToken`] validate on construction. Once you hold one, it is
//!    well-formed.
//!
//! 3. **One questionnaire model.** [`Questionnaire`] owns both the structural
//!    validation of a survey's questions and the grading of submitted
//!    answers, so internal and guest submissions go through the same checks.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pulse-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod contact;
pub mod error;
pub mod identity;
pub mod questionnaire;
pub mod role;
pub mod token;

pub use contact::{EmailAddress, PersonName};
pub use error::{AnswerError, ValidationError};
pub use identity::{
    AssignmentId, CompanyId, DepartmentId, GuestInviteId, ProfileId, ResponseId, SurveyId, TeamId,
};
pub use questionnaire::{AnswerSet, QaEntry, QaResponses, Question, QuestionKind, Questionnaire};
pub use role::Role;
pub use token::InviteToken;
