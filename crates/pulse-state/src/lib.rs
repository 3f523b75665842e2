//! # pulse-state: Lifecycle State Machines
//!
//! - [`invite`]: guest invite issuance, validation and one-time redemption.
//! - [`assignment`]: surveys assigned to employees, pending until answered.
//! - [`schedule`]: the derived publication status of a survey.
//!
//! Every transition takes `now` explicitly. Nothing in this crate reads the
//! clock, so expiry boundaries are testable to the instant.

pub mod assignment;
pub mod invite;
pub mod schedule;

pub use assignment::{Assignment, AssignmentError, AssignmentStatus};
pub use invite::{
    EffectiveInviteStatus, GuestInvite, InviteError, InviteStatus, NewGuestInvite,
    DEFAULT_INVITE_TTL_HOURS,
};
pub use schedule::{ScheduleError, SurveySchedule, SurveyStatus};
