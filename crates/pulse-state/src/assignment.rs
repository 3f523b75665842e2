//! # Employee Survey Assignments
//!
//! An assignment records that a survey was sent to one employee. It starts
//! pending and completes when the employee submits their answers. Completed
//! assignments are kept, so the employee dashboard lists pending ones by
//! filtering on status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pulse_core::{AssignmentId, CompanyId, ProfileId, SurveyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("this survey has already been submitted")]
    AlreadyCompleted,
}

/// A survey assigned to an employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub survey_id: SurveyId,
    pub profile_id: ProfileId,
    pub company_id: CompanyId,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn new(
        survey_id: SurveyId,
        profile_id: ProfileId,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AssignmentId::new(),
            survey_id,
            profile_id,
            company_id,
            status: AssignmentStatus::Pending,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == AssignmentStatus::Pending
    }

    /// Pending → Completed. A completed assignment never changes again.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), AssignmentError> {
        if !self.is_pending() {
            return Err(AssignmentError::AlreadyCompleted);
        }
        self.status = AssignmentStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assignment_is_pending() {
        let a = Assignment::new(SurveyId::new(), ProfileId::new(), CompanyId::new(), Utc::now());
        assert!(a.is_pending());
        assert!(a.completed_at.is_none());
    }

    #[test]
    fn complete_is_one_way() {
        let mut a = Assignment::new(SurveyId::new(), ProfileId::new(), CompanyId::new(), Utc::now());
        let now = Utc::now();
        a.complete(now).unwrap();
        assert_eq!(a.status, AssignmentStatus::Completed);
        assert_eq!(a.completed_at, Some(now));
        assert_eq!(a.complete(Utc::now()), Err(AssignmentError::AlreadyCompleted));
        assert_eq!(a.completed_at, Some(now));
    }

    #[test]
    fn status_names_roundtrip() {
        assert_eq!(AssignmentStatus::from_name("pending"), Some(AssignmentStatus::Pending));
        assert_eq!(AssignmentStatus::from_name("completed"), Some(AssignmentStatus::Completed));
        assert_eq!(AssignmentStatus::from_name("deleted"), None);
    }
}
