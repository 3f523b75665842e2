//! # Survey Schedule Status
//!
//! A survey's displayed status is derived from its active flag and optional
//! start/end window. It is never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    /// Switched off by an admin.
    Inactive,
    /// Active, but the start date is in the future.
    Scheduled,
    /// Active, but the end date has passed.
    Ended,
    /// Active and inside its window.
    Active,
    /// Active with no start date.
    Draft,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A survey's activity flag and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySchedule {
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl SurveySchedule {
    /// Build a schedule, rejecting a window that ends before it starts.
    pub fn new(
        is_active: bool,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Self, ScheduleError> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(ScheduleError::StartAfterEnd { start, end });
            }
        }
        Ok(Self {
            is_active,
            start_date,
            end_date,
        })
    }

    pub fn status(&self, now: DateTime<Utc>) -> SurveyStatus {
        if !self.is_active {
            return SurveyStatus::Inactive;
        }
        if matches!(self.start_date, Some(start) if now < start) {
            return SurveyStatus::Scheduled;
        }
        if matches!(self.end_date, Some(end) if now > end) {
            return SurveyStatus::Ended;
        }
        if self.start_date.is_some() {
            return SurveyStatus::Active;
        }
        SurveyStatus::Draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn inactive_wins_over_window() {
        let s = SurveySchedule::new(false, Some(now() - Duration::days(1)), None).unwrap();
        assert_eq!(s.status(now()), SurveyStatus::Inactive);
    }

    #[test]
    fn window_statuses() {
        let day = Duration::days(1);
        let scheduled = SurveySchedule::new(true, Some(now() + day), None).unwrap();
        assert_eq!(scheduled.status(now()), SurveyStatus::Scheduled);

        let ended = SurveySchedule::new(true, Some(now() - day * 2), Some(now() - day)).unwrap();
        assert_eq!(ended.status(now()), SurveyStatus::Ended);

        let active = SurveySchedule::new(true, Some(now() - day), Some(now() + day)).unwrap();
        assert_eq!(active.status(now()), SurveyStatus::Active);

        let open_ended = SurveySchedule::new(true, Some(now()), None).unwrap();
        assert_eq!(open_ended.status(now()), SurveyStatus::Active);
    }

    #[test]
    fn no_start_date_is_draft() {
        assert_eq!(
            SurveySchedule::new(true, None, None).unwrap().status(now()),
            SurveyStatus::Draft
        );
        let end_only = SurveySchedule::new(true, None, Some(now() + Duration::days(3))).unwrap();
        assert_eq!(end_only.status(now()), SurveyStatus::Draft);
    }

    #[test]
    fn end_only_in_past_is_ended() {
        let s = SurveySchedule::new(true, None, Some(now() - Duration::hours(1))).unwrap();
        assert_eq!(s.status(now()), SurveyStatus::Ended);
    }

    #[test]
    fn start_after_end_rejected() {
        let err = SurveySchedule::new(true, Some(now()), Some(now() - Duration::hours(1)));
        assert!(matches!(err, Err(ScheduleError::StartAfterEnd { .. })));
    }
}
