//! # Guest Invite Lifecycle
//!
//! A guest invite lets someone outside the company answer one survey through
//! an emailed link. The link's token is the guest's only credential.
//!
//! ## States
//!
//! ```text
//! Pending ──(submitted before expiry)──▶ Completed (terminal)
//!    │
//!    └──(now >= expires_at)──▶ Expired (derived, never stored)
//! ```
//!
//! Only `Pending` and `Completed` are persisted. `Expired` is computed from
//! the clock on every read, so an invite never needs a sweeper to age out.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pulse_core::{CompanyId, EmailAddress, GuestInviteId, InviteToken, ProfileId, SurveyId, TeamId};

/// Default invite lifetime: seven days.
pub const DEFAULT_INVITE_TTL_HOURS: i64 = 7 * 24;

/// Stored invite status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Completed,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    /// Parse a stored status column.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Status as observed at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveInviteStatus {
    Pending,
    Completed,
    Expired,
}

impl std::fmt::Display for EffectiveInviteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
        })
    }
}

/// Why an invite cannot be redeemed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteError {
    #[error("this survey has already been completed")]
    AlreadyCompleted,

    #[error("this survey link has expired")]
    Expired {
        /// When the link stopped working.
        expired_at: DateTime<Utc>,
    },
}

/// The caller-supplied part of a new invite.
#[derive(Debug, Clone)]
pub struct NewGuestInvite {
    pub guest_email: EmailAddress,
    pub survey_id: SurveyId,
    pub team_id: TeamId,
    pub company_id: CompanyId,
    /// The admin who sent the invite, when the caller has a profile.
    pub created_by: Option<ProfileId>,
}

/// A guest invite and its redemption state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestInvite {
    pub id: GuestInviteId,
    pub token: InviteToken,
    pub guest_email: EmailAddress,
    pub survey_id: SurveyId,
    pub team_id: TeamId,
    pub company_id: CompanyId,
    pub created_by: Option<ProfileId>,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GuestInvite {
    /// Issue a fresh invite with a new random token, valid for `ttl`.
    pub fn issue(new: NewGuestInvite, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: GuestInviteId::new(),
            token: InviteToken::generate(),
            guest_email: new.guest_email,
            survey_id: new.survey_id,
            team_id: new.team_id,
            company_id: new.company_id,
            created_by: new.created_by,
            status: InviteStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            completed_at: None,
        }
    }

    /// Status at `now`. The expiry instant itself counts as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> EffectiveInviteStatus {
        match self.status {
            InviteStatus::Completed => EffectiveInviteStatus::Completed,
            InviteStatus::Pending if now >= self.expires_at => EffectiveInviteStatus::Expired,
            InviteStatus::Pending => EffectiveInviteStatus::Pending,
        }
    }

    /// `Ok` iff the invite can still be answered at `now`.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), InviteError> {
        match self.effective_status(now) {
            EffectiveInviteStatus::Pending => Ok(()),
            EffectiveInviteStatus::Completed => Err(InviteError::AlreadyCompleted),
            EffectiveInviteStatus::Expired => Err(InviteError::Expired {
                expired_at: self.expires_at,
            }),
        }
    }

    /// Redeem the invite (Pending → Completed).
    ///
    /// Fails without mutating when the invite is completed or expired.
    /// Callers that share invites across threads must run this under the
    /// same lock as the read that found the invite.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), InviteError> {
        self.check_redeemable(now)?;
        self.status = InviteStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }
}
