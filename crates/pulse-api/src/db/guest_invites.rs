//! Guest invite persistence.
//!
//! The token column is unique. Completion is a conditional update that
//! re-checks status and expiry in SQL, so two processes cannot both redeem
//! the same link.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use pulse_core::{CompanyId, EmailAddress, GuestInviteId, InviteToken, ProfileId, SurveyId, TeamId};
use pulse_state::{GuestInvite, InviteStatus};

pub async fn insert(pool: &PgPool, record: &GuestInvite) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO guest_invites
            (id, token, guest_email, survey_id, team_id, company_id, created_by, status, created_at, expires_at, completed_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(record.id.as_uuid())
    .bind(record.token.as_str())
    .bind(record.guest_email.as_str())
    .bind(record.survey_id.as_uuid())
    .bind(record.team_id.as_uuid())
    .bind(record.company_id.as_uuid())
    .bind(record.created_by.map(|p| *p.as_uuid()))
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.expires_at)
    .bind(record.completed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete an invite whose email could not be delivered.
pub async fn delete(pool: &PgPool, id: GuestInviteId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM guest_invites WHERE id = $1 AND status = 'pending'")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Flip a pending, unexpired invite to completed.
///
/// Returns `false` when the row was already completed or had expired by
/// `now`.
pub(crate) async fn complete_in(
    conn: &mut PgConnection,
    id: GuestInviteId,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE guest_invites SET status = 'completed', completed_at = $1
         WHERE id = $2 AND status = 'pending' AND expires_at > $1",
    )
    .bind(now)
    .bind(id.as_uuid())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<GuestInvite>, sqlx::Error> {
    let rows = sqlx::query_as::<_, GuestInviteRow>(
        "SELECT id, token, guest_email, survey_id, team_id, company_id, created_by, status,
                created_at, expires_at, completed_at
         FROM guest_invites ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(super::decode_rows("guest_invites", rows, GuestInviteRow::into_record))
}

#[derive(sqlx::FromRow)]
struct GuestInviteRow {
    id: Uuid,
    token: String,
    guest_email: String,
    survey_id: Uuid,
    team_id: Uuid,
    company_id: Uuid,
    created_by: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl GuestInviteRow {
    fn into_record(self) -> Result<GuestInvite, String> {
        let token = InviteToken::parse(&self.token).map_err(|e| format!("invite {}: {e}", self.id))?;
        let guest_email =
            EmailAddress::parse(&self.guest_email).map_err(|e| format!("invite {}: {e}", self.id))?;
        let status = InviteStatus::from_name(&self.status)
            .ok_or_else(|| format!("invite {}: unknown status {:?}", self.id, self.status))?;
        Ok(GuestInvite {
            id: GuestInviteId::from_uuid(self.id),
            token,
            guest_email,
            survey_id: SurveyId::from_uuid(self.survey_id),
            team_id: TeamId::from_uuid(self.team_id),
            company_id: CompanyId::from_uuid(self.company_id),
            created_by: self.created_by.map(ProfileId::from_uuid),
            status,
            created_at: self.created_at,
            expires_at: self.expires_at,
            completed_at: self.completed_at,
        })
    }
}
