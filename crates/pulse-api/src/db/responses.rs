//! Survey response persistence.
//!
//! A response is always written in the same transaction as the status flip
//! that authorizes it, so a response exists iff its invite or assignment
//! completed.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use pulse_core::{
    AssignmentId, CompanyId, GuestInviteId, ProfileId, QaResponses, ResponseId, SurveyId, TeamId,
};

use crate::state::ResponseRecord;

/// Outcome of a guarded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Recorded,
    /// The guarding row was no longer pending (or had expired).
    Rejected,
}

async fn insert_in(conn: &mut PgConnection, record: &ResponseRecord) -> Result<(), sqlx::Error> {
    let qa = super::to_json(&record.qa_responses)?;

    sqlx::query(
        "INSERT INTO survey_responses
            (id, survey_id, company_id, team_id, profile_id, assignment_id, guest_invite_id, qa_responses, submitted_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(record.id.as_uuid())
    .bind(record.survey_id.as_uuid())
    .bind(record.company_id.as_uuid())
    .bind(record.team_id.map(|t| *t.as_uuid()))
    .bind(record.profile_id.map(|p| *p.as_uuid()))
    .bind(record.assignment_id.map(|a| *a.as_uuid()))
    .bind(record.guest_invite_id.map(|g| *g.as_uuid()))
    .bind(&qa)
    .bind(record.submitted_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Complete a guest invite and record its response atomically.
pub async fn submit_for_invite(
    pool: &PgPool,
    invite: GuestInviteId,
    record: &ResponseRecord,
) -> Result<Submission, sqlx::Error> {
    let mut tx = pool.begin().await?;
    if !super::guest_invites::complete_in(&mut tx, invite, record.submitted_at).await? {
        tx.rollback().await?;
        return Ok(Submission::Rejected);
    }
    insert_in(&mut tx, record).await?;
    tx.commit().await?;
    Ok(Submission::Recorded)
}

/// Complete an employee assignment and record its response atomically.
pub async fn submit_for_assignment(
    pool: &PgPool,
    assignment: AssignmentId,
    profile: ProfileId,
    record: &ResponseRecord,
) -> Result<Submission, sqlx::Error> {
    let mut tx = pool.begin().await?;
    if !super::assignments::complete_in(&mut tx, assignment, profile, record.submitted_at).await? {
        tx.rollback().await?;
        return Ok(Submission::Rejected);
    }
    insert_in(&mut tx, record).await?;
    tx.commit().await?;
    Ok(Submission::Recorded)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<ResponseRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ResponseRow>(
        "SELECT id, survey_id, company_id, team_id, profile_id, assignment_id, guest_invite_id,
                qa_responses, submitted_at
         FROM survey_responses ORDER BY submitted_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(super::decode_rows("survey_responses", rows, ResponseRow::into_record))
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    id: Uuid,
    survey_id: Uuid,
    company_id: Uuid,
    team_id: Option<Uuid>,
    profile_id: Option<Uuid>,
    assignment_id: Option<Uuid>,
    guest_invite_id: Option<Uuid>,
    qa_responses: serde_json::Value,
    submitted_at: DateTime<Utc>,
}

impl ResponseRow {
    fn into_record(self) -> Result<ResponseRecord, String> {
        let qa_responses: QaResponses = serde_json::from_value(self.qa_responses)
            .map_err(|e| format!("response {}: qa_responses: {e}", self.id))?;
        Ok(ResponseRecord {
            id: ResponseId::from_uuid(self.id),
            survey_id: SurveyId::from_uuid(self.survey_id),
            company_id: CompanyId::from_uuid(self.company_id),
            team_id: self.team_id.map(TeamId::from_uuid),
            profile_id: self.profile_id.map(ProfileId::from_uuid),
            assignment_id: self.assignment_id.map(AssignmentId::from_uuid),
            guest_invite_id: self.guest_invite_id.map(GuestInviteId::from_uuid),
            qa_responses,
            submitted_at: self.submitted_at,
        })
    }
}
