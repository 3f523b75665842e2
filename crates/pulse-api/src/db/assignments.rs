//! Assignment persistence.
//!
//! `assignments_one_pending_idx` allows at most one pending assignment per
//! survey and profile. Completion is a conditional update inside the
//! transaction that records the response, see [`super::responses`].

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use pulse_core::{AssignmentId, CompanyId, ProfileId, SurveyId};
use pulse_state::{Assignment, AssignmentStatus};

/// Insert a batch of new assignments in one transaction.
pub async fn insert_many(pool: &PgPool, records: &[Assignment]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for record in records {
        sqlx::query(
            "INSERT INTO assignments (id, survey_id, profile_id, company_id, status, created_at, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id.as_uuid())
        .bind(record.survey_id.as_uuid())
        .bind(record.profile_id.as_uuid())
        .bind(record.company_id.as_uuid())
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.completed_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

/// Flip a pending assignment to completed.
///
/// Returns `false` when the row was not pending, meaning another submission
/// won the race.
pub(crate) async fn complete_in(
    conn: &mut PgConnection,
    id: AssignmentId,
    profile: ProfileId,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE assignments SET status = 'completed', completed_at = $1
         WHERE id = $2 AND profile_id = $3 AND status = 'pending'",
    )
    .bind(now)
    .bind(id.as_uuid())
    .bind(profile.as_uuid())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<Assignment>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AssignmentRow>(
        "SELECT id, survey_id, profile_id, company_id, status, created_at, completed_at
         FROM assignments ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(super::decode_rows("assignments", rows, AssignmentRow::into_record))
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: Uuid,
    survey_id: Uuid,
    profile_id: Uuid,
    company_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl AssignmentRow {
    fn into_record(self) -> Result<Assignment, String> {
        let status = AssignmentStatus::from_name(&self.status)
            .ok_or_else(|| format!("assignment {}: unknown status {:?}", self.id, self.status))?;
        Ok(Assignment {
            id: AssignmentId::from_uuid(self.id),
            survey_id: SurveyId::from_uuid(self.survey_id),
            profile_id: ProfileId::from_uuid(self.profile_id),
            company_id: CompanyId::from_uuid(self.company_id),
            status,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}
