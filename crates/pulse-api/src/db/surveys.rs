//! Survey persistence. Questions are stored as a JSONB array.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pulse_core::{CompanyId, ProfileId, Questionnaire, SurveyId};

use crate::state::SurveyRecord;

pub async fn insert(pool: &PgPool, record: &SurveyRecord) -> Result<(), sqlx::Error> {
    let questions = super::to_json(&record.questions)?;

    sqlx::query(
        "INSERT INTO surveys
            (id, company_id, title, description, questions, is_active, start_date, end_date, created_by, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(record.id.as_uuid())
    .bind(record.company_id.as_uuid())
    .bind(&record.title)
    .bind(&record.description)
    .bind(&questions)
    .bind(record.is_active)
    .bind(record.start_date)
    .bind(record.end_date)
    .bind(record.created_by.map(|p| *p.as_uuid()))
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update(pool: &PgPool, record: &SurveyRecord) -> Result<bool, sqlx::Error> {
    let questions = super::to_json(&record.questions)?;

    let result = sqlx::query(
        "UPDATE surveys SET title = $1, description = $2, questions = $3, is_active = $4,
                start_date = $5, end_date = $6, updated_at = $7
         WHERE id = $8 AND company_id = $9",
    )
    .bind(&record.title)
    .bind(&record.description)
    .bind(&questions)
    .bind(record.is_active)
    .bind(record.start_date)
    .bind(record.end_date)
    .bind(record.updated_at)
    .bind(record.id.as_uuid())
    .bind(record.company_id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<SurveyRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SurveyRow>(
        "SELECT id, company_id, title, description, questions, is_active, start_date, end_date,
                created_by, created_at, updated_at
         FROM surveys ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(super::decode_rows("surveys", rows, SurveyRow::into_record))
}

#[derive(sqlx::FromRow)]
struct SurveyRow {
    id: Uuid,
    company_id: Uuid,
    title: String,
    description: Option<String>,
    questions: serde_json::Value,
    is_active: bool,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SurveyRow {
    fn into_record(self) -> Result<SurveyRecord, String> {
        let questions: Questionnaire = serde_json::from_value(self.questions)
            .map_err(|e| format!("survey {}: questions: {e}", self.id))?;
        Ok(SurveyRecord {
            id: SurveyId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            title: self.title,
            description: self.description,
            questions,
            is_active: self.is_active,
            start_date: self.start_date,
            end_date: self.end_date,
            created_by: self.created_by.map(ProfileId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
