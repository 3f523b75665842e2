//! Department persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pulse_core::{CompanyId, DepartmentId};

use crate::state::DepartmentRecord;

/// Insert a department. A case-insensitive duplicate name within the
/// company violates `departments_company_name_idx`.
pub async fn insert(pool: &PgPool, record: &DepartmentRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO departments (id, company_id, name, description, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id.as_uuid())
    .bind(record.company_id.as_uuid())
    .bind(&record.name)
    .bind(&record.description)
    .bind(record.is_active)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the mutable columns. Returns `false` if no row matched.
pub async fn update(pool: &PgPool, record: &DepartmentRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE departments SET name = $1, description = $2, is_active = $3, updated_at = $4
         WHERE id = $5 AND company_id = $6",
    )
    .bind(&record.name)
    .bind(&record.description)
    .bind(record.is_active)
    .bind(record.updated_at)
    .bind(record.id.as_uuid())
    .bind(record.company_id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<DepartmentRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DepartmentRow>(
        "SELECT id, company_id, name, description, is_active, created_at, updated_at
         FROM departments ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DepartmentRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct DepartmentRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DepartmentRow {
    fn into_record(self) -> DepartmentRecord {
        DepartmentRecord {
            id: DepartmentId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
