//! Company persistence. A company is always created together with its
//! first admin profile.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pulse_core::CompanyId;

use crate::state::{CompanyRecord, ProfileRecord};

/// Insert a company and its first admin in one transaction.
pub async fn insert_with_admin(
    pool: &PgPool,
    company: &CompanyRecord,
    admin: &ProfileRecord,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO companies (id, name, created_at) VALUES ($1, $2, $3)")
        .bind(company.id.as_uuid())
        .bind(&company.name)
        .bind(company.created_at)
        .execute(&mut *tx)
        .await?;

    super::profiles::insert_in(&mut tx, admin).await?;

    tx.commit().await
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<CompanyRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CompanyRow>(
        "SELECT id, name, created_at FROM companies ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CompanyRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_record(self) -> CompanyRecord {
        CompanyRecord {
            id: CompanyId::from_uuid(self.id),
            name: self.name,
            created_at: self.created_at,
        }
    }
}
