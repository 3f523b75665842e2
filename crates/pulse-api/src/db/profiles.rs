//! Profile persistence.
//!
//! `profiles_company_email_idx` enforces one profile per email per company;
//! the handler maps the resulting unique violation to 409.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use pulse_core::{CompanyId, DepartmentId, EmailAddress, ProfileId, Role, TeamId};

use crate::state::ProfileRecord;

const INSERT_SQL: &str = "INSERT INTO profiles
    (id, company_id, email, first_name, last_name, role, department_id, team_id, is_active, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

pub async fn insert(pool: &PgPool, record: &ProfileRecord) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    insert_in(&mut conn, record).await
}

/// Insert on an existing connection or transaction.
pub(crate) async fn insert_in(
    conn: &mut PgConnection,
    record: &ProfileRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_SQL)
        .bind(record.id.as_uuid())
        .bind(record.company_id.as_uuid())
        .bind(record.email.as_str())
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(record.role.as_str())
        .bind(record.department_id.map(|d| *d.as_uuid()))
        .bind(record.team_id.map(|t| *t.as_uuid()))
        .bind(record.is_active)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(conn)
        .await?;

    Ok(())
}

/// Overwrite department, team, role and active flag.
pub async fn update(pool: &PgPool, record: &ProfileRecord) -> Result<bool, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    update_in(&mut conn, record).await
}

pub(crate) async fn update_in(
    conn: &mut PgConnection,
    record: &ProfileRecord,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE profiles SET department_id = $1, team_id = $2, role = $3, is_active = $4, updated_at = $5
         WHERE id = $6 AND company_id = $7",
    )
    .bind(record.department_id.map(|d| *d.as_uuid()))
    .bind(record.team_id.map(|t| *t.as_uuid()))
    .bind(record.role.as_str())
    .bind(record.is_active)
    .bind(record.updated_at)
    .bind(record.id.as_uuid())
    .bind(record.company_id.as_uuid())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move a profile onto its `team_id`, only if it is on no team yet.
pub(crate) async fn join_team_in(
    conn: &mut PgConnection,
    record: &ProfileRecord,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(JOIN_TEAM_SQL)
        .bind(record.team_id.map(|t| *t.as_uuid()))
        .bind(record.updated_at)
        .bind(record.id.as_uuid())
        .bind(record.company_id.as_uuid())
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

const JOIN_TEAM_SQL: &str = "UPDATE profiles SET team_id = $1, updated_at = $2
    WHERE id = $3 AND company_id = $4 AND team_id IS NULL";

pub async fn load_all(pool: &PgPool) -> Result<Vec<ProfileRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProfileRow>(
        "SELECT id, company_id, email, first_name, last_name, role, department_id, team_id,
                is_active, created_at, updated_at
         FROM profiles ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(super::decode_rows("profiles", rows, ProfileRow::into_record))
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    company_id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    department_id: Option<Uuid>,
    team_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_record(self) -> Result<ProfileRecord, String> {
        let email = EmailAddress::parse(&self.email).map_err(|e| format!("profile {}: {e}", self.id))?;
        let role = Role::from_name(&self.role).map_err(|e| format!("profile {}: {e}", self.id))?;
        Ok(ProfileRecord {
            id: ProfileId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            department_id: self.department_id.map(DepartmentId::from_uuid),
            team_id: self.team_id.map(TeamId::from_uuid),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_team_is_guarded_on_empty_membership() {
        assert!(JOIN_TEAM_SQL.contains("team_id IS NULL"));
        assert!(JOIN_TEAM_SQL.contains("company_id = $4"));
    }
}
