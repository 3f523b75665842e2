//! Team persistence.
//!
//! Membership lives on `profiles.team_id`; the team row only carries the
//! manager. Operations that touch both go through one transaction.
//!
//! Joining a team is a conditional `UPDATE ... AND team_id IS NULL`, so two
//! requests racing for the same profile cannot both commit.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use pulse_core::{CompanyId, DepartmentId, ProfileId, TeamId};

use crate::state::{ProfileRecord, TeamRecord};

/// Outcome of a guarded team join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Joined,
    /// The profile was already on a team; nothing was written.
    AlreadyOnTeam,
}

/// Insert a team and move its manager onto it.
pub async fn insert_with_manager(
    pool: &PgPool,
    team: &TeamRecord,
    manager: &ProfileRecord,
) -> Result<Membership, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO teams (id, company_id, department_id, name, description, manager_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(team.id.as_uuid())
    .bind(team.company_id.as_uuid())
    .bind(team.department_id.map(|d| *d.as_uuid()))
    .bind(&team.name)
    .bind(&team.description)
    .bind(team.manager_id.map(|m| *m.as_uuid()))
    .bind(team.created_at)
    .bind(team.updated_at)
    .execute(&mut *tx)
    .await?;

    if !super::profiles::join_team_in(&mut tx, manager).await? {
        tx.rollback().await?;
        return Ok(Membership::AlreadyOnTeam);
    }

    tx.commit().await?;
    Ok(Membership::Joined)
}

/// Move a profile onto an existing team.
pub async fn add_member(pool: &PgPool, profile: &ProfileRecord) -> Result<Membership, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    if super::profiles::join_team_in(&mut conn, profile).await? {
        Ok(Membership::Joined)
    } else {
        Ok(Membership::AlreadyOnTeam)
    }
}

/// Persist a team's manager and the profiles whose membership changed.
pub async fn update_with_members(
    pool: &PgPool,
    team: &TeamRecord,
    changed: &[ProfileRecord],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    update_manager_in(&mut tx, team).await?;
    for profile in changed {
        super::profiles::update_in(&mut tx, profile).await?;
    }
    tx.commit().await
}

async fn update_manager_in(conn: &mut PgConnection, team: &TeamRecord) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE teams SET manager_id = $1, updated_at = $2 WHERE id = $3 AND company_id = $4")
        .bind(team.manager_id.map(|m| *m.as_uuid()))
        .bind(team.updated_at)
        .bind(team.id.as_uuid())
        .bind(team.company_id.as_uuid())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<TeamRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TeamRow>(
        "SELECT id, company_id, department_id, name, description, manager_id, created_at, updated_at
         FROM teams ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(TeamRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    company_id: Uuid,
    department_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    manager_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRow {
    fn into_record(self) -> TeamRecord {
        TeamRecord {
            id: TeamId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            name: self.name,
            description: self.description,
            department_id: self.department_id.map(DepartmentId::from_uuid),
            manager_id: self.manager_id.map(ProfileId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
