//! # Teams
//!
//! A team belongs to a company and optionally a department. Membership is
//! stored on the profile (`team_id`), so an employee is on at most one
//! team. Every team is created with a manager, who joins the team.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use pulse_core::{CompanyId, ProfileId, TeamId};

use crate::auth::{require_company_admin, CallerIdentity};
use crate::db::teams::Membership;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, required_text, Validate};
use crate::routes::employees::ProfileSummary;
use crate::routes::{fetch_scoped, normalize_optional};
use crate::state::{AppState, ProfileRecord, TeamRecord};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTeamRequest {
    pub name: String,
    pub description: Option<String>,
    pub department_id: Option<Uuid>,
    pub manager_id: Uuid,
}

impl Validate for CreateTeamRequest {
    fn validate(&self) -> Result<(), String> {
        required_text(&self.name, "name")?;
        if self.name.trim().chars().count() > 100 {
            return Err("name must be at most 100 characters".into());
        }
        Ok(())
    }
}

/// Names a profile for membership and manager changes.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileRef {
    pub profile_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub department_id: Option<Uuid>,
    pub manager: Option<ProfileSummary>,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamDetailResponse {
    #[serde(flatten)]
    pub team: TeamResponse,
    pub members: Vec<ProfileSummary>,
}

fn members_of(state: &AppState, team: TeamId) -> Vec<ProfileRecord> {
    let mut members = state.profiles.filter(|p| p.team_id == Some(team));
    members.sort_by_key(|p| p.full_name().to_lowercase());
    members
}

fn team_response(state: &AppState, team: &TeamRecord) -> TeamResponse {
    let manager = team
        .manager_id
        .and_then(|m| state.profiles.get(m.as_uuid()))
        .map(|p| ProfileSummary::from(&p));
    TeamResponse {
        id: *team.id.as_uuid(),
        name: team.name.clone(),
        description: team.description.clone(),
        department_id: team.department_id.map(|d| *d.as_uuid()),
        manager,
        member_count: state.profiles.filter(|p| p.team_id == Some(team.id)).len(),
        created_at: team.created_at,
        updated_at: team.updated_at,
    }
}

fn detail(state: &AppState, team: &TeamRecord) -> TeamDetailResponse {
    TeamDetailResponse {
        team: team_response(state, team),
        members: members_of(state, team.id)
            .iter()
            .map(ProfileSummary::from)
            .collect(),
    }
}

/// An active profile of `company`.
fn active_profile(state: &AppState, company: CompanyId, id: Uuid) -> Result<ProfileRecord, AppError> {
    let profile = fetch_scoped(&state.profiles, id, company, "employee")?;
    if !profile.is_active {
        return Err(AppError::Validation(format!("employee {id} is not active")));
    }
    Ok(profile)
}

fn already_on_team(id: ProfileId) -> AppError {
    AppError::Conflict(format!("employee {id} is already on a team"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/teams", get(list_teams).post(create_team))
        .route("/v1/teams/:id", get(get_team))
        .route("/v1/teams/:id/members", post(add_member))
        .route("/v1/teams/:id/members/:profile_id", delete(remove_member))
        .route("/v1/teams/:id/manager", put(set_manager))
}

/// POST /v1/teams: Create a team with its manager.
#[utoipa::path(
    post,
    path = "/v1/teams",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamDetailResponse),
        (status = 404, description = "Department or manager not found", body = crate::error::ErrorBody),
        (status = 409, description = "Manager already on a team", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
async fn create_team(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamDetailResponse>), AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_validated_json(body)?;

    let department_id = req
        .department_id
        .map(|id| crate::routes::employees::active_department(&state, company_id, id).map(|d| d.id))
        .transpose()?;
    let mut manager = active_profile(&state, company_id, req.manager_id)?;
    if let Some(department) = department_id {
        if manager.department_id != Some(department) {
            return Err(AppError::Validation(
                "manager must belong to the team's department".into(),
            ));
        }
    }
    if manager.team_id.is_some() {
        return Err(already_on_team(manager.id));
    }

    let now = Utc::now();
    let team = TeamRecord {
        id: TeamId::new(),
        company_id,
        name: req.name.trim().to_string(),
        description: normalize_optional(req.description),
        department_id,
        manager_id: Some(manager.id),
        created_at: now,
        updated_at: now,
    };
    manager.team_id = Some(team.id);
    manager.updated_at = now;

    if let Some(pool) = &state.db_pool {
        if crate::db::teams::insert_with_manager(pool, &team, &manager).await?
            == Membership::AlreadyOnTeam
        {
            return Err(already_on_team(manager.id));
        }
    }
    state.teams.insert(*team.id.as_uuid(), team.clone());
    let joined = state
        .profiles
        .try_update(manager.id.as_uuid(), |p| {
            if p.team_id.is_some() {
                return Err(already_on_team(p.id));
            }
            p.team_id = Some(team.id);
            p.updated_at = now;
            Ok(())
        })
        .unwrap_or_else(|| Err(AppError::NotFound(format!("employee {} not found", manager.id))));
    if let Err(e) = joined {
        state.teams.remove(team.id.as_uuid());
        return Err(e);
    }

    tracing::info!(company_id = %company_id, team_id = %team.id, "team created");
    Ok((StatusCode::CREATED, Json(detail(&state, &team))))
}

/// GET /v1/teams: List teams with manager and member count.
#[utoipa::path(
    get,
    path = "/v1/teams",
    responses(
        (status = 200, description = "Teams sorted by name", body = Vec<TeamResponse>),
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
async fn list_teams(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<TeamResponse>>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let mut teams = state.teams.list_scoped(company_id);
    teams.sort_by_key(|t| t.name.to_lowercase());
    Ok(Json(teams.iter().map(|t| team_response(&state, t)).collect()))
}

/// GET /v1/teams/:id: Team with its members.
#[utoipa::path(
    get,
    path = "/v1/teams/{id}",
    params(("id" = Uuid, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team", body = TeamDetailResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
async fn get_team(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamDetailResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let team = fetch_scoped(&state.teams, id, company_id, "team")?;
    Ok(Json(detail(&state, &team)))
}

/// POST /v1/teams/:id/members: Add an employee who is not on a team.
#[utoipa::path(
    post,
    path = "/v1/teams/{id}/members",
    params(("id" = Uuid, Path, description = "Team ID")),
    request_body = ProfileRef,
    responses(
        (status = 200, description = "Member added", body = TeamDetailResponse),
        (status = 404, description = "Team or employee not found", body = crate::error::ErrorBody),
        (status = 409, description = "Employee already on a team", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
async fn add_member(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ProfileRef>, JsonRejection>,
) -> Result<Json<TeamDetailResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_json(body)?;
    let team = fetch_scoped(&state.teams, id, company_id, "team")?;
    let mut profile = active_profile(&state, company_id, req.profile_id)?;
    if profile.team_id.is_some() {
        return Err(already_on_team(profile.id));
    }

    let now = Utc::now();
    profile.team_id = Some(team.id);
    profile.updated_at = now;

    if let Some(pool) = &state.db_pool {
        if crate::db::teams::add_member(pool, &profile).await? == Membership::AlreadyOnTeam {
            return Err(already_on_team(profile.id));
        }
    }
    state
        .profiles
        .try_update(profile.id.as_uuid(), |p| {
            if p.team_id.is_some() {
                return Err(already_on_team(p.id));
            }
            p.team_id = Some(team.id);
            p.updated_at = now;
            Ok(())
        })
        .unwrap_or_else(|| Err(AppError::NotFound(format!("employee {} not found", profile.id))))?;

    Ok(Json(detail(&state, &team)))
}

/// DELETE /v1/teams/:id/members/:profile_id: Remove a member.
///
/// Removing the manager also clears the team's manager.
#[utoipa::path(
    delete,
    path = "/v1/teams/{id}/members/{profile_id}",
    params(
        ("id" = Uuid, Path, description = "Team ID"),
        ("profile_id" = Uuid, Path, description = "Profile ID"),
    ),
    responses(
        (status = 200, description = "Member removed", body = TeamDetailResponse),
        (status = 404, description = "Team or membership not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
async fn remove_member(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, profile_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TeamDetailResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let mut team = fetch_scoped(&state.teams, id, company_id, "team")?;
    let mut profile = fetch_scoped(&state.profiles, profile_id, company_id, "employee")?;
    if profile.team_id != Some(team.id) {
        return Err(AppError::NotFound(format!(
            "employee {profile_id} is not a member of team {id}"
        )));
    }

    let now = Utc::now();
    profile.team_id = None;
    profile.updated_at = now;
    if team.manager_id == Some(profile.id) {
        team.manager_id = None;
        team.updated_at = now;
    }

    if let Some(pool) = &state.db_pool {
        crate::db::teams::update_with_members(pool, &team, std::slice::from_ref(&profile)).await?;
    }
    state.profiles.update(profile.id.as_uuid(), |p| {
        p.team_id = None;
        p.updated_at = now;
    });
    state.teams.insert(*team.id.as_uuid(), team.clone());

    Ok(Json(detail(&state, &team)))
}

/// PUT /v1/teams/:id/manager: Make an existing member the manager.
#[utoipa::path(
    put,
    path = "/v1/teams/{id}/manager",
    params(("id" = Uuid, Path, description = "Team ID")),
    request_body = ProfileRef,
    responses(
        (status = 200, description = "Manager changed", body = TeamDetailResponse),
        (status = 404, description = "Team or employee not found", body = crate::error::ErrorBody),
        (status = 422, description = "Employee is not a member", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
async fn set_manager(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ProfileRef>, JsonRejection>,
) -> Result<Json<TeamDetailResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_json(body)?;
    let mut team = fetch_scoped(&state.teams, id, company_id, "team")?;
    let profile = active_profile(&state, company_id, req.profile_id)?;
    if profile.team_id != Some(team.id) {
        return Err(AppError::Validation(format!(
            "employee {} must be a member of the team to manage it",
            profile.id
        )));
    }

    team.manager_id = Some(profile.id);
    team.updated_at = Utc::now();

    if let Some(pool) = &state.db_pool {
        crate::db::teams::update_with_members(pool, &team, &[]).await?;
    }
    state.teams.insert(*team.id.as_uuid(), team.clone());

    Ok(Json(detail(&state, &team)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, profile, seed_company};
    use axum::body::Body;
    use axum::http::Request;
    use pulse_core::Role;
    use tower::ServiceExt;

    fn test_app(state: AppState, identity: CallerIdentity) -> Router {
        router().layer(axum::Extension(identity)).with_state(state)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create_team_with(
        state: &AppState,
        admin: &CallerIdentity,
        manager: &ProfileRecord,
    ) -> TeamDetailResponse {
        let resp = test_app(state.clone(), admin.clone())
            .oneshot(json_request(
                "POST",
                "/v1/teams",
                serde_json::json!({"name": "Platform", "manager_id": manager.id.to_string()}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    #[tokio::test]
    async fn create_assigns_manager_to_team() {
        let state = AppState::new();
        let (company_id, admin) = seed_company(&state, "Acme");
        let manager = profile(&state, company_id, "lead@acme.test", Role::Employee);

        let team = create_team_with(&state, &admin, &manager).await;
        assert_eq!(team.team.member_count, 1);
        assert_eq!(team.team.manager.as_ref().map(|m| m.id), Some(*manager.id.as_uuid()));
        assert_eq!(
            state.profiles.get(manager.id.as_uuid()).unwrap().team_id.map(|t| *t.as_uuid()),
            Some(team.team.id)
        );
    }

    #[tokio::test]
    async fn manager_outside_department_is_rejected() {
        let state = AppState::new();
        let (company_id, admin) = seed_company(&state, "Acme");
        let manager = profile(&state, company_id, "lead@acme.test", Role::Employee);
        let now = Utc::now();
        let dept = crate::state::DepartmentRecord {
            id: pulse_core::DepartmentId::new(),
            company_id,
            name: "Eng".into(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.departments.insert(*dept.id.as_uuid(), dept.clone());

        let resp = test_app(state, admin)
            .oneshot(json_request(
                "POST",
                "/v1/teams",
                serde_json::json!({
                    "name": "Platform",
                    "department_id": dept.id.to_string(),
                    "manager_id": manager.id.to_string()
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn add_member_twice_is_409() {
        let state = AppState::new();
        let (company_id, admin) = seed_company(&state, "Acme");
        let manager = profile(&state, company_id, "lead@acme.test", Role::Employee);
        let member = profile(&state, company_id, "dev@acme.test", Role::Employee);
        let team = create_team_with(&state, &admin, &manager).await;
        let uri = format!("/v1/teams/{}/members", team.team.id);
        let body = serde_json::json!({"profile_id": member.id.to_string()});

        let resp = test_app(state.clone(), admin.clone())
            .oneshot(json_request("POST", &uri, body.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let detail: TeamDetailResponse = body_json(resp).await;
        assert_eq!(detail.members.len(), 2);

        let resp = test_app(state, admin)
            .oneshot(json_request("POST", &uri, body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_with_one_manager_keep_one_team() {
        let state = AppState::new();
        let (company_id, admin) = seed_company(&state, "Acme");
        let manager = profile(&state, company_id, "lead@acme.test", Role::Employee);

        let mut handles = Vec::new();
        for i in 0..8 {
            let app = test_app(state.clone(), admin.clone());
            let body = serde_json::json!({"name": format!("Team {i}"), "manager_id": manager.id.to_string()});
            handles.push(tokio::spawn(async move {
                app.oneshot(json_request("POST", "/v1/teams", body))
                    .await
                    .unwrap()
                    .status()
            }));
        }
        let mut codes = Vec::new();
        for handle in handles {
            codes.push(handle.await.unwrap());
        }

        assert_eq!(codes.iter().filter(|c| **c == StatusCode::CREATED).count(), 1);
        assert_eq!(codes.iter().filter(|c| **c == StatusCode::CONFLICT).count(), 7);
        let teams = state.teams.list_scoped(company_id);
        assert_eq!(teams.len(), 1);
        assert_eq!(
            state.profiles.get(manager.id.as_uuid()).unwrap().team_id,
            Some(teams[0].id)
        );
    }

    #[tokio::test]
    async fn removing_manager_clears_manager() {
        let state = AppState::new();
        let (company_id, admin) = seed_company(&state, "Acme");
        let manager = profile(&state, company_id, "lead@acme.test", Role::Employee);
        let team = create_team_with(&state, &admin, &manager).await;

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/v1/teams/{}/members/{}", team.team.id, manager.id))
            .body(Body::empty())
            .unwrap();
        let resp = test_app(state.clone(), admin).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let detail: TeamDetailResponse = body_json(resp).await;
        assert!(detail.team.manager.is_none());
        assert!(detail.members.is_empty());
        assert!(state.profiles.get(manager.id.as_uuid()).unwrap().team_id.is_none());
    }

    #[tokio::test]
    async fn manager_must_be_member() {
        let state = AppState::new();
        let (company_id, admin) = seed_company(&state, "Acme");
        let manager = profile(&state, company_id, "lead@acme.test", Role::Employee);
        let outsider = profile(&state, company_id, "out@acme.test", Role::Employee);
        let team = create_team_with(&state, &admin, &manager).await;
        let uri = format!("/v1/teams/{}/manager", team.team.id);

        let resp = test_app(state.clone(), admin.clone())
            .oneshot(json_request(
                "PUT",
                &uri,
                serde_json::json!({"profile_id": outsider.id.to_string()}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        test_app(state.clone(), admin.clone())
            .oneshot(json_request(
                "POST",
                &format!("/v1/teams/{}/members", team.team.id),
                serde_json::json!({"profile_id": outsider.id.to_string()}),
            ))
            .await
            .unwrap();
        let resp = test_app(state, admin)
            .oneshot(json_request(
                "PUT",
                &uri,
                serde_json::json!({"profile_id": outsider.id.to_string()}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let detail: TeamDetailResponse = body_json(resp).await;
        assert_eq!(detail.team.manager.map(|m| m.id), Some(*outsider.id.as_uuid()));
    }

    #[tokio::test]
    async fn other_tenant_team_is_404() {
        let state = AppState::new();
        let (other, other_admin) = seed_company(&state, "Other");
        let manager = profile(&state, other, "lead@other.test", Role::Employee);
        let team = create_team_with(&state, &other_admin, &manager).await;
        let (_, admin) = seed_company(&state, "Acme");

        let req = Request::builder()
            .uri(format!("/v1/teams/{}", team.team.id))
            .body(Body::empty())
            .unwrap();
        let resp = test_app(state, admin).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
