//! # Employees
//!
//! Company admins invite employees by email, list and filter them, and
//! change their department, role, or active flag. An invitation creates
//! the profile immediately; the email only tells the person where to sign
//! in.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use pulse_core::{CompanyId, DepartmentId, EmailAddress, PersonName, ProfileId, Role, TeamId};
use pulse_mail::templates;

use crate::auth::{require_company_admin, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, extract_validated_json, Validate};
use crate::routes::fetch_scoped;
use crate::state::{AppState, DepartmentRecord, ProfileRecord};

/// A profile as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(value_type = String, example = "employee")]
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ProfileRecord> for ProfileResponse {
    fn from(p: &ProfileRecord) -> Self {
        Self {
            id: *p.id.as_uuid(),
            company_id: *p.company_id.as_uuid(),
            email: p.email.to_string(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            role: p.role,
            department_id: p.department_id.map(|d| *d.as_uuid()),
            team_id: p.team_id.map(|t| *t.as_uuid()),
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Short form of a profile, embedded in team and survey views.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&ProfileRecord> for ProfileSummary {
    fn from(p: &ProfileRecord) -> Self {
        Self {
            id: *p.id.as_uuid(),
            name: p.full_name(),
            email: p.email.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InviteEmployeeRequest {
    pub email: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InviteEmployeeResponse {
    pub profile: ProfileResponse,
    /// Whether the sign-in email was accepted by the mail provider.
    pub invitation_sent: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateEmployeeRequest {
    /// `null` removes the employee from their department.
    #[serde(default, deserialize_with = "crate::routes::deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub department_id: Option<Option<Uuid>>,
    #[schema(value_type = Option<String>, example = "company_admin")]
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateEmployeeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.role == Some(Role::PlatformAdmin) {
            return Err("role platform_admin cannot be granted to an employee".into());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EmployeeFilter {
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    /// `true`: only employees not on any team.
    pub unassigned: Option<bool>,
    pub active: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/employees", get(list_employees).post(invite_employee))
        .route("/v1/employees/:id", get(get_employee).put(update_employee))
}

/// An active department of `company`, or the matching error.
pub(crate) fn active_department(
    state: &AppState,
    company: CompanyId,
    id: Uuid,
) -> Result<DepartmentRecord, AppError> {
    let department = fetch_scoped(&state.departments, id, company, "department")?;
    if !department.is_active {
        return Err(AppError::Validation(format!("department {id} is not active")));
    }
    Ok(department)
}

/// POST /v1/employees: Invite an employee.
#[utoipa::path(
    post,
    path = "/v1/employees",
    request_body = InviteEmployeeRequest,
    responses(
        (status = 201, description = "Employee profile created", body = InviteEmployeeResponse),
        (status = 404, description = "Department not found", body = crate::error::ErrorBody),
        (status = 409, description = "Email already used in this company", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
async fn invite_employee(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<InviteEmployeeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InviteEmployeeResponse>), AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_json(body)?;
    let email = EmailAddress::parse(&req.email)?;
    let name = PersonName::new(&req.first_name, &req.last_name)?;
    let department_id = req
        .department_id
        .map(|id| active_department(&state, company_id, id).map(|d| d.id))
        .transpose()?;

    let company = state
        .companies
        .get(company_id.as_uuid())
        .ok_or_else(|| AppError::NotFound(format!("company {company_id} not found")))?;

    let now = Utc::now();
    let profile = ProfileRecord {
        id: ProfileId::new(),
        company_id,
        email: email.clone(),
        first_name: name.first,
        last_name: name.last,
        role: Role::Employee,
        department_id,
        team_id: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let duplicate = |p: &ProfileRecord| p.company_id == company_id && p.email == email;
    if state.profiles.find(duplicate).is_some() {
        return Err(AppError::Conflict(format!("an employee with email {email} already exists")));
    }
    if let Some(pool) = &state.db_pool {
        crate::db::profiles::insert(pool, &profile).await?;
    }
    if !state.profiles.insert_unique(*profile.id.as_uuid(), profile.clone(), duplicate) {
        return Err(AppError::Conflict(format!("an employee with email {email} already exists")));
    }

    let message = templates::employee_invite(
        &email,
        &profile.first_name,
        &company.name,
        &state.config.login_url(),
    );
    let invitation_sent = match state.mailer.send(&message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(profile_id = %profile.id, error = %e, "employee invitation email failed");
            false
        }
    };

    tracing::info!(company_id = %company_id, profile_id = %profile.id, "employee invited");

    Ok((
        StatusCode::CREATED,
        Json(InviteEmployeeResponse {
            profile: ProfileResponse::from(&profile),
            invitation_sent,
        }),
    ))
}

/// GET /v1/employees: List the company's employees.
#[utoipa::path(
    get,
    path = "/v1/employees",
    params(EmployeeFilter),
    responses(
        (status = 200, description = "Employees sorted by name", body = Vec<ProfileResponse>),
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
async fn list_employees(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<EmployeeFilter>, QueryRejection>,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let filter = extract_query(query)?;
    let department = filter.department_id.map(DepartmentId::from_uuid);
    let team = filter.team_id.map(TeamId::from_uuid);

    let mut profiles = state.profiles.filter(|p| {
        p.company_id == company_id
            && department.map_or(true, |d| p.department_id == Some(d))
            && team.map_or(true, |t| p.team_id == Some(t))
            && filter.unassigned.map_or(true, |u| p.team_id.is_none() == u)
            && filter.active.map_or(true, |a| p.is_active == a)
    });
    profiles.sort_by(|a, b| {
        (a.last_name.to_lowercase(), a.first_name.to_lowercase())
            .cmp(&(b.last_name.to_lowercase(), b.first_name.to_lowercase()))
    });
    Ok(Json(profiles.iter().map(ProfileResponse::from).collect()))
}

/// GET /v1/employees/:id: Get one employee.
#[utoipa::path(
    get,
    path = "/v1/employees/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Employee", body = ProfileResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
async fn get_employee(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let profile = fetch_scoped(&state.profiles, id, company_id, "employee")?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// PUT /v1/employees/:id: Change department, role, or active flag.
#[utoipa::path(
    put,
    path = "/v1/employees/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Employee updated", body = ProfileResponse),
        (status = 404, description = "Employee or department not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
async fn update_employee(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateEmployeeRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_validated_json(body)?;
    let mut profile = fetch_scoped(&state.profiles, id, company_id, "employee")?;

    if let Some(department) = req.department_id {
        profile.department_id = department
            .map(|d| active_department(&state, company_id, d).map(|d| d.id))
            .transpose()?;
    }
    if let Some(role) = req.role {
        if caller.profile_id == Some(profile.id) && role < profile.role {
            return Err(AppError::Validation("you cannot lower your own role".into()));
        }
        profile.role = role;
    }
    if let Some(is_active) = req.is_active {
        profile.is_active = is_active;
    }
    profile.updated_at = Utc::now();

    if let Some(pool) = &state.db_pool {
        crate::db::profiles::update(pool, &profile).await?;
    }
    let updated = state
        .profiles
        .update(profile.id.as_uuid(), |p| {
            p.department_id = profile.department_id;
            p.role = profile.role;
            p.is_active = profile.is_active;
            p.updated_at = profile.updated_at;
        })
        .ok_or_else(|| AppError::NotFound(format!("employee {id} not found")))?;

    tracing::info!(profile_id = %updated.id, "employee updated");
    Ok(Json(ProfileResponse::from(&updated)))
}
