//! # Departments
//!
//! Company admins group employees into departments. Department names are
//! unique within a company, compared case-insensitively.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use pulse_core::{CompanyId, DepartmentId};

use crate::auth::{require_company_admin, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, required_text, Validate};
use crate::routes::{fetch_scoped, normalize_optional};
use crate::state::{AppState, DepartmentRecord};

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub description: Option<String>,
}

impl Validate for CreateDepartmentRequest {
    fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    /// `null` or an empty string clears the description.
    #[serde(default, deserialize_with = "crate::routes::deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateDepartmentRequest {
    fn validate(&self) -> Result<(), String> {
        match &self.name {
            Some(name) => validate_name(name),
            None => Ok(()),
        }
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    required_text(name, "name")?;
    if name.trim().chars().count() > MAX_NAME_LEN {
        return Err(format!("name must be at most {MAX_NAME_LEN} characters"));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DepartmentResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Profiles currently in this department.
    pub employee_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DepartmentResponse {
    fn build(state: &AppState, d: &DepartmentRecord) -> Self {
        let employee_count = state
            .profiles
            .filter(|p| p.department_id == Some(d.id))
            .len();
        Self {
            id: *d.id.as_uuid(),
            name: d.name.clone(),
            description: d.description.clone(),
            is_active: d.is_active,
            employee_count,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DepartmentFilter {
    pub active: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/departments", get(list_departments).post(create_department))
        .route("/v1/departments/:id", get(get_department).put(update_department))
}

fn name_taken(state: &AppState, company: CompanyId, name: &str, except: Option<DepartmentId>) -> bool {
    state
        .departments
        .find(|d| d.company_id == company && Some(d.id) != except && d.name.eq_ignore_ascii_case(name))
        .is_some()
}

fn duplicate_name(name: &str) -> AppError {
    AppError::Conflict(format!("a department named {name:?} already exists"))
}

/// POST /v1/departments: Create a department.
#[utoipa::path(
    post,
    path = "/v1/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = DepartmentResponse),
        (status = 409, description = "Name already used", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
async fn create_department(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateDepartmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DepartmentResponse>), AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_validated_json(body)?;
    let name = req.name.trim().to_string();
    if name_taken(&state, company_id, &name, None) {
        return Err(duplicate_name(&name));
    }

    let now = Utc::now();
    let record = DepartmentRecord {
        id: DepartmentId::new(),
        company_id,
        name,
        description: normalize_optional(req.description),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    if let Some(pool) = &state.db_pool {
        crate::db::departments::insert(pool, &record).await?;
    }
    let inserted = state.departments.insert_unique(*record.id.as_uuid(), record.clone(), |d| {
        d.company_id == company_id && d.name.eq_ignore_ascii_case(&record.name)
    });
    if !inserted {
        return Err(duplicate_name(&record.name));
    }

    tracing::info!(company_id = %company_id, department_id = %record.id, "department created");
    Ok((StatusCode::CREATED, Json(DepartmentResponse::build(&state, &record))))
}

/// GET /v1/departments: List departments by name.
#[utoipa::path(
    get,
    path = "/v1/departments",
    params(DepartmentFilter),
    responses(
        (status = 200, description = "Departments", body = Vec<DepartmentResponse>),
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
async fn list_departments(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<DepartmentFilter>, QueryRejection>,
) -> Result<Json<Vec<DepartmentResponse>>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let filter = extract_query(query)?;
    let mut departments = state.departments.filter(|d| {
        d.company_id == company_id && filter.active.map_or(true, |a| d.is_active == a)
    });
    departments.sort_by_key(|d| d.name.to_lowercase());
    Ok(Json(
        departments
            .iter()
            .map(|d| DepartmentResponse::build(&state, d))
            .collect(),
    ))
}

/// GET /v1/departments/:id: Get one department.
#[utoipa::path(
    get,
    path = "/v1/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department", body = DepartmentResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
async fn get_department(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<DepartmentResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let department = fetch_scoped(&state.departments, id, company_id, "department")?;
    Ok(Json(DepartmentResponse::build(&state, &department)))
}

/// PUT /v1/departments/:id: Rename, describe, activate or deactivate.
#[utoipa::path(
    put,
    path = "/v1/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = DepartmentResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Name already used", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
async fn update_department(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateDepartmentRequest>, JsonRejection>,
) -> Result<Json<DepartmentResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_validated_json(body)?;
    let mut department = fetch_scoped(&state.departments, id, company_id, "department")?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if name_taken(&state, company_id, &name, Some(department.id)) {
            return Err(duplicate_name(&name));
        }
        department.name = name;
    }
    if let Some(description) = req.description {
        department.description = normalize_optional(description);
    }
    if let Some(is_active) = req.is_active {
        department.is_active = is_active;
    }
    department.updated_at = Utc::now();

    if let Some(pool) = &state.db_pool {
        crate::db::departments::update(pool, &department).await?;
    }
    state
        .departments
        .insert(*department.id.as_uuid(), department.clone());

    Ok(Json(DepartmentResponse::build(&state, &department)))
}
