//! # Companies
//!
//! Tenant provisioning. Only platform admins create or list companies; a
//! company always starts with one company-admin profile.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use pulse_core::{CompanyId, EmailAddress, PersonName, ProfileId, Role};

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, required_text, Validate};
use crate::routes::employees::ProfileResponse;
use crate::state::{AppState, CompanyRecord, ProfileRecord};

/// Request to provision a company and its first admin.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub admin_email: String,
    pub admin_first_name: String,
    #[serde(default)]
    pub admin_last_name: String,
}

impl Validate for CreateCompanyRequest {
    fn validate(&self) -> Result<(), String> {
        required_text(&self.name, "name")?;
        if self.name.trim().chars().count() > 200 {
            return Err("name must be at most 200 characters".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompanyResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CompanyRecord> for CompanyResponse {
    fn from(c: &CompanyRecord) -> Self {
        Self {
            id: *c.id.as_uuid(),
            name: c.name.clone(),
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCompanyResponse {
    pub company: CompanyResponse,
    pub admin: ProfileResponse,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/companies", get(list_companies).post(create_company))
}

/// POST /v1/companies: Provision a company with its first admin.
#[utoipa::path(
    post,
    path = "/v1/companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created", body = CreateCompanyResponse),
        (status = 403, description = "Caller is not a platform admin", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "companies"
)]
async fn create_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateCompanyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateCompanyResponse>), AppError> {
    require_role(&caller, Role::PlatformAdmin)?;
    let req = extract_validated_json(body)?;
    let email = EmailAddress::parse(&req.admin_email)?;
    let name = PersonName::new(&req.admin_first_name, &req.admin_last_name)?;
    let now = Utc::now();

    let company = CompanyRecord {
        id: CompanyId::new(),
        name: req.name.trim().to_string(),
        created_at: now,
    };
    let admin = ProfileRecord {
        id: ProfileId::new(),
        company_id: company.id,
        email,
        first_name: name.first,
        last_name: name.last,
        role: Role::CompanyAdmin,
        department_id: None,
        team_id: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    if let Some(pool) = &state.db_pool {
        crate::db::companies::insert_with_admin(pool, &company, &admin).await?;
    }
    state.companies.insert(*company.id.as_uuid(), company.clone());
    state.profiles.insert(*admin.id.as_uuid(), admin.clone());

    tracing::info!(company_id = %company.id, admin_id = %admin.id, "company created");

    Ok((
        StatusCode::CREATED,
        Json(CreateCompanyResponse {
            company: CompanyResponse::from(&company),
            admin: ProfileResponse::from(&admin),
        }),
    ))
}

/// GET /v1/companies: List all companies, oldest first.
#[utoipa::path(
    get,
    path = "/v1/companies",
    responses(
        (status = 200, description = "Companies", body = Vec<CompanyResponse>),
        (status = 403, description = "Caller is not a platform admin", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "companies"
)]
async fn list_companies(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<CompanyResponse>>, AppError> {
    require_role(&caller, Role::PlatformAdmin)?;
    let mut companies = state.companies.list();
    companies.sort_by_key(|c| c.created_at);
    Ok(Json(companies.iter().map(CompanyResponse::from).collect()))
}
