//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented handler and DTO into one OpenAPI
//! document, served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "`{role}:{company_id}:{profile_id}:{secret}`, or the bare secret for platform operators.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pulse API",
        version = "0.1.0",
        description = "Multi-tenant employee pulse surveys: company structure, survey authoring, employee assignments, and emailed guest invites."
    ),
    paths(
        crate::routes::companies::create_company,
        crate::routes::companies::list_companies,
        crate::routes::me::get_me,
        crate::routes::me::my_assignments,
        crate::routes::departments::create_department,
        crate::routes::departments::list_departments,
        crate::routes::departments::get_department,
        crate::routes::departments::update_department,
        crate::routes::employees::invite_employee,
        crate::routes::employees::list_employees,
        crate::routes::employees::get_employee,
        crate::routes::employees::update_employee,
        crate::routes::teams::create_team,
        crate::routes::teams::list_teams,
        crate::routes::teams::get_team,
        crate::routes::teams::add_member,
        crate::routes::teams::remove_member,
        crate::routes::teams::set_manager,
        crate::routes::surveys::create_survey,
        crate::routes::surveys::list_surveys,
        crate::routes::surveys::get_survey,
        crate::routes::surveys::update_survey,
        crate::routes::assignments::assign_survey,
        crate::routes::assignments::submit_assignment,
        crate::routes::guest_invites::create_invite,
        crate::routes::guest_invites::list_invites,
        crate::routes::guest::guest_survey,
        crate::routes::guest::guest_submit,
        crate::routes::responses::list_responses,
        crate::routes::diagnostics::diagnostics,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::companies::CreateCompanyRequest,
        crate::routes::companies::CompanyResponse,
        crate::routes::companies::CreateCompanyResponse,
        crate::routes::me::PendingAssignment,
        crate::routes::departments::CreateDepartmentRequest,
        crate::routes::departments::UpdateDepartmentRequest,
        crate::routes::departments::DepartmentResponse,
        crate::routes::employees::ProfileResponse,
        crate::routes::employees::ProfileSummary,
        crate::routes::employees::InviteEmployeeRequest,
        crate::routes::employees::InviteEmployeeResponse,
        crate::routes::employees::UpdateEmployeeRequest,
        crate::routes::teams::CreateTeamRequest,
        crate::routes::teams::ProfileRef,
        crate::routes::teams::TeamResponse,
        crate::routes::teams::TeamDetailResponse,
        crate::routes::surveys::CreateSurveyRequest,
        crate::routes::surveys::UpdateSurveyRequest,
        crate::routes::surveys::SurveyResponse,
        crate::routes::surveys::SurveyContent,
        crate::routes::assignments::AssignSurveyRequest,
        crate::routes::assignments::AssignmentResponse,
        crate::routes::assignments::AssignSurveyResponse,
        crate::routes::assignments::SubmitAnswersRequest,
        crate::routes::assignments::SubmitAnswersResponse,
        crate::routes::guest_invites::CreateGuestInviteRequest,
        crate::routes::guest_invites::GuestInviteResponse,
        crate::routes::guest::GuestSurveyRequest,
        crate::routes::guest::GuestSubmitRequest,
        crate::routes::guest::GuestSubmitResponse,
        crate::routes::responses::SurveyResponseView,
        crate::routes::diagnostics::DiagnosticsResponse,
        crate::routes::diagnostics::DatabaseStatus,
        crate::routes::diagnostics::CallerStatus,
        crate::routes::diagnostics::StoreCounts,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "companies", description = "Tenant provisioning for platform operators"),
        (name = "me", description = "The caller's profile and pending surveys"),
        (name = "departments", description = "Company departments"),
        (name = "employees", description = "Employee profiles and invitations"),
        (name = "teams", description = "Teams, members and managers"),
        (name = "surveys", description = "Survey authoring and schedule status"),
        (name = "assignments", description = "Sending surveys to employees and employee submission"),
        (name = "guest-invites", description = "Emailed survey links for external guests"),
        (name = "guest", description = "Unauthenticated guest survey flow"),
        (name = "responses", description = "Submitted answers"),
        (name = "diagnostics", description = "Configuration and connectivity report"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Pulse API");
        assert!(!spec.paths.paths.is_empty());
    }

    #[test]
    fn spec_has_guest_and_survey_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/guest/survey",
            "/v1/guest/submit",
            "/v1/surveys/{id}",
            "/v1/surveys/{id}/assignments",
            "/v1/teams/{id}/members/{profile_id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_declares_bearer_auth() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn invite_response_schema_has_no_token() {
        let spec = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let invite = &spec["components"]["schemas"]["GuestInviteResponse"]["properties"];
        assert!(invite.get("guest_email").is_some());
        assert!(invite.get("token").is_none());
    }
}
