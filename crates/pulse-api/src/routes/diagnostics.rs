//! Configuration and connectivity report for operators and admins
//! debugging a deployment. Never includes secrets.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use pulse_core::{CompanyId, Role};

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::state::{AppState, Tenanted};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// `http`, `log` or `outbox`.
    pub mail_mode: String,
    pub site_url: String,
    pub database: DatabaseStatus,
    pub caller: CallerStatus,
    pub counts: StoreCounts,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseStatus {
    pub configured: bool,
    /// `None` when no database is configured.
    pub reachable: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallerStatus {
    #[schema(value_type = String, example = "company_admin")]
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub profile_id: Option<Uuid>,
    pub profile_found: bool,
}

/// Record counts, limited to the caller's company when it has one.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreCounts {
    pub companies: usize,
    pub departments: usize,
    pub profiles: usize,
    pub teams: usize,
    pub surveys: usize,
    pub assignments: usize,
    pub guest_invites: usize,
    pub responses: usize,
}

impl StoreCounts {
    fn collect(state: &AppState, company: Option<CompanyId>) -> Self {
        fn count<T: Clone + Send + Sync + Tenanted>(
            store: &crate::state::Store<T>,
            company: Option<CompanyId>,
        ) -> usize {
            match company {
                Some(c) => store.filter(|r| r.company_id() == c).len(),
                None => store.len(),
            }
        }
        Self {
            companies: match company {
                Some(c) => usize::from(state.companies.contains(c.as_uuid())),
                None => state.companies.len(),
            },
            departments: count(&state.departments, company),
            profiles: count(&state.profiles, company),
            teams: count(&state.teams, company),
            surveys: count(&state.surveys, company),
            assignments: count(&state.assignments, company),
            guest_invites: count(&state.guest_invites, company),
            responses: count(&state.responses, company),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/diagnostics", get(diagnostics))
}

/// GET /v1/diagnostics: Report configuration and connectivity.
#[utoipa::path(
    get,
    path = "/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics report", body = DiagnosticsResponse),
        (status = 403, description = "Admins only", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "diagnostics"
)]
async fn diagnostics(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<DiagnosticsResponse>, AppError> {
    require_role(&caller, Role::CompanyAdmin)?;

    let reachable = match &state.db_pool {
        Some(pool) => Some(match crate::db::ping(pool).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "diagnostics: database ping failed");
                false
            }
        }),
        None => None,
    };

    let profile_found = caller
        .profile_id
        .and_then(|p| state.profiles.get(p.as_uuid()))
        .is_some_and(|p| caller.company_id.map_or(true, |c| p.company_id == c));

    Ok(Json(DiagnosticsResponse {
        mail_mode: state.mailer.kind().to_string(),
        site_url: state.config.site_url.clone(),
        database: DatabaseStatus {
            configured: state.db_pool.is_some(),
            reachable,
        },
        caller: CallerStatus {
            role: caller.role,
            company_id: caller.company_id.map(|c| *c.as_uuid()),
            profile_id: caller.profile_id.map(|p| *p.as_uuid()),
            profile_found,
        },
        counts: StoreCounts::collect(&state, caller.company_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, employee_identity, profile, seed_company};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app(state: AppState, identity: CallerIdentity) -> Router {
        router().layer(axum::Extension(identity)).with_state(state)
    }

    fn get() -> Request<Body> {
        Request::builder().uri("/v1/diagnostics").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn company_admin_sees_scoped_counts() {
        let state = AppState::new();
        let (company_id, admin) = seed_company(&state, "Acme");
        profile(&state, company_id, "ana@acme.test", Role::Employee);
        seed_company(&state, "Globex");

        let resp = test_app(state, admin).oneshot(get()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let report: DiagnosticsResponse = body_json(resp).await;
        assert_eq!(report.mail_mode, "log");
        assert!(!report.database.configured);
        assert_eq!(report.database.reachable, None);
        assert!(report.caller.profile_found);
        assert_eq!(report.counts.companies, 1);
        assert_eq!(report.counts.profiles, 2);
    }

    #[tokio::test]
    async fn platform_admin_sees_everything() {
        let state = AppState::new();
        seed_company(&state, "Acme");
        seed_company(&state, "Globex");
        let resp = test_app(state, CallerIdentity::platform_admin())
            .oneshot(get())
            .await
            .unwrap();
        let report: DiagnosticsResponse = body_json(resp).await;
        assert_eq!(report.counts.companies, 2);
        assert!(!report.caller.profile_found);
    }

    #[tokio::test]
    async fn employees_are_forbidden() {
        let state = AppState::new();
        let (company_id, _) = seed_company(&state, "Acme");
        let emp = profile(&state, company_id, "ana@acme.test", Role::Employee);
        let resp = test_app(state, employee_identity(&emp)).oneshot(get()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
