//! The caller's own profile and the surveys waiting for them.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::routes::employees::ProfileResponse;
use crate::routes::surveys::SurveyContent;
use crate::state::AppState;

/// A pending assignment with the survey to answer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingAssignment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub survey: SurveyContent,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/me", get(get_me))
        .route("/v1/me/assignments", get(my_assignments))
}

/// GET /v1/me: The caller's profile.
#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Caller profile", body = ProfileResponse),
        (status = 403, description = "Caller has no profile", body = crate::error::ErrorBody),
        (status = 404, description = "Profile not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
async fn get_me(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ProfileResponse>, AppError> {
    let company_id = caller.require_tenant()?;
    let profile_id = caller.profile()?;
    let profile = state
        .profiles
        .get_scoped(profile_id.as_uuid(), company_id)
        .ok_or_else(|| AppError::NotFound(format!("profile {profile_id} not found")))?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// GET /v1/me/assignments: Pending assignments, newest first.
#[utoipa::path(
    get,
    path = "/v1/me/assignments",
    responses(
        (status = 200, description = "Pending assignments", body = Vec<PendingAssignment>),
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
async fn my_assignments(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<PendingAssignment>>, AppError> {
    let company_id = caller.require_tenant()?;
    let profile_id = caller.profile()?;

    let mut pending = state.assignments.filter(|a| {
        a.company_id == company_id && a.profile_id == profile_id && a.is_pending()
    });
    pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    // An assignment whose survey is gone is skipped rather than failing the list.
    let items = pending
        .into_iter()
        .filter_map(|a| {
            let survey = state.surveys.get_scoped(a.survey_id.as_uuid(), company_id)?;
            Some(PendingAssignment {
                id: *a.id.as_uuid(),
                created_at: a.created_at,
                survey: SurveyContent::from(&survey),
            })
        })
        .collect();
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, employee_identity, profile, seed_company};
    use crate::state::SurveyRecord;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use pulse_core::{CompanyId, Questionnaire, Role, SurveyId};
    use pulse_state::Assignment;
    use tower::ServiceExt;

    fn test_app(state: AppState, identity: CallerIdentity) -> Router {
        router().layer(axum::Extension(identity)).with_state(state)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn survey(state: &AppState, company_id: CompanyId, title: &str) -> SurveyRecord {
        let now = Utc::now();
        let questions: Questionnaire = serde_json::from_value(serde_json::json!([
            {"id": "q1", "text": "How are you?", "type": "text"}
        ]))
        .unwrap();
        let record = SurveyRecord {
            id: SurveyId::new(),
            company_id,
            title: title.into(),
            description: None,
            questions,
            is_active: true,
            start_date: None,
            end_date: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        state.surveys.insert(*record.id.as_uuid(), record.clone());
        record
    }

    #[tokio::test]
    async fn me_returns_own_profile() {
        let state = AppState::new();
        let (company_id, _) = seed_company(&state, "Acme");
        let emp = profile(&state, company_id, "ana@acme.test", Role::Employee);
        let resp = test_app(state, employee_identity(&emp))
            .oneshot(get("/v1/me"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: ProfileResponse = body_json(resp).await;
        assert_eq!(body.id, *emp.id.as_uuid());
    }

    #[tokio::test]
    async fn me_without_profile_is_403() {
        let state = AppState::new();
        let (company_id, _) = seed_company(&state, "Acme");
        let identity = CallerIdentity {
            role: Role::CompanyAdmin,
            company_id: Some(company_id),
            profile_id: None,
        };
        let resp = test_app(state, identity).oneshot(get("/v1/me")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn assignments_lists_only_pending_newest_first() {
        let state = AppState::new();
        let (company_id, _) = seed_company(&state, "Acme");
        let emp = profile(&state, company_id, "ana@acme.test", Role::Employee);
        let now = Utc::now();

        let older = survey(&state, company_id, "Older");
        let newer = survey(&state, company_id, "Newer");
        let done = survey(&state, company_id, "Done");
        for (s, at) in [(&older, now - Duration::hours(2)), (&newer, now)] {
            let a = Assignment::new(s.id, emp.id, company_id, at);
            state.assignments.insert(*a.id.as_uuid(), a);
        }
        let mut completed = Assignment::new(done.id, emp.id, company_id, now);
        completed.complete(now).unwrap();
        state.assignments.insert(*completed.id.as_uuid(), completed);

        let resp = test_app(state, employee_identity(&emp))
            .oneshot(get("/v1/me/assignments"))
            .await
            .unwrap();
        let items: Vec<PendingAssignment> = body_json(resp).await;
        let titles: Vec<_> = items.iter().map(|i| i.survey.title.as_str()).collect();
        assert_eq!(titles, ["Newer", "Older"]);
    }
}
