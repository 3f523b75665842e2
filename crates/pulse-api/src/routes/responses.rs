//! Submitted survey responses, read back by company admins.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use pulse_core::QaResponses;

use crate::auth::{require_company_admin, CallerIdentity};
use crate::error::AppError;
use crate::routes::fetch_scoped;
use crate::state::{AppState, ResponseRecord};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SurveyResponseView {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub team_id: Option<Uuid>,
    /// `None` for guest responses.
    pub profile_id: Option<Uuid>,
    pub assignment_id: Option<Uuid>,
    pub guest_invite_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub qa_responses: QaResponses,
    pub submitted_at: DateTime<Utc>,
}

impl From<&ResponseRecord> for SurveyResponseView {
    fn from(r: &ResponseRecord) -> Self {
        Self {
            id: *r.id.as_uuid(),
            survey_id: *r.survey_id.as_uuid(),
            team_id: r.team_id.map(|t| *t.as_uuid()),
            profile_id: r.profile_id.map(|p| *p.as_uuid()),
            assignment_id: r.assignment_id.map(|a| *a.as_uuid()),
            guest_invite_id: r.guest_invite_id.map(|g| *g.as_uuid()),
            qa_responses: r.qa_responses.clone(),
            submitted_at: r.submitted_at,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/surveys/:id/responses", get(list_responses))
}

/// GET /v1/surveys/:id/responses: All responses to a survey, newest first.
#[utoipa::path(
    get,
    path = "/v1/surveys/{id}/responses",
    params(("id" = Uuid, Path, description = "Survey ID")),
    responses(
        (status = 200, description = "Responses", body = Vec<SurveyResponseView>),
        (status = 404, description = "Survey not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "responses"
)]
async fn list_responses(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SurveyResponseView>>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let survey = fetch_scoped(&state.surveys, id, company_id, "survey")?;
    let mut responses = state
        .responses
        .filter(|r| r.survey_id == survey.id && r.company_id == company_id);
    responses.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    Ok(Json(responses.iter().map(SurveyResponseView::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, employee_identity, profile, seed_company};
    use crate::state::SurveyRecord;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pulse_core::{EmailAddress, Questionnaire, ResponseId, Role, SurveyId};
    use tower::ServiceExt;

    fn test_app(state: AppState, identity: CallerIdentity) -> Router {
        router().layer(axum::Extension(identity)).with_state(state)
    }

    fn seed(state: &AppState) -> (SurveyRecord, CallerIdentity) {
        let (company_id, admin) = seed_company(state, "Acme");
        let now = Utc::now();
        let survey = SurveyRecord {
            id: SurveyId::new(),
            company_id,
            title: "Pulse".into(),
            description: None,
            questions: Questionnaire::default(),
            is_active: true,
            start_date: None,
            end_date: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        state.surveys.insert(*survey.id.as_uuid(), survey.clone());
        let response = ResponseRecord {
            id: ResponseId::new(),
            survey_id: survey.id,
            company_id,
            team_id: None,
            profile_id: None,
            assignment_id: None,
            guest_invite_id: None,
            qa_responses: QaResponses {
                email: EmailAddress::parse("guest@partner.test").unwrap(),
                responses: Vec::new(),
            },
            submitted_at: now,
        };
        state.responses.insert(*response.id.as_uuid(), response);
        (survey, admin)
    }

    fn get(uri: String) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn admin_reads_responses() {
        let state = AppState::new();
        let (survey, admin) = seed(&state);
        let resp = test_app(state, admin)
            .oneshot(get(format!("/v1/surveys/{}/responses", survey.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let list: Vec<SurveyResponseView> = body_json(resp).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].qa_responses.email.as_str(), "guest@partner.test");
    }

    #[tokio::test]
    async fn employees_cannot_read_responses() {
        let state = AppState::new();
        let (survey, _) = seed(&state);
        let emp = profile(&state, survey.company_id, "ana@acme.test", Role::Employee);
        let resp = test_app(state, employee_identity(&emp))
            .oneshot(get(format!("/v1/surveys/{}/responses", survey.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn other_tenant_survey_is_404() {
        let state = AppState::new();
        let (survey, _) = seed(&state);
        let (_, outsider) = seed_company(&state, "Globex");
        let resp = test_app(state, outsider)
            .oneshot(get(format!("/v1/surveys/{}/responses", survey.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
