//! # Guest Survey Flow
//!
//! Unauthenticated endpoints used by the page behind an emailed invite
//! link. The link token is the only credential: it identifies the invite,
//! which fixes the survey, company and team the response is recorded
//! against. A malformed or unknown token is a 404, an answered invite is a
//! 409 and an expired one is a 410.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use pulse_core::{AnswerSet, InviteToken, QaResponses, ResponseId};
use pulse_state::{GuestInvite, InviteError};

use crate::db::responses::Submission;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::routes::surveys::SurveyContent;
use crate::state::{AppState, ResponseRecord, SurveyRecord};

const INVALID_LINK: &str = "invalid survey link";

#[derive(Debug, Deserialize, ToSchema)]
pub struct GuestSurveyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GuestSubmitRequest {
    pub token: String,
    /// Answers keyed by question id.
    #[schema(value_type = Object)]
    pub answers: AnswerSet,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GuestSubmitResponse {
    pub success: bool,
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/guest/survey", post(guest_survey))
        .route("/v1/guest/submit", post(guest_submit))
}

/// Resolve a link token to its invite and survey. Everything that does not
/// lead to a live survey is reported the same way.
fn resolve(state: &AppState, raw: &str) -> Result<(GuestInvite, SurveyRecord), AppError> {
    let not_found = || AppError::NotFound(INVALID_LINK.into());
    let token = InviteToken::parse(raw.trim()).map_err(|_| not_found())?;
    let invite = state
        .guest_invites
        .find(|i| i.token == token)
        .ok_or_else(not_found)?;
    let survey = state
        .surveys
        .get_scoped(invite.survey_id.as_uuid(), invite.company_id)
        .ok_or_else(not_found)?;
    Ok((invite, survey))
}

/// POST /v1/guest/survey: Load the survey behind an invite link.
#[utoipa::path(
    post,
    path = "/v1/guest/survey",
    request_body = GuestSurveyRequest,
    responses(
        (status = 200, description = "Survey to answer", body = SurveyContent),
        (status = 404, description = "Invalid link", body = crate::error::ErrorBody),
        (status = 409, description = "Already completed", body = crate::error::ErrorBody),
        (status = 410, description = "Link expired", body = crate::error::ErrorBody),
    ),
    tag = "guest"
)]
async fn guest_survey(
    State(state): State<AppState>,
    body: Result<Json<GuestSurveyRequest>, JsonRejection>,
) -> Result<Json<SurveyContent>, AppError> {
    let req = extract_json(body)?;
    let (invite, survey) = resolve(&state, &req.token)?;
    invite.check_redeemable(Utc::now())?;
    Ok(Json(SurveyContent::from(&survey)))
}

/// POST /v1/guest/submit: Submit a guest's answers.
#[utoipa::path(
    post,
    path = "/v1/guest/submit",
    request_body = GuestSubmitRequest,
    responses(
        (status = 200, description = "Response recorded", body = GuestSubmitResponse),
        (status = 404, description = "Invalid link", body = crate::error::ErrorBody),
        (status = 409, description = "Already completed", body = crate::error::ErrorBody),
        (status = 410, description = "Link expired", body = crate::error::ErrorBody),
        (status = 422, description = "Answers do not fit the survey", body = crate::error::ErrorBody),
    ),
    tag = "guest"
)]
async fn guest_submit(
    State(state): State<AppState>,
    body: Result<Json<GuestSubmitRequest>, JsonRejection>,
) -> Result<Json<GuestSubmitResponse>, AppError> {
    let req = extract_json(body)?;
    let (invite, survey) = resolve(&state, &req.token)?;
    let now = Utc::now();
    invite.check_redeemable(now)?;
    let responses = survey.questions.grade(&req.answers)?;

    let record = ResponseRecord {
        id: ResponseId::new(),
        survey_id: survey.id,
        company_id: invite.company_id,
        team_id: Some(invite.team_id),
        profile_id: None,
        assignment_id: None,
        guest_invite_id: Some(invite.id),
        qa_responses: QaResponses {
            email: invite.guest_email.clone(),
            responses,
        },
        submitted_at: now,
    };

    if let Some(pool) = &state.db_pool {
        let outcome = crate::db::responses::submit_for_invite(pool, invite.id, &record).await?;
        if outcome == Submission::Rejected {
            let err = if now >= invite.expires_at {
                InviteError::Expired {
                    expired_at: invite.expires_at,
                }
            } else {
                InviteError::AlreadyCompleted
            };
            return Err(err.into());
        }
    }
    state
        .guest_invites
        .try_update(invite.id.as_uuid(), |i| i.complete(now))
        .ok_or_else(|| AppError::NotFound(INVALID_LINK.into()))??;
    state.responses.insert(*record.id.as_uuid(), record.clone());

    tracing::info!(
        company_id = %invite.company_id,
        invite_id = %invite.id,
        response_id = %record.id,
        "guest response recorded"
    );

    Ok(Json(GuestSubmitResponse {
        success: true,
        message: "Thank you! Your response has been recorded.".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, seed_company};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Duration};
    use pulse_core::{EmailAddress, Questionnaire, SurveyId, TeamId};
    use pulse_state::NewGuestInvite;
    use tower::ServiceExt;

    fn seed_invite(state: &AppState, issued_at: DateTime<Utc>) -> GuestInvite {
        let (company_id, _) = seed_company(state, "Acme");
        let now = Utc::now();
        let questions: Questionnaire = serde_json::from_value(serde_json::json!([
            {"id": "q1", "text": "How was working with us?", "type": "rating", "scale": 10, "required": true},
            {"id": "q2", "text": "Pick one", "type": "multiple_choice", "options": ["Great", "Okay"]}
        ]))
        .unwrap();
        let survey = SurveyRecord {
            id: SurveyId::new(),
            company_id,
            title: "Partner feedback".into(),
            description: Some("Two quick questions".into()),
            questions,
            is_active: true,
            start_date: None,
            end_date: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        state.surveys.insert(*survey.id.as_uuid(), survey.clone());
        let invite = GuestInvite::issue(
            NewGuestInvite {
                guest_email: EmailAddress::parse("guest@partner.test").unwrap(),
                survey_id: survey.id,
                team_id: TeamId::new(),
                company_id,
                created_by: None,
            },
            issued_at,
            Duration::days(7),
        );
        state.guest_invites.insert(*invite.id.as_uuid(), invite.clone());
        invite
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn app(state: &AppState) -> Router {
        router().with_state(state.clone())
    }

    #[tokio::test]
    async fn survey_loads_for_valid_token() {
        let state = AppState::new();
        let invite = seed_invite(&state, Utc::now());
        let resp = app(&state)
            .oneshot(post("/v1/guest/survey", serde_json::json!({"token": invite.token.as_str()})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let survey: SurveyContent = body_json(resp).await;
        assert_eq!(survey.title, "Partner feedback");
        assert_eq!(survey.questions.len(), 2);
    }

    #[tokio::test]
    async fn malformed_and_unknown_tokens_are_404() {
        let state = AppState::new();
        seed_invite(&state, Utc::now());
        for token in ["nope".to_string(), InviteToken::generate().as_str().to_string()] {
            let resp = app(&state)
                .oneshot(post("/v1/guest/survey", serde_json::json!({"token": token})))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn expired_link_is_410() {
        let state = AppState::new();
        let invite = seed_invite(&state, Utc::now() - Duration::days(8));
        let resp = app(&state)
            .oneshot(post("/v1/guest/survey", serde_json::json!({"token": invite.token.as_str()})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn submit_records_guest_response_then_409() {
        let state = AppState::new();
        let invite = seed_invite(&state, Utc::now());
        let body = serde_json::json!({
            "token": invite.token.as_str(),
            "answers": {"q1": 9, "q2": "Great"}
        });

        let resp = app(&state).oneshot(post("/v1/guest/submit", body.clone())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let ack: GuestSubmitResponse = body_json(resp).await;
        assert!(ack.success);

        let stored = state.responses.list();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].profile_id, None);
        assert_eq!(stored[0].team_id, Some(invite.team_id));
        assert_eq!(stored[0].guest_invite_id, Some(invite.id));
        assert_eq!(stored[0].qa_responses.email.as_str(), "guest@partner.test");

        let again = app(&state).oneshot(post("/v1/guest/submit", body)).await.unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
        let reload = app(&state)
            .oneshot(post("/v1/guest/survey", serde_json::json!({"token": invite.token.as_str()})))
            .await
            .unwrap();
        assert_eq!(reload.status(), StatusCode::CONFLICT);
        assert_eq!(state.responses.len(), 1);
    }

    #[tokio::test]
    async fn invalid_answer_leaves_invite_pending() {
        let state = AppState::new();
        let invite = seed_invite(&state, Utc::now());
        let resp = app(&state)
            .oneshot(post(
                "/v1/guest/submit",
                serde_json::json!({"token": invite.token.as_str(), "answers": {"q1": 11}}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let stored = state.guest_invites.get(invite.id.as_uuid()).unwrap();
        assert_eq!(stored.status, pulse_state::InviteStatus::Pending);
    }
}
