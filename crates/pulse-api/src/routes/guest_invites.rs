//! # Guest Invites
//!
//! A company admin invites someone outside the company to answer one survey
//! on behalf of a team. The invite's token travels only in the emailed
//! link; no API response ever contains it. When the email cannot be
//! delivered the invite is withdrawn, since nobody could redeem it.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use pulse_core::EmailAddress;
use pulse_mail::templates;
use pulse_state::{EffectiveInviteStatus, GuestInvite, NewGuestInvite, SurveyStatus};

use crate::auth::{require_company_admin, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::routes::fetch_scoped;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGuestInviteRequest {
    pub survey_id: Uuid,
    pub team_id: Uuid,
    pub guest_email: String,
}

/// An invite as shown to admins. Deliberately has no token field.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GuestInviteResponse {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub team_id: Uuid,
    pub guest_email: String,
    #[schema(value_type = String, example = "pending")]
    pub status: EffectiveInviteStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GuestInviteResponse {
    fn at(invite: &GuestInvite, now: DateTime<Utc>) -> Self {
        Self {
            id: *invite.id.as_uuid(),
            survey_id: *invite.survey_id.as_uuid(),
            team_id: *invite.team_id.as_uuid(),
            guest_email: invite.guest_email.as_str().to_string(),
            status: invite.effective_status(now),
            created_at: invite.created_at,
            expires_at: invite.expires_at,
            completed_at: invite.completed_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct GuestInviteFilter {
    pub survey_id: Option<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/guest-invites", get(list_invites).post(create_invite))
}

/// POST /v1/guest-invites: Email a survey link to a guest.
#[utoipa::path(
    post,
    path = "/v1/guest-invites",
    request_body = CreateGuestInviteRequest,
    responses(
        (status = 201, description = "Invite sent", body = GuestInviteResponse),
        (status = 404, description = "Survey or team not found", body = crate::error::ErrorBody),
        (status = 409, description = "Survey is not accepting responses", body = crate::error::ErrorBody),
        (status = 502, description = "Email could not be delivered", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "guest-invites"
)]
async fn create_invite(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateGuestInviteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GuestInviteResponse>), AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_json(body)?;
    let guest_email = EmailAddress::parse(&req.guest_email)?;
    let survey = fetch_scoped(&state.surveys, req.survey_id, company_id, "survey")?;
    let team = fetch_scoped(&state.teams, req.team_id, company_id, "team")?;

    let now = Utc::now();
    if matches!(
        survey.schedule()?.status(now),
        SurveyStatus::Inactive | SurveyStatus::Ended
    ) {
        return Err(AppError::Conflict(format!(
            "survey {} is not accepting responses",
            survey.id
        )));
    }

    let invite = GuestInvite::issue(
        NewGuestInvite {
            guest_email,
            survey_id: survey.id,
            team_id: team.id,
            company_id,
            created_by: caller.profile_id,
        },
        now,
        state.config.invite_ttl(),
    );

    if let Some(pool) = &state.db_pool {
        crate::db::guest_invites::insert(pool, &invite).await?;
    }
    state.guest_invites.insert(*invite.id.as_uuid(), invite.clone());

    let message = templates::guest_invite(
        &invite.guest_email,
        &state.config.guest_link(&invite.token),
        state.config.guest_invite_ttl_hours,
    );
    if let Err(e) = state.mailer.send(&message).await {
        state.guest_invites.remove(invite.id.as_uuid());
        if let Some(pool) = &state.db_pool {
            if let Err(db_err) = crate::db::guest_invites::delete(pool, invite.id).await {
                tracing::error!(invite_id = %invite.id, error = %db_err, "failed to withdraw undelivered invite");
            }
        }
        return Err(e.into());
    }

    tracing::info!(
        company_id = %company_id,
        invite_id = %invite.id,
        survey_id = %invite.survey_id,
        "guest invite sent"
    );
    Ok((StatusCode::CREATED, Json(GuestInviteResponse::at(&invite, now))))
}

/// GET /v1/guest-invites: List invites with their current status.
#[utoipa::path(
    get,
    path = "/v1/guest-invites",
    params(GuestInviteFilter),
    responses(
        (status = 200, description = "Invites, newest first", body = Vec<GuestInviteResponse>),
    ),
    security(("bearer_auth" = [])),
    tag = "guest-invites"
)]
async fn list_invites(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<GuestInviteFilter>, QueryRejection>,
) -> Result<Json<Vec<GuestInviteResponse>>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let filter = extract_query(query)?;
    let now = Utc::now();
    let mut invites = state.guest_invites.filter(|i| {
        i.company_id == company_id
            && filter.survey_id.map_or(true, |s| *i.survey_id.as_uuid() == s)
    });
    invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(
        invites
            .iter()
            .map(|i| GuestInviteResponse::at(i, now))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, profile, seed_company};
    use crate::state::{SurveyRecord, TeamRecord};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use pulse_core::{CompanyId, Questionnaire, Role, SurveyId, TeamId};
    use pulse_mail::Outbox;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Fixture {
        state: AppState,
        outbox: Outbox,
        admin: CallerIdentity,
        survey: SurveyRecord,
        team: TeamRecord,
    }

    fn fixture() -> Fixture {
        let outbox = Outbox::new();
        let state = AppState::with_config(Default::default(), Arc::new(outbox.clone()), None);
        let (company_id, admin) = seed_company(&state, "Acme");
        let survey = survey(&state, company_id);
        let manager = profile(&state, company_id, "lead@acme.test", Role::Employee);
        let now = Utc::now();
        let team = TeamRecord {
            id: TeamId::new(),
            company_id,
            name: "Platform".into(),
            description: None,
            department_id: None,
            manager_id: Some(manager.id),
            created_at: now,
            updated_at: now,
        };
        state.teams.insert(*team.id.as_uuid(), team.clone());
        Fixture {
            state,
            outbox,
            admin,
            survey,
            team,
        }
    }

    fn survey(state: &AppState, company_id: CompanyId) -> SurveyRecord {
        let now = Utc::now();
        let questions: Questionnaire = serde_json::from_value(serde_json::json!([
            {"id": "q1", "text": "Would you recommend the team?", "type": "yes_no"}
        ]))
        .unwrap();
        let record = SurveyRecord {
            id: SurveyId::new(),
            company_id,
            title: "Partner feedback".into(),
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

    fn test_app(state: AppState, identity: CallerIdentity) -> Router {
        router().layer(axum::Extension(identity)).with_state(state)
    }

    fn create_request(f: &Fixture, email: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/guest-invites")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "survey_id": f.survey.id,
                    "team_id": f.team.id,
                    "guest_email": email
                })
                .to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn create_emails_link_without_exposing_token() {
        let f = fixture();
        let resp = test_app(f.state.clone(), f.admin.clone())
            .oneshot(create_request(&f, "guest@partner.test"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let raw: serde_json::Value = body_json(resp).await;
        assert!(raw.get("token").is_none());
        assert_eq!(raw["status"], "pending");

        let invite = f.state.guest_invites.list().pop().unwrap();
        let expected_ttl = Duration::hours(f.state.config.guest_invite_ttl_hours);
        assert_eq!(invite.expires_at - invite.created_at, expected_ttl);

        let sent = f.outbox.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0]
            .html
            .contains(&format!("/survey/guest/{}", invite.token.as_str())));
        assert!(sent[0].html.contains("7 days"));
    }

    #[tokio::test]
    async fn mail_failure_withdraws_invite() {
        let f = fixture();
        f.outbox.set_failing(true);
        let resp = test_app(f.state.clone(), f.admin.clone())
            .oneshot(create_request(&f, "guest@partner.test"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(f.state.guest_invites.is_empty());
    }

    #[tokio::test]
    async fn invalid_email_is_422() {
        let f = fixture();
        let resp = test_app(f.state.clone(), f.admin.clone())
            .oneshot(create_request(&f, "not-an-email"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn other_tenant_admin_cannot_use_survey() {
        let f = fixture();
        let (_, outsider) = seed_company(&f.state, "Globex");
        let resp = test_app(f.state.clone(), outsider)
            .oneshot(create_request(&f, "guest@partner.test"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(f.outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn list_reports_expired_status() {
        let f = fixture();
        let past = Utc::now() - Duration::days(10);
        let invite = GuestInvite::issue(
            NewGuestInvite {
                guest_email: EmailAddress::parse("late@partner.test").unwrap(),
                survey_id: f.survey.id,
                team_id: f.team.id,
                company_id: f.survey.company_id,
                created_by: None,
            },
            past,
            Duration::days(7),
        );
        f.state.guest_invites.insert(*invite.id.as_uuid(), invite);

        let req = Request::builder()
            .uri(format!("/v1/guest-invites?survey_id={}", f.survey.id))
            .body(Body::empty())
            .unwrap();
        let list: Vec<GuestInviteResponse> =
            body_json(test_app(f.state.clone(), f.admin.clone()).oneshot(req).await.unwrap()).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].status, EffectiveInviteStatus::Expired);
    }
}
