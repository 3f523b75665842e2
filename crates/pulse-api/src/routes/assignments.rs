//! # Employee Assignments
//!
//! Company admins send a survey to employees; each employee then submits
//! answers against their own assignment. Submission completes the
//! assignment and records the response as one step: with a database the
//! status flip and the insert share a transaction, in memory the flip runs
//! under the store's write lock. A second submission of the same
//! assignment is a 409.

use std::collections::HashSet;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use pulse_core::{AnswerSet, ProfileId, QaResponses, ResponseId};
use pulse_mail::templates;
use pulse_state::{Assignment, AssignmentError, AssignmentStatus, SurveyStatus};

use crate::auth::{require_company_admin, CallerIdentity};
use crate::db::responses::Submission;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::routes::fetch_scoped;
use crate::state::{AppState, ProfileRecord, ResponseRecord};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignSurveyRequest {
    pub profile_ids: Vec<Uuid>,
}

impl Validate for AssignSurveyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.profile_ids.is_empty() {
            return Err("profile_ids must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub profile_id: Uuid,
    #[schema(value_type = String, example = "pending")]
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Assignment> for AssignmentResponse {
    fn from(a: &Assignment) -> Self {
        Self {
            id: *a.id.as_uuid(),
            survey_id: *a.survey_id.as_uuid(),
            profile_id: *a.profile_id.as_uuid(),
            status: a.status,
            created_at: a.created_at,
            completed_at: a.completed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignSurveyResponse {
    pub assigned: Vec<AssignmentResponse>,
    /// Profiles that already had a pending assignment for this survey.
    pub skipped: Vec<Uuid>,
    /// How many notification emails were delivered.
    pub notified: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswersRequest {
    /// Answers keyed by question id.
    #[schema(value_type = Object)]
    pub answers: AnswerSet,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitAnswersResponse {
    pub success: bool,
    pub message: String,
    pub response_id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/surveys/:id/assignments", post(assign_survey))
        .route("/v1/assignments/:id/submit", post(submit_assignment))
}

/// POST /v1/surveys/:id/assignments: Send a survey to employees.
#[utoipa::path(
    post,
    path = "/v1/surveys/{id}/assignments",
    params(("id" = Uuid, Path, description = "Survey ID")),
    request_body = AssignSurveyRequest,
    responses(
        (status = 201, description = "Assignments created", body = AssignSurveyResponse),
        (status = 404, description = "Survey or employee not found", body = crate::error::ErrorBody),
        (status = 409, description = "Survey is not accepting responses", body = crate::error::ErrorBody),
        (status = 422, description = "Employee is inactive", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
async fn assign_survey(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(survey_id): Path<Uuid>,
    body: Result<Json<AssignSurveyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AssignSurveyResponse>), AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_validated_json(body)?;
    let survey = fetch_scoped(&state.surveys, survey_id, company_id, "survey")?;

    let now = Utc::now();
    match survey.schedule()?.status(now) {
        SurveyStatus::Inactive => {
            return Err(AppError::Conflict(format!("survey {survey_id} is inactive")))
        }
        SurveyStatus::Ended => {
            return Err(AppError::Conflict(format!("survey {survey_id} has ended")))
        }
        _ => {}
    }

    let mut seen = HashSet::new();
    let mut targets: Vec<ProfileRecord> = Vec::new();
    for id in req.profile_ids.into_iter().filter(|id| seen.insert(*id)) {
        let profile = fetch_scoped(&state.profiles, id, company_id, "employee")?;
        if !profile.is_active {
            return Err(AppError::Validation(format!("employee {id} is inactive")));
        }
        targets.push(profile);
    }

    let has_pending = |profile: ProfileId| {
        move |a: &Assignment| a.survey_id == survey.id && a.profile_id == profile && a.is_pending()
    };
    let (skipped, fresh): (Vec<_>, Vec<_>) = targets
        .into_iter()
        .partition(|p| state.assignments.find(has_pending(p.id)).is_some());
    let mut skipped: Vec<Uuid> = skipped.iter().map(|p| *p.id.as_uuid()).collect();

    let pairs: Vec<(ProfileRecord, Assignment)> = fresh
        .into_iter()
        .map(|p| {
            let assignment = Assignment::new(survey.id, p.id, company_id, now);
            (p, assignment)
        })
        .collect();

    if let Some(pool) = &state.db_pool {
        let rows: Vec<Assignment> = pairs.iter().map(|(_, a)| a.clone()).collect();
        crate::db::assignments::insert_many(pool, &rows).await?;
    }

    let mut assigned = Vec::with_capacity(pairs.len());
    let mut notified = 0;
    for (profile, assignment) in pairs {
        if !state.assignments.insert_unique(
            *assignment.id.as_uuid(),
            assignment.clone(),
            has_pending(profile.id),
        ) {
            skipped.push(*profile.id.as_uuid());
            continue;
        }

        let message = templates::survey_assigned(
            &profile.email,
            &profile.first_name,
            &survey.title,
            &state.config.dashboard_url(),
        );
        match state.mailer.send(&message).await {
            Ok(()) => notified += 1,
            Err(e) => tracing::warn!(
                assignment_id = %assignment.id,
                profile_id = %profile.id,
                error = %e,
                "assignment notification failed"
            ),
        }
        assigned.push(AssignmentResponse::from(&assignment));
    }

    tracing::info!(
        company_id = %company_id,
        survey_id = %survey.id,
        assigned = assigned.len(),
        skipped = skipped.len(),
        notified,
        "survey assigned"
    );

    Ok((
        StatusCode::CREATED,
        Json(AssignSurveyResponse {
            assigned,
            skipped,
            notified,
        }),
    ))
}

/// POST /v1/assignments/:id/submit: Submit answers for one's own assignment.
#[utoipa::path(
    post,
    path = "/v1/assignments/{id}/submit",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = SubmitAnswersRequest,
    responses(
        (status = 201, description = "Response recorded", body = SubmitAnswersResponse),
        (status = 404, description = "Not the caller's assignment", body = crate::error::ErrorBody),
        (status = 409, description = "Already submitted", body = crate::error::ErrorBody),
        (status = 422, description = "Answers do not fit the survey", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
async fn submit_assignment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<SubmitAnswersRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitAnswersResponse>), AppError> {
    let company_id = caller.require_tenant()?;
    let profile_id = caller.profile()?;
    let req = extract_json(body)?;

    let not_found = || AppError::NotFound(format!("assignment {id} not found"));
    let assignment = state
        .assignments
        .get_scoped(&id, company_id)
        .filter(|a| a.profile_id == profile_id)
        .ok_or_else(not_found)?;
    if !assignment.is_pending() {
        return Err(AssignmentError::AlreadyCompleted.into());
    }

    let survey = fetch_scoped(&state.surveys, *assignment.survey_id.as_uuid(), company_id, "survey")?;
    let profile = fetch_scoped(&state.profiles, *profile_id.as_uuid(), company_id, "profile")?;
    let responses = survey.questions.grade(&req.answers)?;

    let now = Utc::now();
    let record = ResponseRecord {
        id: ResponseId::new(),
        survey_id: survey.id,
        company_id,
        team_id: profile.team_id,
        profile_id: Some(profile_id),
        assignment_id: Some(assignment.id),
        guest_invite_id: None,
        qa_responses: QaResponses {
            email: profile.email.clone(),
            responses,
        },
        submitted_at: now,
    };

    if let Some(pool) = &state.db_pool {
        let outcome =
            crate::db::responses::submit_for_assignment(pool, assignment.id, profile_id, &record)
                .await?;
        if outcome == Submission::Rejected {
            return Err(AssignmentError::AlreadyCompleted.into());
        }
    }
    state
        .assignments
        .try_update(&id, |a| a.complete(now))
        .ok_or_else(not_found)??;
    state.responses.insert(*record.id.as_uuid(), record.clone());

    tracing::info!(
        company_id = %company_id,
        assignment_id = %assignment.id,
        response_id = %record.id,
        "assignment submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitAnswersResponse {
            success: true,
            message: "Survey submitted successfully".into(),
            response_id: *record.id.as_uuid(),
        }),
    ))
}
