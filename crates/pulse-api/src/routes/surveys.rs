//! # Surveys
//!
//! Company admins author surveys: a title, an ordered questionnaire, an
//! active flag and an optional start/end window. The status shown to
//! clients (`draft`, `scheduled`, `active`, `ended`, `inactive`) is derived
//! from the flag and window on every read.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use pulse_core::{Question, Questionnaire, SurveyId};
use pulse_state::{SurveySchedule, SurveyStatus};

use crate::auth::{require_company_admin, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, required_text, Validate};
use crate::routes::{fetch_scoped, normalize_optional};
use crate::state::{AppState, SurveyRecord};

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSurveyRequest {
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub questions: Vec<Question>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Validate for CreateSurveyRequest {
    fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)
    }
}

/// Partial update. `description`, `start_date` and `end_date` accept `null`
/// to clear.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSurveyRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "crate::routes::deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub questions: Option<Vec<Question>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "crate::routes::deserialize_some")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::routes::deserialize_some")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub end_date: Option<Option<DateTime<Utc>>>,
}

impl Validate for UpdateSurveyRequest {
    fn validate(&self) -> Result<(), String> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<(), String> {
    required_text(title, "title")?;
    if title.trim().chars().count() > MAX_TITLE_LEN {
        return Err(format!("title must be at most {MAX_TITLE_LEN} characters"));
    }
    Ok(())
}

/// A survey with its derived status.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub questions: Questionnaire,
    pub question_count: usize,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[schema(value_type = String, example = "active")]
    pub status: SurveyStatus,
    pub created_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub response_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurveyResponse {
    fn build(state: &AppState, s: &SurveyRecord, now: DateTime<Utc>) -> Self {
        let created_by_name = s
            .created_by
            .and_then(|p| state.profiles.get(p.as_uuid()))
            .map(|p| p.full_name());
        Self {
            id: *s.id.as_uuid(),
            title: s.title.clone(),
            description: s.description.clone(),
            questions: s.questions.clone(),
            question_count: s.questions.len(),
            is_active: s.is_active,
            start_date: s.start_date,
            end_date: s.end_date,
            status: SurveySchedule {
                is_active: s.is_active,
                start_date: s.start_date,
                end_date: s.end_date,
            }
            .status(now),
            created_by: s.created_by.map(|p| *p.as_uuid()),
            created_by_name,
            response_count: state.responses.filter(|r| r.survey_id == s.id).len(),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// What a respondent sees: the survey without admin metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SurveyContent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub questions: Questionnaire,
}

impl From<&SurveyRecord> for SurveyContent {
    fn from(s: &SurveyRecord) -> Self {
        Self {
            id: *s.id.as_uuid(),
            title: s.title.clone(),
            description: s.description.clone(),
            questions: s.questions.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SurveyFilter {
    /// Filter on the stored active flag.
    pub active: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/surveys", get(list_surveys).post(create_survey))
        .route("/v1/surveys/:id", get(get_survey).put(update_survey))
}

/// POST /v1/surveys: Create a survey.
#[utoipa::path(
    post,
    path = "/v1/surveys",
    request_body = CreateSurveyRequest,
    responses(
        (status = 201, description = "Survey created", body = SurveyResponse),
        (status = 422, description = "Invalid questions or window", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "surveys"
)]
async fn create_survey(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateSurveyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SurveyResponse>), AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_validated_json(body)?;
    let questions = Questionnaire::new(req.questions)?;
    SurveySchedule::new(req.is_active, req.start_date, req.end_date)?;

    let now = Utc::now();
    let record = SurveyRecord {
        id: SurveyId::new(),
        company_id,
        title: req.title.trim().to_string(),
        description: normalize_optional(req.description),
        questions,
        is_active: req.is_active,
        start_date: req.start_date,
        end_date: req.end_date,
        created_by: caller.profile_id,
        created_at: now,
        updated_at: now,
    };

    if let Some(pool) = &state.db_pool {
        crate::db::surveys::insert(pool, &record).await?;
    }
    state.surveys.insert(*record.id.as_uuid(), record.clone());

    tracing::info!(
        company_id = %company_id,
        survey_id = %record.id,
        questions = record.questions.len(),
        "survey created"
    );
    Ok((StatusCode::CREATED, Json(SurveyResponse::build(&state, &record, now))))
}

/// GET /v1/surveys: List surveys, newest first.
#[utoipa::path(
    get,
    path = "/v1/surveys",
    params(SurveyFilter),
    responses(
        (status = 200, description = "Surveys", body = Vec<SurveyResponse>),
    ),
    security(("bearer_auth" = [])),
    tag = "surveys"
)]
async fn list_surveys(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<SurveyFilter>, QueryRejection>,
) -> Result<Json<Vec<SurveyResponse>>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let filter = extract_query(query)?;
    let now = Utc::now();
    let mut surveys = state.surveys.filter(|s| {
        s.company_id == company_id && filter.active.map_or(true, |a| s.is_active == a)
    });
    surveys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(
        surveys
            .iter()
            .map(|s| SurveyResponse::build(&state, s, now))
            .collect(),
    ))
}

/// GET /v1/surveys/:id: Get one survey.
#[utoipa::path(
    get,
    path = "/v1/surveys/{id}",
    params(("id" = Uuid, Path, description = "Survey ID")),
    responses(
        (status = 200, description = "Survey", body = SurveyResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "surveys"
)]
async fn get_survey(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<SurveyResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let survey = fetch_scoped(&state.surveys, id, company_id, "survey")?;
    Ok(Json(SurveyResponse::build(&state, &survey, Utc::now())))
}

/// PUT /v1/surveys/:id: Update a survey.
#[utoipa::path(
    put,
    path = "/v1/surveys/{id}",
    params(("id" = Uuid, Path, description = "Survey ID")),
    request_body = UpdateSurveyRequest,
    responses(
        (status = 200, description = "Survey updated", body = SurveyResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid questions or window", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "surveys"
)]
async fn update_survey(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateSurveyRequest>, JsonRejection>,
) -> Result<Json<SurveyResponse>, AppError> {
    let company_id = require_company_admin(&caller)?;
    let req = extract_validated_json(body)?;
    let mut survey = fetch_scoped(&state.surveys, id, company_id, "survey")?;

    if let Some(title) = req.title {
        survey.title = title.trim().to_string();
    }
    if let Some(description) = req.description {
        survey.description = normalize_optional(description);
    }
    if let Some(questions) = req.questions {
        survey.questions = Questionnaire::new(questions)?;
    }
    if let Some(is_active) = req.is_active {
        survey.is_active = is_active;
    }
    if let Some(start_date) = req.start_date {
        survey.start_date = start_date;
    }
    if let Some(end_date) = req.end_date {
        survey.end_date = end_date;
    }
    survey.schedule()?;
    let now = Utc::now();
    survey.updated_at = now;

    if let Some(pool) = &state.db_pool {
        crate::db::surveys::update(pool, &survey).await?;
    }
    state.surveys.insert(*survey.id.as_uuid(), survey.clone());

    Ok(Json(SurveyResponse::build(&state, &survey, now)))
}
