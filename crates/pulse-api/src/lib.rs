//! # pulse-api: Axum API Service for Pulse
//!
//! Multi-tenant employee surveys. Companies are tenants; each has
//! departments, teams and employee profiles. Company admins author surveys
//! and send them either to employees (assignments) or to outside guests
//! through emailed, expiring links.
//!
//! ## API Surface
//!
//! | Prefix                 | Module                        | Auth            |
//! |------------------------|-------------------------------|-----------------|
//! | `/v1/companies`        | [`routes::companies`]         | platform admin  |
//! | `/v1/me/*`             | [`routes::me`]                | any tenant user |
//! | `/v1/departments/*`    | [`routes::departments`]       | company admin   |
//! | `/v1/employees/*`      | [`routes::employees`]         | company admin   |
//! | `/v1/teams/*`          | [`routes::teams`]             | company admin   |
//! | `/v1/surveys/*`        | [`routes::surveys`], [`routes::assignments`], [`routes::responses`] | company admin |
//! | `/v1/assignments/*`    | [`routes::assignments`]       | assignee        |
//! | `/v1/guest-invites`    | [`routes::guest_invites`]     | company admin   |
//! | `/v1/guest/*`          | [`routes::guest`]             | link token      |
//! | `/v1/diagnostics`      | [`routes::diagnostics`]       | company admin   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CORS → body limit → TraceLayer → Metrics → Auth → RateLimit → Handler
//! ```
//!
//! Guest routes skip Auth; health probes and `/metrics` skip everything but
//! CORS.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::middleware::metrics::{metrics_middleware, ApiMetrics};
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Request bodies above this size are rejected with 413.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::companies::router())
        .merge(routes::me::router())
        .merge(routes::departments::router())
        .merge(routes::employees::router())
        .merge(routes::teams::router())
        .merge(routes::surveys::router())
        .merge(routes::assignments::router())
        .merge(routes::guest_invites::router())
        .merge(routes::responses::router())
        .merge(routes::diagnostics::router())
        .merge(openapi::router())
        .layer(from_fn(rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(auth_config))
        .layer(Extension(metrics.clone()))
        .layer(Extension(limiter.clone()));

    // Guest routes: the link token authenticates, not the bearer header.
    let guest = routes::guest::router()
        .layer(from_fn(rate_limit_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(metrics.clone()))
        .layer(Extension(limiter));

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus))
        .layer(Extension(metrics));

    Router::new()
        .merge(ops)
        .merge(guest)
        .merge(api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(auth::COMPANY_HEADER),
        ])
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 when a configured database does not answer.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    if let Some(pool) = &state.db_pool {
        db::ping(pool)
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("database unreachable: {e}")))?;
    }
    Ok("ready")
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let pending_invites = state
        .guest_invites
        .filter(|i| i.effective_status(now) == pulse_state::EffectiveInviteStatus::Pending)
        .len();
    let pending_assignments = state.assignments.filter(|a| a.is_pending()).len();
    let gauges = [
        ("pulse_companies", "Companies", state.companies.len()),
        ("pulse_profiles", "Employee profiles", state.profiles.len()),
        ("pulse_surveys", "Surveys", state.surveys.len()),
        ("pulse_assignments_pending", "Assignments awaiting a response", pending_assignments),
        ("pulse_guest_invites_pending", "Guest invites not yet answered or expired", pending_invites),
        ("pulse_responses", "Recorded survey responses", state.responses.len()),
    ];
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        metrics.render(&gauges),
    )
}
