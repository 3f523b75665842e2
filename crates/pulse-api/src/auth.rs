//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based, tenant-scoped access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{company_id}:{profile_id}:{secret}   tenant-bound caller
//! Bearer {secret}                                    platform admin
//! ```
//!
//! `company_id` and `profile_id` may be empty for platform admins. Company
//! admins must name a company. Employees must name both.
//!
//! A platform admin may act inside one tenant by sending `X-Company-Id`.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] in its extensions.
//! Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

use pulse_core::{CompanyId, ProfileId, Role};

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Header a platform admin uses to act within one company.
pub const COMPANY_HEADER: &str = "x-company-id";

// ── Secret ──────────────────────────────────────────────────────────────────

/// The shared bearer secret. Zeroed on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct SecretToken(Zeroizing<String>);

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// The tenant the caller acts in. `None` for an unscoped platform admin.
    pub company_id: Option<CompanyId>,
    /// The caller's own profile, when they have one.
    pub profile_id: Option<ProfileId>,
}

impl CallerIdentity {
    /// Unscoped platform admin, used when auth is disabled.
    pub fn platform_admin() -> Self {
        Self {
            role: Role::PlatformAdmin,
            company_id: None,
            profile_id: None,
        }
    }

    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// The caller's company, or 403 when the caller is not bound to one.
    pub fn require_tenant(&self) -> Result<CompanyId, AppError> {
        self.company_id.ok_or_else(|| {
            AppError::Forbidden(format!(
                "caller is not bound to a company; send {COMPANY_HEADER} to act within one"
            ))
        })
    }

    /// The caller's own profile id, or 403.
    pub fn profile(&self) -> Result<ProfileId, AppError> {
        self.profile_id
            .ok_or_else(|| AppError::Forbidden("caller has no profile".into()))
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// 403 unless the caller has at least `minimum`.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

/// Company admin (or a platform admin acting in a tenant): return the tenant.
pub fn require_company_admin(caller: &CallerIdentity) -> Result<CompanyId, AppError> {
    require_role(caller, Role::CompanyAdmin)?;
    caller.require_tenant()
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub token: Option<SecretToken>,
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

fn parse_optional_uuid(raw: &str, field: &str) -> Result<Option<Uuid>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<Uuid>()
        .map(Some)
        .map_err(|e| format!("invalid {field}: {e}"))
}

/// Parse a bearer token in `{role}:{company_id}:{profile_id}:{secret}` or
/// `{secret}` format.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(4, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::platform_admin())
            } else {
                Err("invalid bearer token".into())
            }
        }
        [role, company, profile, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }

            let role = Role::from_name(role).map_err(|e| e.to_string())?;
            let company_id = parse_optional_uuid(company, "company_id")?.map(CompanyId::from_uuid);
            let profile_id = parse_optional_uuid(profile, "profile_id")?.map(ProfileId::from_uuid);

            if role < Role::PlatformAdmin && company_id.is_none() {
                return Err(format!("role '{}' requires a company_id", role.as_str()));
            }
            if role == Role::Employee && profile_id.is_none() {
                return Err("role 'employee' requires a profile_id".into());
            }

            Ok(CallerIdentity {
                role,
                company_id,
                profile_id,
            })
        }
        _ => Err(
            "invalid token format: expected {role}:{company_id}:{profile_id}:{secret} or {secret}"
                .into(),
        ),
    }
}

/// Apply `X-Company-Id` for platform admins. Ignored for other roles.
fn apply_company_header(identity: &mut CallerIdentity, headers: &HeaderMap) -> Result<(), String> {
    if identity.role != Role::PlatformAdmin {
        return Ok(());
    }
    if let Some(value) = headers.get(COMPANY_HEADER) {
        let raw = value
            .to_str()
            .map_err(|_| format!("{COMPANY_HEADER} is not valid text"))?;
        let id = raw
            .trim()
            .parse::<Uuid>()
            .map_err(|e| format!("invalid {COMPANY_HEADER}: {e}"))?;
        identity.company_id = Some(CompanyId::from_uuid(id));
    }
    Ok(())
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the bearer token and inject a [`CallerIdentity`].
///
/// When `AuthConfig.token` is `None`, every request is an unscoped platform
/// admin (development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    let identity = match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(value) if value.starts_with("Bearer ") => {
                    match parse_bearer_token(&value[7..], expected.expose()) {
                        Ok(identity) => identity,
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            return unauthorized_response(&msg);
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    return unauthorized_response("authorization header must use Bearer scheme");
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    return unauthorized_response("missing authorization header");
                }
            }
        }
        _ => CallerIdentity::platform_admin(),
    };

    let mut identity = identity;
    if let Err(msg) = apply_company_header(&mut identity, request.headers()) {
        tracing::warn!(reason = %msg, "authentication failed: bad tenant header");
        return unauthorized_response(&msg);
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const COMPANY: &str = "550e8400-e29b-41d4-a716-446655440000";
    const PROFILE: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

    /// Echo the caller's role and company so tests can see what was injected.
    fn test_app(token: Option<&str>) -> Router {
        let auth_config = AuthConfig {
            token: token.map(SecretToken::new),
        };
        Router::new()
            .route(
                "/test",
                get(|caller: CallerIdentity| async move {
                    format!(
                        "{}|{}",
                        caller.role.as_str(),
                        caller.company_id.map(|c| c.to_string()).unwrap_or_default()
                    )
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    async fn call(app: Router, auth: Option<&str>, company_header: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/test");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        if let Some(company) = company_header {
            builder = builder.header(COMPANY_HEADER, company);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn legacy_secret_is_platform_admin() {
        let (status, body) = call(test_app(Some("s3cret")), Some("Bearer s3cret"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "platform_admin|");
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let (status, body) = call(test_app(Some("s3cret")), None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("missing"));
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let (status, _) = call(test_app(Some("s3cret")), Some("Bearer nope"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let (status, body) = call(test_app(Some("s3cret")), Some("Basic dXNlcjpwYXNz"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn tenant_token_binds_company() {
        let token = format!("Bearer company_admin:{COMPANY}::s3cret");
        let (status, body) = call(test_app(Some("s3cret")), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("company_admin|{COMPANY}"));
    }

    #[tokio::test]
    async fn company_header_scopes_platform_admin_only() {
        let (_, body) = call(test_app(Some("s3cret")), Some("Bearer s3cret"), Some(COMPANY)).await;
        assert_eq!(body, format!("platform_admin|{COMPANY}"));

        let other = "7c9e6679-7425-40de-944b-e07fc1f90ae7";
        let token = format!("Bearer company_admin:{COMPANY}::s3cret");
        let (_, body) = call(test_app(Some("s3cret")), Some(&token), Some(other)).await;
        assert_eq!(body, format!("company_admin|{COMPANY}"));
    }

    #[tokio::test]
    async fn malformed_company_header_rejected() {
        let (status, _) = call(test_app(Some("s3cret")), Some("Bearer s3cret"), Some("acme")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_disabled_injects_platform_admin() {
        let (status, body) = call(test_app(None), Some("Bearer anything"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "platform_admin|");
    }

    #[test]
    fn parse_employee_token() {
        let identity =
            parse_bearer_token(&format!("employee:{COMPANY}:{PROFILE}:s3cret"), "s3cret").unwrap();
        assert_eq!(identity.role, Role::Employee);
        assert_eq!(identity.company_id.unwrap().to_string(), COMPANY);
        assert_eq!(identity.profile_id.unwrap().to_string(), PROFILE);
    }

    #[test]
    fn parse_rejects_unbound_tenant_roles() {
        assert!(parse_bearer_token("company_admin:::s3cret", "s3cret").is_err());
        let err = parse_bearer_token(&format!("employee:{COMPANY}::s3cret"), "s3cret").unwrap_err();
        assert!(err.contains("profile_id"));
    }

    #[test]
    fn parse_rejects_bad_parts() {
        assert!(parse_bearer_token("superuser:::s3cret", "s3cret")
            .unwrap_err()
            .contains("unknown role"));
        assert!(parse_bearer_token("employee:not-a-uuid::s3cret", "s3cret")
            .unwrap_err()
            .contains("company_id"));
        assert!(parse_bearer_token("role:secret", "secret").is_err());
        assert!(parse_bearer_token("platform_admin:::wrong", "s3cret").is_err());
    }

    #[test]
    fn constant_time_eq_cases() {
        assert!(constant_time_token_eq("secret-token", "secret-token"));
        assert!(!constant_time_token_eq("secret", "secret-token"));
        assert!(!constant_time_token_eq("", "secret-token"));
    }

    #[test]
    fn require_role_and_tenant() {
        let employee = CallerIdentity {
            role: Role::Employee,
            company_id: Some(CompanyId::new()),
            profile_id: Some(ProfileId::new()),
        };
        assert!(require_role(&employee, Role::Employee).is_ok());
        assert!(require_company_admin(&employee).is_err());

        let unscoped = CallerIdentity::platform_admin();
        assert!(require_role(&unscoped, Role::CompanyAdmin).is_ok());
        assert!(matches!(require_company_admin(&unscoped), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let debug = format!("{:?}", AuthConfig { token: Some(SecretToken::new("hunter2")) });
        assert!(!debug.contains("hunter2"));
    }
}
