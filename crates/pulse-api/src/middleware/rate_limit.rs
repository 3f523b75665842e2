//! # Per-Tenant Rate Limiting
//!
//! Fixed-window request limiter keyed by the caller's company. Callers
//! without a company share the `platform` bucket; unauthenticated guest
//! routes share the `guest` bucket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::auth::CallerIdentity;
use crate::error::{ErrorBody, ErrorDetail};

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, BucketState>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a request against `key`; `false` when the window is exhausted.
    fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();

        let bucket = buckets.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start).as_secs() >= self.config.window_secs {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }
}

fn bucket_key(request: &Request) -> String {
    match request.extensions().get::<CallerIdentity>() {
        Some(CallerIdentity {
            company_id: Some(company),
            ..
        }) => company.to_string(),
        Some(_) => "platform".to_string(),
        None => "guest".to_string(),
    }
}

/// Middleware that enforces per-tenant rate limits.
///
/// Must run inside the auth middleware so the caller identity is known.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = bucket_key(&request);
        if !limiter.check(&key) {
            tracing::warn!(bucket = %key, "rate limit exceeded");
            let body = ErrorBody {
                error: ErrorDetail {
                    code: "RATE_LIMITED".to_string(),
                    message: "rate limit exceeded".to_string(),
                    details: None,
                },
            };
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use pulse_core::{CompanyId, Role};
    use tower::ServiceExt;

    fn limiter(max_requests: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_secs: 60,
        })
    }

    #[test]
    fn check_enforces_limit_per_key() {
        let limiter = limiter(2);
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn zero_window_resets_immediately() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window_secs: 0,
        });
        assert!(limiter.check("k"));
        assert!(limiter.check("k"));
    }

    #[tokio::test]
    async fn middleware_returns_429_per_tenant() {
        let limiter = limiter(1);
        let tenant = CallerIdentity {
            role: Role::CompanyAdmin,
            company_id: Some(CompanyId::new()),
            profile_id: None,
        };
        let app = |identity: CallerIdentity| {
            Router::new()
                .route("/", get(|| async { "ok" }))
                .layer(from_fn(rate_limit_middleware))
                .layer(axum::Extension(identity))
                .layer(axum::Extension(limiter.clone()))
        };
        let req = || Request::builder().uri("/").body(Body::empty()).unwrap();

        let first = app(tenant.clone()).oneshot(req()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app(tenant).oneshot(req()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app(CallerIdentity::platform_admin()).oneshot(req()).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }
}
