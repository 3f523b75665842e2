//! # Request Metrics
//!
//! In-process request and error counters, rendered as Prometheus text by
//! the `/metrics` handler together with store gauges.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return current request count.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Return current error count (4xx and 5xx).
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Render counters plus the given gauges in Prometheus text format.
    pub fn render(&self, gauges: &[(&str, &str, usize)]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# HELP pulse_http_requests_total Total HTTP requests");
        let _ = writeln!(out, "# TYPE pulse_http_requests_total counter");
        let _ = writeln!(out, "pulse_http_requests_total {}", self.requests());
        let _ = writeln!(out, "# HELP pulse_http_errors_total Total HTTP errors (4xx and 5xx)");
        let _ = writeln!(out, "# TYPE pulse_http_errors_total counter");
        let _ = writeln!(out, "pulse_http_errors_total {}", self.errors());
        for (name, help, value) in gauges {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} gauge");
            let _ = writeln!(out, "{name} {value}");
        }
        out
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        if response.status().is_server_error() || response.status().is_client_error() {
            m.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}
