//! Per-request metrics middleware.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use taskmeter_core::registry::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_MS};
use taskmeter_core::{now_ms, MetricsRegistry};

use super::report;
use crate::app_state::AppState;

/// Set by the upstream session provider once a user is authenticated.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Route label for requests that matched no route (keeps cardinality bounded).
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Count, time and attribute every request.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let started = Instant::now();

    let method = req.method().as_str().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());
    let user = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_owned);

    let resp = next.run(req).await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    record_request(
        state.metrics(),
        &method,
        &route,
        resp.status().as_u16(),
        elapsed_ms,
        user.as_deref(),
    );
    resp
}

/// Record one finished request. Errors are logged, never returned.
pub fn record_request(
    metrics: &MetricsRegistry,
    method: &str,
    route: &str,
    status: u16,
    elapsed_ms: u64,
    user: Option<&str>,
) {
    let status = status.to_string();
    report(
        metrics.increment_counter(
            HTTP_REQUESTS_TOTAL,
            &[("method", method), ("route", route), ("status_code", status.as_str())],
        ),
        HTTP_REQUESTS_TOTAL,
    );
    report(
        metrics.observe_histogram(
            HTTP_REQUEST_DURATION_MS,
            &[("method", method), ("route", route)],
            elapsed_ms,
        ),
        HTTP_REQUEST_DURATION_MS,
    );
    if let Some(user) = user {
        metrics.mark_active(user, now_ms());
    }
    tracing::trace!(method, route, status = %status, elapsed_ms, "request recorded");
}
