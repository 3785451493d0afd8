//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 when draining)
//! - `/metrics` : Prometheus text format, bearer-token gated, never cached

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use subtle::ConstantTimeEq;
use taskmeter_core::error::{MeterError, Result};

use crate::app_state::AppState;
use crate::error::ApiError;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authorize(&headers, &state.cfg().metrics.token) {
        tracing::warn!(error = %e, "metrics scrape rejected");
        return ApiError(e).into_response();
    }

    let expo = state.metrics().render_exposition();
    if expo.is_total_failure() {
        tracing::error!(failed = expo.failed, "no metric could be rendered");
        return ApiError(MeterError::Exposition("no metric could be rendered".into())).into_response();
    }
    if expo.failed > 0 || expo.failed_series > 0 {
        tracing::warn!(
            failed = expo.failed,
            failed_series = expo.failed_series,
            rendered = expo.rendered,
            "partial exposition served"
        );
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, taskmeter_core::CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        expo.body,
    )
        .into_response()
}

/// Check `Authorization: Bearer <secret>`. An empty secret admits nobody.
pub fn authorize(headers: &HeaderMap, secret: &str) -> Result<()> {
    if secret.is_empty() {
        return Err(MeterError::AuthFailed);
    }
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim());

    match presented {
        Some(token) if bool::from(token.as_bytes().ct_eq(secret.as_bytes())) => Ok(()),
        _ => Err(MeterError::AuthFailed),
    }
}
