//! Axum router wiring.
//!
//! Ops routes plus whatever application routes the host merges in; every
//! route passes through the request-tracking middleware.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    build_router_with(state, Router::new())
}

/// `api` carries the host application's routes.
pub fn build_router_with(state: AppState, api: Router<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .merge(api)
        .layer(middleware::from_fn_with_state(state.clone(), obs::track_requests))
        .with_state(state)
}
