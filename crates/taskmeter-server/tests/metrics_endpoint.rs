//! `/metrics` auth, headers and body.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use common::{get, scrape, state, state_with, text, TOKEN};
use taskmeter_server::router::build_router;

#[tokio::test]
async fn missing_or_wrong_token_is_unauthorized() {
    let app = build_router(state());

    for req in [scrape(None), scrape(Some("wrong"))] {
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()["www-authenticate"], "Bearer");
        let body = text(resp).await;
        assert!(body.contains("AUTH_FAILED"));
        assert!(!body.contains("# TYPE"));
    }
}

#[tokio::test]
async fn empty_secret_admits_nobody() {
    let st = state();
    let mut cfg = st.cfg().clone();
    cfg.metrics.token.clear();
    let app = build_router(taskmeter_server::app_state::AppState::new(cfg).unwrap());

    let resp = app.oneshot(scrape(Some(""))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authorized_scrape_is_fresh_prometheus_text() {
    let app = build_router(state());

    let resp = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(scrape(Some(TOKEN))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let h = resp.headers();
    assert_eq!(h["content-type"], "text/plain; version=0.0.4; charset=utf-8");
    assert!(h["cache-control"].to_str().unwrap().contains("no-store"));
    assert_eq!(h["pragma"], "no-cache");
    assert_eq!(h["expires"], "0");

    let body = text(resp).await;
    assert!(body.contains("# TYPE http_requests_total counter\n"));
    assert!(body.contains(r#"http_requests_total{method="GET",route="/healthz",status_code="200"} 1"#));
    assert!(body.contains(r#"http_request_duration_ms_bucket{method="GET",route="/healthz",le="+Inf"} 1"#));
    assert!(body.ends_with('\n') && !body.ends_with("\n\n"));
}

#[tokio::test]
async fn disabled_collection_still_serves_exposition() {
    let app = build_router(state_with("  enabled: false\n"));

    let resp = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(scrape(Some(TOKEN))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = text(resp).await;
    assert!(body.contains("# HELP http_requests_total"));
    assert!(!body.contains("route=\"/healthz\""));
    assert!(body.contains("\nactive_users 0\n"));
}

#[tokio::test]
async fn readyz_flips_when_draining() {
    let st = state();
    let app = build_router(st.clone());

    let resp = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    st.set_draining();
    let resp = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(text(resp).await, "draining");
}
