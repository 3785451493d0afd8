//! Middleware attribution: matched route, status, active users.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use futures_util::future::join_all;
use tower::ServiceExt;

use common::state;
use taskmeter_core::now_ms;
use taskmeter_core::registry::HTTP_REQUESTS_TOTAL;
use taskmeter_server::app_state::AppState;
use taskmeter_server::router::build_router_with;

fn api() -> Router<AppState> {
    Router::new()
        .route("/api/tasks/:id", get(|| async { "task" }))
        .route("/api/tasks", post(|| async { StatusCode::CREATED }))
}

fn task_request(id: u32, user: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().uri(format!("/api/tasks/{id}"));
    if let Some(u) = user {
        b = b.header("x-user-id", u);
    }
    b.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn route_template_not_raw_path_is_recorded() {
    let st = state();
    let app = build_router_with(st.clone(), api());

    for id in [1, 2, 3] {
        let resp = app.clone().oneshot(task_request(id, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let labels = [("method", "GET"), ("route", "/api/tasks/:id"), ("status_code", "200")];
    assert_eq!(st.metrics().counter_value(HTTP_REQUESTS_TOTAL, &labels).unwrap(), 3);
}

#[tokio::test]
async fn status_code_comes_from_the_response() {
    let st = state();
    let app = build_router_with(st.clone(), api());

    let req = Request::builder()
        .method("POST")
        .uri("/api/tasks")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let labels = [("method", "POST"), ("route", "/api/tasks"), ("status_code", "201")];
    assert_eq!(st.metrics().counter_value(HTTP_REQUESTS_TOTAL, &labels).unwrap(), 1);
}

#[tokio::test]
async fn concurrent_requests_are_all_counted() {
    let st = state();
    let app = build_router_with(st.clone(), api());

    let calls = (0..50).map(|i| app.clone().oneshot(task_request(i, None)));
    for resp in join_all(calls).await {
        assert_eq!(resp.unwrap().status(), StatusCode::OK);
    }

    let labels = [("method", "GET"), ("route", "/api/tasks/:id"), ("status_code", "200")];
    assert_eq!(st.metrics().counter_value(HTTP_REQUESTS_TOTAL, &labels).unwrap(), 50);
}

#[tokio::test]
async fn user_header_marks_user_active() {
    let st = state();
    let app = build_router_with(st.clone(), api());

    app.clone().oneshot(task_request(1, Some("42"))).await.unwrap();
    app.clone().oneshot(task_request(2, Some("42"))).await.unwrap();
    app.clone().oneshot(task_request(3, Some("7"))).await.unwrap();
    app.oneshot(task_request(4, Some("   "))).await.unwrap();

    let now = now_ms();
    assert_eq!(st.metrics().active_count(now), 2);
    assert!(st.metrics().active_window().is_active("42", now));
}
