#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use axum::body::{self, Body};
use axum::http::{Request, Response};

use taskmeter_server::{app_state::AppState, config};

pub const TOKEN: &str = "s3cret";

pub fn state_with(extra_metrics: &str) -> AppState {
    let yaml = format!("version: 1\nmetrics:\n  token: \"{TOKEN}\"\n{extra_metrics}");
    AppState::new(config::load_from_str(&yaml).unwrap()).unwrap()
}

pub fn state() -> AppState {
    state_with("")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn scrape(token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().uri("/metrics");
    if let Some(t) = token {
        b = b.header("authorization", format!("Bearer {t}"));
    }
    b.body(Body::empty()).unwrap()
}

pub async fn text(resp: Response<Body>) -> String {
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
