//! Audit events are counted and sink failures never escape.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use taskmeter_core::error::{MeterError, Result};
use taskmeter_core::registry::{AUDIT_EVENTS_TOTAL, AUDIT_SINK_FAILURES_TOTAL};
use taskmeter_core::MetricsRegistry;
use taskmeter_server::app_state::AppState;
use taskmeter_server::audit::{record_mutation, AuditEvent, AuditSink, NopAuditSink, TracingAuditSink};

struct FlakySink {
    calls: AtomicUsize,
}

#[async_trait]
impl AuditSink for FlakySink {
    async fn write(&self, _event: &AuditEvent) -> Result<()> {
        // Every other write fails.
        if self.calls.fetch_add(1, Ordering::Relaxed) % 2 == 1 {
            return Err(MeterError::Internal("audit table unavailable".into()));
        }
        Ok(())
    }
}

fn state_with_sink(sink: Arc<dyn AuditSink>) -> AppState {
    let cfg = common::state().cfg().clone();
    let metrics = Arc::new(MetricsRegistry::with_defaults(&cfg.metrics).unwrap());
    AppState::with_parts(cfg, metrics, sink)
}

#[tokio::test]
async fn successful_writes_are_counted_per_action_and_entity() {
    let st = state_with_sink(Arc::new(NopAuditSink));

    record_mutation(&st, AuditEvent::new("task.create", "task", "t-1").with_actor("42")).await;
    record_mutation(&st, AuditEvent::new("task.create", "task", "t-2")).await;
    record_mutation(&st, AuditEvent::new("project.delete", "project", "p-9")).await;

    let m = st.metrics();
    let created = [("action", "task.create"), ("entity", "task")];
    let deleted = [("action", "project.delete"), ("entity", "project")];
    assert_eq!(m.counter_value(AUDIT_EVENTS_TOTAL, &created).unwrap(), 2);
    assert_eq!(m.counter_value(AUDIT_EVENTS_TOTAL, &deleted).unwrap(), 1);
}

#[tokio::test]
async fn sink_failures_are_counted_not_propagated() {
    let st = state_with_sink(Arc::new(FlakySink { calls: AtomicUsize::new(0) }));

    for i in 0..4 {
        record_mutation(&st, AuditEvent::new("task.update", "task", format!("t-{i}"))).await;
    }

    let m = st.metrics();
    let ok = [("action", "task.update"), ("entity", "task")];
    assert_eq!(m.counter_value(AUDIT_EVENTS_TOTAL, &ok).unwrap(), 2);
    assert_eq!(
        m.counter_value(AUDIT_SINK_FAILURES_TOTAL, &[("action", "task.update")]).unwrap(),
        2
    );
}

#[tokio::test]
async fn tracing_sink_encodes_events() {
    let event = AuditEvent::new("task.assign", "task", "t-3")
        .with_actor("42")
        .with_detail(json!({ "assignee": "7" }));
    TracingAuditSink.write(&event).await.unwrap();

    let v = serde_json::to_value(&event).unwrap();
    assert_eq!(v["action"], "task.assign");
    assert_eq!(v["actor"], "42");
    assert_eq!(v["detail"]["assignee"], "7");

    let bare = serde_json::to_value(AuditEvent::new("task.delete", "task", "t-4")).unwrap();
    assert!(bare.get("actor").is_none());
    assert!(bare.get("detail").is_none());
}
