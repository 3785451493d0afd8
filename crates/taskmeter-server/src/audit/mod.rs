//! Audit side channel for mutation endpoints.
//!
//! Handlers describe what they changed as an `AuditEvent` and hand it to
//! `record_mutation`. The event goes to the configured `AuditSink` and is
//! counted; neither step can fail the request that produced it.

mod sink;

pub use sink::{AuditSink, NopAuditSink, TracingAuditSink};

use serde::Serialize;
use serde_json::Value;

use taskmeter_core::now_ms;
use taskmeter_core::registry::{AUDIT_EVENTS_TOTAL, AUDIT_SINK_FAILURES_TOTAL};

use crate::app_state::AppState;
use crate::obs::report;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// e.g. `task.update`
    pub action: String,
    /// e.g. `task`, `project`
    pub entity: String,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub at_ms: u64,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub detail: Value,
}

impl AuditEvent {
    pub fn new(
        action: impl Into<String>,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            entity: entity.into(),
            entity_id: entity_id.into(),
            actor: None,
            at_ms: now_ms(),
            detail: Value::Null,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

/// Write `event` to the sink and count it. Sink failures are logged and
/// counted under `audit_sink_failures_total`.
pub async fn record_mutation(state: &AppState, event: AuditEvent) {
    let metrics = state.metrics();

    match state.audit().write(&event).await {
        Ok(()) => report(
            metrics.increment_counter(
                AUDIT_EVENTS_TOTAL,
                &[("action", event.action.as_str()), ("entity", event.entity.as_str())],
            ),
            AUDIT_EVENTS_TOTAL,
        ),
        Err(e) => {
            tracing::error!(
                action = %event.action,
                entity = %event.entity,
                entity_id = %event.entity_id,
                error = %e,
                "audit sink write failed"
            );
            report(
                metrics.increment_counter(AUDIT_SINK_FAILURES_TOTAL, &[("action", event.action.as_str())]),
                AUDIT_SINK_FAILURES_TOTAL,
            );
        }
    }
}
