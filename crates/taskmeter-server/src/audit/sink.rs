use async_trait::async_trait;

use taskmeter_core::error::{MeterError, Result};

use super::AuditEvent;

/// Where audit events end up (database table, log pipeline, ...).
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, event: &AuditEvent) -> Result<()>;
}

/// Emits each event as one JSON line on the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn write(&self, event: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| MeterError::Internal(format!("audit encode failed: {e}")))?;
        tracing::info!(target: "audit", event = %line, "audit");
        Ok(())
    }
}

/// Discards everything. For tests and deployments without an audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopAuditSink;

#[async_trait]
impl AuditSink for NopAuditSink {
    async fn write(&self, _event: &AuditEvent) -> Result<()> {
        Ok(())
    }
}
