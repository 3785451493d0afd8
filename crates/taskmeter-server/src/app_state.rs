//! Shared application state.
//!
//! One registry per process: `main` builds it through `init_global` and hands
//! the same `Arc` in here; tests build private ones with `new`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use taskmeter_core::error::Result;
use taskmeter_core::MetricsRegistry;

use crate::audit::{AuditSink, TracingAuditSink};
use crate::config::ServiceConfig;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    metrics: Arc<MetricsRegistry>,
    audit: Arc<dyn AuditSink>,
    draining: AtomicBool,
}

impl AppState {
    /// Fresh registry with the default metric set and the tracing audit sink.
    pub fn new(cfg: ServiceConfig) -> Result<Self> {
        let metrics = Arc::new(MetricsRegistry::with_defaults(&cfg.metrics)?);
        Ok(Self::with_parts(cfg, metrics, Arc::new(TracingAuditSink)))
    }

    pub fn with_parts(
        cfg: ServiceConfig,
        metrics: Arc<MetricsRegistry>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics,
                audit,
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.inner.metrics
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.inner.audit
    }

    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
