//! Process-wide metrics registry.
//!
//! Metrics are registered up front (usually via `with_defaults`) and looked
//! up by name on every mutation. Mutating an unregistered name is an error,
//! never an implicit registration. Lookups go through a `DashMap` index so
//! request paths never touch the registration lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use crate::active::ActiveEntityWindow;
use crate::error::{MeterError, Result};
use crate::exposition::{self, Exposition};
use crate::labels::{is_valid_name, LabelSchema};
use crate::metric::{CounterVec, GaugeVec, HistogramVec};
use crate::settings::MetricsSettings;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_MS: &str = "http_request_duration_ms";
pub const ACTIVE_USERS: &str = "active_users";
pub const AUDIT_EVENTS_TOTAL: &str = "audit_events_total";
pub const AUDIT_SINK_FAILURES_TOTAL: &str = "audit_sink_failures_total";
pub const SWEEP_REMOVED_TOTAL: &str = "metrics_sweep_removed_total";

/// Request latency buckets (milliseconds).
pub const HTTP_DURATION_BUCKETS_MS: [u64; 11] =
    [5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000];

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

pub(crate) enum MetricStore {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
    /// Gauge whose value is the active-entity count at render time.
    ActiveEntities,
}

pub(crate) struct MetricFamily {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) schema: LabelSchema,
    pub(crate) store: MetricStore,
}

impl MetricFamily {
    pub(crate) fn kind(&self) -> MetricKind {
        match self.store {
            MetricStore::Counter(_) => MetricKind::Counter,
            MetricStore::Gauge(_) | MetricStore::ActiveEntities => MetricKind::Gauge,
            MetricStore::Histogram(_) => MetricKind::Histogram,
        }
    }
}

pub struct MetricsRegistry {
    /// Registration order, which is also exposition order.
    families: RwLock<Vec<Arc<MetricFamily>>>,
    index: DashMap<String, Arc<MetricFamily>>,
    active: ActiveEntityWindow,
    enabled: AtomicBool,
}

impl MetricsRegistry {
    /// Empty registry with the given active window.
    pub fn new(active_window_minutes: u64) -> Self {
        Self {
            families: RwLock::new(Vec::new()),
            index: DashMap::new(),
            active: ActiveEntityWindow::new(active_window_minutes),
            enabled: AtomicBool::new(true),
        }
    }

    /// Registry with the application's metric set pre-registered.
    pub fn with_defaults(settings: &MetricsSettings) -> Result<Self> {
        let reg = Self::new(settings.active_window_minutes);
        reg.enabled.store(settings.enabled, Ordering::Relaxed);

        reg.register_counter(
            HTTP_REQUESTS_TOTAL,
            "Total HTTP requests handled.",
            &["method", "route", "status_code"],
        )?;
        reg.register_histogram(
            HTTP_REQUEST_DURATION_MS,
            "HTTP request latency in milliseconds.",
            &["method", "route"],
            &HTTP_DURATION_BUCKETS_MS,
        )?;
        reg.register_active_gauge(ACTIVE_USERS, "Users seen within the active window.")?;
        reg.register_counter(
            AUDIT_EVENTS_TOTAL,
            "Audit events recorded by mutation endpoints.",
            &["action", "entity"],
        )?;
        reg.register_counter(
            AUDIT_SINK_FAILURES_TOTAL,
            "Audit events the sink failed to persist.",
            &["action"],
        )?;
        reg.register_counter(
            SWEEP_REMOVED_TOTAL,
            "Entities evicted from the active window by the sweeper.",
            &[],
        )?;
        Ok(reg)
    }

    // --------------------
    // Registration
    // --------------------

    pub fn register_counter(&self, name: &str, help: &str, labels: &[&'static str]) -> Result<()> {
        let schema = LabelSchema::new(name, labels, false)?;
        self.register(name, help, schema, MetricStore::Counter(CounterVec::default()))
    }

    pub fn register_gauge(&self, name: &str, help: &str, labels: &[&'static str]) -> Result<()> {
        let schema = LabelSchema::new(name, labels, false)?;
        self.register(name, help, schema, MetricStore::Gauge(GaugeVec::default()))
    }

    /// `buckets` are finite inclusive upper bounds, strictly ascending.
    /// `+Inf` is implicit.
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        labels: &[&'static str],
        buckets: &[u64],
    ) -> Result<()> {
        let schema = LabelSchema::new(name, labels, true)?;
        if buckets.is_empty() {
            return Err(MeterError::invalid_metric(name, "histogram needs at least one bucket"));
        }
        if buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MeterError::invalid_metric(name, "buckets must be strictly ascending"));
        }
        self.register(
            name,
            help,
            schema,
            MetricStore::Histogram(HistogramVec::new(buckets.to_vec())),
        )
    }

    /// Expose the active-entity window as an unlabelled gauge.
    pub fn register_active_gauge(&self, name: &str, help: &str) -> Result<()> {
        let exists = self
            .families
            .read()
            .map_err(|_| MeterError::Internal("registry lock poisoned".into()))?
            .iter()
            .any(|f| matches!(f.store, MetricStore::ActiveEntities));
        if exists {
            return Err(MeterError::invalid_metric(name, "active-entity gauge already registered"));
        }
        self.register(name, help, LabelSchema::new(name, &[], false)?, MetricStore::ActiveEntities)
    }

    fn register(&self, name: &str, help: &str, schema: LabelSchema, store: MetricStore) -> Result<()> {
        if !is_valid_name(name) {
            return Err(MeterError::invalid_metric(name, "bad metric name"));
        }

        let mut families = self
            .families
            .write()
            .map_err(|_| MeterError::Internal("registry lock poisoned".into()))?;
        if self.index.contains_key(name) {
            return Err(MeterError::DuplicateMetric(name.to_string()));
        }

        let family = Arc::new(MetricFamily {
            name: name.to_string(),
            help: help.to_string(),
            schema,
            store,
        });
        self.index.insert(name.to_string(), Arc::clone(&family));
        families.push(family);
        tracing::debug!(metric = name, "metric registered");
        Ok(())
    }

    pub(crate) fn family(&self, name: &str) -> Result<Arc<MetricFamily>> {
        self.index
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| MeterError::UnknownMetric(name.to_string()))
    }

    /// Names in registration order.
    pub fn metric_names(&self) -> Vec<String> {
        self.snapshot_families().iter().map(|f| f.name.clone()).collect()
    }

    // --------------------
    // Master switch
    // --------------------

    pub fn set_enabled(&self, on: bool) {
        self.enabled.store(on, Ordering::Relaxed);
        tracing::info!(enabled = on, "metrics collection switched");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    // --------------------
    // Mutations (no-ops while disabled)
    // --------------------

    pub fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) -> Result<()> {
        self.add_counter(name, labels, 1)
    }

    pub fn add_counter(&self, name: &str, labels: &[(&str, &str)], n: u64) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let family = self.family(name)?;
        let MetricStore::Counter(c) = &family.store else {
            return Err(kind_mismatch(name, MetricKind::Counter));
        };
        c.add(family.schema.resolve(name, labels)?, n);
        Ok(())
    }

    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], v: i64) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let family = self.family(name)?;
        let MetricStore::Gauge(g) = &family.store else {
            return Err(kind_mismatch(name, MetricKind::Gauge));
        };
        g.set(family.schema.resolve(name, labels)?, v);
        Ok(())
    }

    pub fn add_gauge(&self, name: &str, labels: &[(&str, &str)], delta: i64) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let family = self.family(name)?;
        let MetricStore::Gauge(g) = &family.store else {
            return Err(kind_mismatch(name, MetricKind::Gauge));
        };
        g.add(family.schema.resolve(name, labels)?, delta);
        Ok(())
    }

    pub fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: u64) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let family = self.family(name)?;
        let MetricStore::Histogram(h) = &family.store else {
            return Err(kind_mismatch(name, MetricKind::Histogram));
        };
        h.observe(family.schema.resolve(name, labels)?, value)
    }

    // --------------------
    // Active window
    // --------------------

    pub fn mark_active(&self, entity_id: &str, ts_ms: u64) {
        if !self.is_enabled() {
            return;
        }
        self.active.mark_active(entity_id, ts_ms);
    }

    /// Sweeping is housekeeping, not collection, so it runs even when disabled.
    pub fn sweep_expired(&self, now_ms: u64) -> usize {
        self.active.sweep_expired(now_ms)
    }

    pub fn active_count(&self, now_ms: u64) -> usize {
        self.active.active_count(now_ms)
    }

    pub fn active_window(&self) -> &ActiveEntityWindow {
        &self.active
    }

    // --------------------
    // Readers
    // --------------------

    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Result<u64> {
        let family = self.family(name)?;
        let MetricStore::Counter(c) = &family.store else {
            return Err(kind_mismatch(name, MetricKind::Counter));
        };
        Ok(c.get(&family.schema.resolve(name, labels)?))
    }

    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Result<i64> {
        let family = self.family(name)?;
        let MetricStore::Gauge(g) = &family.store else {
            return Err(kind_mismatch(name, MetricKind::Gauge));
        };
        Ok(g.get(&family.schema.resolve(name, labels)?))
    }

    // --------------------
    // Exposition
    // --------------------

    pub fn render_exposition(&self) -> Exposition {
        self.render_exposition_at(now_ms())
    }

    /// Render with an explicit clock (used for the active-entity gauge).
    pub fn render_exposition_at(&self, now_ms: u64) -> Exposition {
        exposition::render(&self.snapshot_families(), &self.active, now_ms)
    }

    fn snapshot_families(&self) -> Vec<Arc<MetricFamily>> {
        match self.families.read() {
            Ok(f) => f.clone(),
            Err(poisoned) => {
                tracing::error!("registry lock poisoned; rendering last known families");
                poisoned.into_inner().clone()
            }
        }
    }
}

fn kind_mismatch(name: &str, expected: MetricKind) -> MeterError {
    MeterError::KindMismatch {
        metric: name.to_string(),
        expected: expected.as_str(),
    }
}

static GLOBAL: OnceLock<Arc<MetricsRegistry>> = OnceLock::new();

/// Build the process-wide registry once. Later calls return the existing
/// instance and ignore `settings`.
pub fn init_global(settings: &MetricsSettings) -> Result<Arc<MetricsRegistry>> {
    if let Some(reg) = GLOBAL.get() {
        tracing::debug!("metrics registry already initialised");
        return Ok(Arc::clone(reg));
    }
    let fresh = Arc::new(MetricsRegistry::with_defaults(settings)?);
    Ok(Arc::clone(GLOBAL.get_or_init(|| fresh)))
}

/// The process-wide registry, if `init_global` has run.
pub fn global() -> Option<Arc<MetricsRegistry>> {
    GLOBAL.get().cloned()
}
