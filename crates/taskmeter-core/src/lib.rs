//! taskmeter core: the in-process metrics engine.
//!
//! Counters, gauges and histograms keyed by declared label schemas, an
//! active-entity window with sweep-based eviction, and Prometheus text
//! exposition. No runtime or transport dependencies; the server crate owns
//! the HTTP surface and the sweep timer.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. Metrics are a side
//! channel and must never take the host process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod active;
pub mod error;
pub mod exposition;
pub mod labels;
pub mod metric;
pub mod registry;
pub mod settings;

pub use active::ActiveEntityWindow;
pub use error::{ErrorCode, MeterError, Result};
pub use exposition::{Exposition, CONTENT_TYPE};
pub use registry::{global, init_global, now_ms, MetricKind, MetricsRegistry};
pub use settings::MetricsSettings;
