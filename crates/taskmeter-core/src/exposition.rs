//! Prometheus text exposition (format 0.0.4).
//!
//! Metrics render one at a time into their own buffer. A metric that cannot
//! be snapshotted is logged and left out, as is a histogram series that fails
//! its consistency check; the rest of the document survives.

use std::fmt::Write;
use std::sync::Arc;

use crate::active::ActiveEntityWindow;
use crate::error::{MeterError, Result};
use crate::labels::{format_labels, BUCKET_LABEL};
use crate::metric::HistogramSnapshot;
use crate::registry::{MetricFamily, MetricStore};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// A rendered snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exposition {
    pub body: String,
    /// Metrics that made it into `body`.
    pub rendered: usize,
    /// Metrics left out because they failed to render.
    pub failed: usize,
    /// Histogram series dropped from metrics that otherwise rendered.
    pub failed_series: usize,
}

impl Exposition {
    /// True when there was something to render and none of it rendered.
    pub fn is_total_failure(&self) -> bool {
        self.rendered == 0 && self.failed > 0
    }
}

pub(crate) fn render(families: &[Arc<MetricFamily>], active: &ActiveEntityWindow, now_ms: u64) -> Exposition {
    let mut body = String::new();
    let mut rendered = 0;
    let mut failed = 0;
    let mut failed_series = 0;

    for family in families {
        match render_family(family, active, now_ms) {
            Ok((block, skipped)) => {
                body.push_str(&block);
                rendered += 1;
                failed_series += skipped;
            }
            Err(e) => {
                tracing::error!(metric = %family.name, error = %e, "metric left out of exposition");
                failed += 1;
            }
        }
    }

    // Exactly one trailing newline, even for an empty registry.
    let trimmed = body.trim_end_matches('\n').len();
    body.truncate(trimmed);
    body.push('\n');

    Exposition {
        body,
        rendered,
        failed,
        failed_series,
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// One metric's block plus the number of series that had to be skipped.
fn render_family(family: &MetricFamily, active: &ActiveEntityWindow, now_ms: u64) -> Result<(String, usize)> {
    let name = family.name.as_str();
    let names = family.schema.names();
    let mut out = String::new();
    let mut skipped = 0;

    let _ = writeln!(out, "# HELP {} {}", name, escape_help(&family.help));
    let _ = writeln!(out, "# TYPE {} {}", name, family.kind().as_str());

    match &family.store {
        MetricStore::Counter(c) => {
            let rows = c.snapshot();
            if rows.is_empty() && names.is_empty() {
                let _ = writeln!(out, "{} 0", name);
            }
            for (values, v) in rows {
                let _ = writeln!(out, "{}{} {}", name, format_labels(names, &values, None), v);
            }
        }
        MetricStore::Gauge(g) => {
            let rows = g.snapshot();
            if rows.is_empty() && names.is_empty() {
                let _ = writeln!(out, "{} 0", name);
            }
            for (values, v) in rows {
                let _ = writeln!(out, "{}{} {}", name, format_labels(names, &values, None), v);
            }
        }
        MetricStore::Histogram(h) => {
            let rows = h.snapshot()?;
            if rows.is_empty() && names.is_empty() {
                let zero = HistogramSnapshot {
                    values: Vec::new(),
                    buckets: vec![0; h.bounds().len()],
                    sum: 0,
                    count: 0,
                };
                render_histogram_series(&mut out, name, names, h.bounds(), &zero)?;
            }
            for series in &rows {
                if let Err(e) = render_histogram_series(&mut out, name, names, h.bounds(), series) {
                    tracing::error!(metric = name, labels = ?series.values, error = %e, "histogram series skipped");
                    skipped += 1;
                }
            }
        }
        MetricStore::ActiveEntities => {
            let _ = writeln!(out, "{} {}", name, active.active_count(now_ms));
        }
    }

    Ok((out, skipped))
}

fn render_histogram_series(
    out: &mut String,
    name: &str,
    names: &[&str],
    bounds: &[u64],
    s: &HistogramSnapshot,
) -> Result<()> {
    if s.buckets.len() != bounds.len() {
        return Err(MeterError::Exposition(format!(
            "bucket count {} does not match {} bounds",
            s.buckets.len(),
            bounds.len()
        )));
    }
    if s.buckets.windows(2).any(|w| w[0] > w[1]) || s.buckets.last().is_some_and(|&l| l > s.count) {
        return Err(MeterError::Exposition("bucket counts are not cumulative".into()));
    }

    let mut block = String::new();
    for (le, count) in bounds.iter().zip(&s.buckets) {
        let le = le.to_string();
        let labels = format_labels(names, &s.values, Some((BUCKET_LABEL, le.as_str())));
        let _ = writeln!(block, "{}_bucket{} {}", name, labels, count);
    }
    let labels = format_labels(names, &s.values, Some((BUCKET_LABEL, "+Inf")));
    let _ = writeln!(block, "{}_bucket{} {}", name, labels, s.count);

    let plain = format_labels(names, &s.values, None);
    let _ = writeln!(block, "{}_sum{} {}", name, plain, s.sum);
    let _ = writeln!(block, "{}_count{} {}", name, plain, s.count);

    out.push_str(&block);
    Ok(())
}
