//! Label schemas.
//!
//! Every metric declares an ordered list of label names at registration.
//! Call sites pass `(name, value)` pairs in any order; `resolve` checks them
//! against the schema and returns the values in declared order, which is the
//! key used by the series maps and the order labels are rendered in.

use std::fmt::Write;

use crate::error::{MeterError, Result};

/// Label values in declared order.
pub type LabelValues = Vec<String>;

/// Reserved for histogram bucket bounds.
pub const BUCKET_LABEL: &str = "le";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    names: Vec<&'static str>,
}

impl LabelSchema {
    /// Validate and build a schema for `metric`.
    pub fn new(metric: &str, names: &[&'static str], reserve_le: bool) -> Result<Self> {
        for (i, n) in names.iter().enumerate() {
            if !is_valid_name(n) {
                return Err(MeterError::invalid_metric(metric, format!("bad label name: {n:?}")));
            }
            if n.starts_with("__") {
                return Err(MeterError::invalid_metric(metric, format!("reserved label name: {n}")));
            }
            if reserve_le && *n == BUCKET_LABEL {
                return Err(MeterError::invalid_metric(metric, "histograms may not declare `le`"));
            }
            if names[..i].contains(n) {
                return Err(MeterError::invalid_metric(metric, format!("duplicate label name: {n}")));
            }
        }
        Ok(Self { names: names.to_vec() })
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Match `labels` against the schema. Order-insensitive; unknown, missing
    /// and repeated names are rejected.
    pub fn resolve(&self, metric: &str, labels: &[(&str, &str)]) -> Result<LabelValues> {
        if labels.len() != self.names.len() {
            return Err(MeterError::invalid_label(
                metric,
                format!("expected {} labels {:?}, got {}", self.names.len(), self.names, labels.len()),
            ));
        }

        let mut slots: Vec<Option<&str>> = vec![None; self.names.len()];
        for (k, v) in labels {
            let idx = self
                .names
                .iter()
                .position(|n| n == k)
                .ok_or_else(|| MeterError::invalid_label(metric, format!("unknown label: {k}")))?;
            if slots[idx].replace(*v).is_some() {
                return Err(MeterError::invalid_label(metric, format!("label given twice: {k}")));
            }
        }

        // Length matched and no slot was filled twice, so every slot is set.
        Ok(slots
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect())
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape a label value for the text exposition format.
pub fn escape_label_value(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Render `{a="x",b="y"}` (plus an optional trailing extra pair), or an empty
/// string when there is nothing to render.
pub fn format_labels(names: &[&str], values: &[String], extra: Option<(&str, &str)>) -> String {
    let mut out = String::new();
    let pairs = names
        .iter()
        .zip(values.iter().map(String::as_str))
        .map(|(k, v)| (*k, v))
        .chain(extra);

    for (i, (k, v)) in pairs.enumerate() {
        out.push(if i == 0 { '{' } else { ',' });
        let _ = write!(out, "{}=\"{}\"", k, escape_label_value(v));
    }
    if !out.is_empty() {
        out.push('}');
    }
    out
}
