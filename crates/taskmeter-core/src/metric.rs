//! Per-metric series storage.
//!
//! Each vec maps a declared-order label value tuple to its series state,
//! backed by `DashMap`. Counters and gauges are single atomics; a histogram
//! series sits behind its own mutex so an observation (bucket, sum, count) is
//! applied as one unit and never read half-done.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::mapref::one::Ref;
use dashmap::DashMap;

use crate::error::{MeterError, Result};
use crate::labels::LabelValues;

/// Read-locked series, inserting a default on first touch.
fn series<'a, V: Default>(
    map: &'a DashMap<LabelValues, V>,
    key: LabelValues,
) -> Ref<'a, LabelValues, V> {
    if let Some(r) = map.get(&key) {
        return r;
    }
    map.entry(key).or_default().downgrade()
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelValues, AtomicU64>,
}

impl CounterVec {
    /// Increment by an arbitrary value (saturating at `u64::MAX`).
    pub fn add(&self, values: LabelValues, v: u64) {
        let counter = series(&self.map, values);
        let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
            Some(cur.saturating_add(v))
        });
    }

    pub fn get(&self, values: &LabelValues) -> u64 {
        self.map
            .get(values)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sorted by label values.
    pub fn snapshot(&self) -> Vec<(LabelValues, u64)> {
        let mut rows: Vec<_> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelValues, AtomicI64>,
}

impl GaugeVec {
    pub fn set(&self, values: LabelValues, v: i64) {
        series(&self.map, values).store(v, Ordering::Relaxed);
    }

    /// Add an arbitrary signed delta.
    pub fn add(&self, values: LabelValues, delta: i64) {
        series(&self.map, values).fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self, values: &LabelValues) -> i64 {
        self.map
            .get(values)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> Vec<(LabelValues, i64)> {
        let mut rows: Vec<_> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

#[derive(Debug, Default, Clone)]
struct HistogramState {
    /// Cumulative, one per finite bound.
    buckets: Vec<u64>,
    sum: u64,
    count: u64,
}

/// One histogram series as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramSnapshot {
    pub values: LabelValues,
    pub buckets: Vec<u64>,
    pub sum: u64,
    pub count: u64,
}

pub struct HistogramVec {
    bounds: Vec<u64>,
    map: DashMap<LabelValues, Mutex<HistogramState>>,
}

impl HistogramVec {
    /// `bounds` must already be validated as strictly ascending.
    pub fn new(bounds: Vec<u64>) -> Self {
        Self {
            bounds,
            map: DashMap::new(),
        }
    }

    pub fn bounds(&self) -> &[u64] {
        &self.bounds
    }

    /// Record one observation: every bucket whose bound is `>= v`, the count
    /// and the sum. Values above the largest bound only reach `+Inf`.
    pub fn observe(&self, values: LabelValues, v: u64) -> Result<()> {
        let entry = series(&self.map, values);
        let mut st = entry
            .lock()
            .map_err(|_| MeterError::Internal("histogram series lock poisoned".into()))?;

        if st.buckets.len() != self.bounds.len() {
            st.buckets = vec![0; self.bounds.len()];
        }
        for (i, &b) in self.bounds.iter().enumerate() {
            if v <= b {
                st.buckets[i] = st.buckets[i].saturating_add(1);
            }
        }
        st.count = st.count.saturating_add(1);
        st.sum = st.sum.saturating_add(v);
        Ok(())
    }

    /// Copy every series out. Fails if any series lock is poisoned.
    pub fn snapshot(&self) -> Result<Vec<HistogramSnapshot>> {
        let mut rows = Vec::with_capacity(self.map.len());
        for r in self.map.iter() {
            let st = r
                .value()
                .lock()
                .map_err(|_| MeterError::Exposition("histogram series lock poisoned".into()))?
                .clone();
            let buckets = if st.buckets.is_empty() {
                vec![0; self.bounds.len()]
            } else {
                st.buckets
            };
            rows.push(HistogramSnapshot {
                values: r.key().clone(),
                buckets,
                sum: st.sum,
                count: st.count,
            });
        }
        rows.sort_by(|a, b| a.values.cmp(&b.values));
        Ok(rows)
    }
}

#[cfg(test)]
impl HistogramVec {
    /// Poison one series lock, as a panicking writer would.
    pub(crate) fn poison_series(&self, values: LabelValues) {
        let entry = series(&self.map, values);
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = entry.lock();
            panic!("writer died holding the series lock");
        }));
    }

    /// Break the cumulative invariant of one series.
    pub(crate) fn corrupt_series(&self, values: LabelValues) {
        let entry = series(&self.map, values);
        if let Ok(mut st) = entry.lock() {
            st.buckets = vec![1; self.bounds.len()];
            st.count = 0;
        };
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn key(v: &[&str]) -> LabelValues {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = HistogramVec::new(vec![10, 100, 1000]);
        for v in [0, 10, 11, 100, 999, 5000] {
            h.observe(key(&["GET"]), v).unwrap();
        }
        let snap = h.snapshot().unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].buckets, vec![2, 4, 5]);
        assert_eq!(snap[0].count, 6);
        assert_eq!(snap[0].sum, 10 + 11 + 100 + 999 + 5000);
    }

    #[test]
    fn counter_snapshot_is_sorted() {
        let c = CounterVec::default();
        c.add(key(&["b"]), 1);
        c.add(key(&["a"]), 2);
        c.add(key(&["c"]), 3);
        let order: Vec<_> = c.snapshot().into_iter().map(|(k, _)| k[0].clone()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn counts_saturate_instead_of_overflowing() {
        let h = HistogramVec::new(vec![10]);
        h.observe(key(&[]), 1).unwrap();
        if let Some(entry) = h.map.get(&key(&[])) {
            let mut st = entry.lock().unwrap();
            st.buckets[0] = u64::MAX;
            st.count = u64::MAX;
            st.sum = u64::MAX;
        }
        h.observe(key(&[]), 1).unwrap();

        let snap = h.snapshot().unwrap();
        assert_eq!(snap[0].buckets, vec![u64::MAX]);
        assert_eq!(snap[0].count, u64::MAX);
        assert_eq!(snap[0].sum, u64::MAX);
    }

    #[test]
    fn gauge_set_then_add() {
        let g = GaugeVec::default();
        g.set(key(&[]), 7);
        g.add(key(&[]), -10);
        assert_eq!(g.get(&key(&[])), -3);
    }
}
