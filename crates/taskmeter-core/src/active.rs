use dashmap::DashMap;

const MS_PER_MINUTE: u64 = 60_000;

/// Last-seen tracker for entities (user ids).
///
/// An entity is active iff `now - last_seen <= window` (the boundary itself
/// still counts). Stamps only move forward. `sweep_expired` is the only
/// operation that shrinks the map; `active_count` just looks.
pub struct ActiveEntityWindow {
    window_ms: u64,
    last_seen: DashMap<String, u64>,
}

impl ActiveEntityWindow {
    pub fn new(window_minutes: u64) -> Self {
        Self::with_window_ms(window_minutes.saturating_mul(MS_PER_MINUTE))
    }

    pub fn with_window_ms(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_seen: DashMap::new(),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Record or refresh `id`. An older `ts_ms` than the stored one is ignored.
    pub fn mark_active(&self, id: &str, ts_ms: u64) {
        if let Some(mut cur) = self.last_seen.get_mut(id) {
            if ts_ms > *cur {
                *cur = ts_ms;
            }
            return;
        }
        self.last_seen
            .entry(id.to_string())
            .and_modify(|cur| *cur = (*cur).max(ts_ms))
            .or_insert(ts_ms);
    }

    fn in_window(&self, last_seen: u64, now_ms: u64) -> bool {
        now_ms.saturating_sub(last_seen) <= self.window_ms
    }

    /// Drop every entity strictly past the window. Returns how many went.
    pub fn sweep_expired(&self, now_ms: u64) -> usize {
        let mut removed = 0;
        self.last_seen.retain(|_, last| {
            let keep = self.in_window(*last, now_ms);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn active_count(&self, now_ms: u64) -> usize {
        self.last_seen
            .iter()
            .filter(|r| self.in_window(*r.value(), now_ms))
            .count()
    }

    pub fn is_active(&self, id: &str, now_ms: u64) -> bool {
        self.last_seen
            .get(id)
            .map(|r| self.in_window(*r.value(), now_ms))
            .unwrap_or(false)
    }

    pub fn last_seen(&self, id: &str) -> Option<u64> {
        self.last_seen.get(id).map(|r| *r.value())
    }

    /// Tracked entries, including stale ones not yet swept.
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}
