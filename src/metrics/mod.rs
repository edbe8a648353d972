use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;

/// Counters accumulated across engine ticks.
#[derive(Debug, Default, Clone)]
pub struct SwapMetrics {
    ticks: u64,
    locked_ticks: u64,
    no_match_ticks: u64,
    cache_skips: u64,
    role_refreshes: u64,
    commits: u64,
    dangling_refs: u64,
}

impl SwapMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn record_locked(&mut self) {
        self.locked_ticks = self.locked_ticks.saturating_add(1);
    }

    pub fn record_no_match(&mut self) {
        self.no_match_ticks = self.no_match_ticks.saturating_add(1);
    }

    pub fn record_cache_skip(&mut self) {
        self.cache_skips = self.cache_skips.saturating_add(1);
    }

    pub fn record_role_refresh(&mut self) {
        self.role_refreshes = self.role_refreshes.saturating_add(1);
    }

    pub fn record_commit(&mut self) {
        self.commits = self.commits.saturating_add(1);
    }

    pub fn record_dangling(&mut self, count: usize) {
        if count > 0 {
            self.dangling_refs = self.dangling_refs.saturating_add(count as u64);
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            ticks: self.ticks,
            locked_ticks: self.locked_ticks,
            no_match_ticks: self.no_match_ticks,
            cache_skips: self.cache_skips,
            role_refreshes: self.role_refreshes,
            commits: self.commits,
            dangling_refs: self.dangling_refs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub ticks: u64,
    pub locked_ticks: u64,
    pub no_match_ticks: u64,
    pub cache_skips: u64,
    pub role_refreshes: u64,
    pub commits: u64,
    pub dangling_refs: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "swap_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("ticks".to_string(), json!(self.ticks));
        map.insert("locked_ticks".to_string(), json!(self.locked_ticks));
        map.insert("no_match_ticks".to_string(), json!(self.no_match_ticks));
        map.insert("cache_skips".to_string(), json!(self.cache_skips));
        map.insert("role_refreshes".to_string(), json!(self.role_refreshes));
        map.insert("commits".to_string(), json!(self.commits));
        map.insert("dangling_refs".to_string(), json!(self.dangling_refs));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let mut metrics = SwapMetrics::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_commit();
        metrics.record_dangling(0);
        metrics.record_dangling(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.commits, 1);
        assert_eq!(snapshot.dangling_refs, 3);

        let event = snapshot.to_log_event("layout_swap::metrics");
        assert_eq!(event.message, "swap_metrics");
        assert_eq!(event.fields["ticks"], json!(2));
    }
}
