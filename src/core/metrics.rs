//! In-memory per-role metrics collection.
//!
//! Grounded on the same `Mutex`-guarded accumulator style used throughout
//! `clients/common.rs` for token-usage tracking, scaled up to a fixed-size
//! table keyed by [`AgentRole`]. `record_call` never fails and never blocks
//! callers on I/O — the lock is held only for the duration of an in-memory
//! update.

use crate::core::types::{AgentMetrics, AgentRole};
use std::collections::HashMap;
use std::sync::Mutex;

/// Thread-safe counters collector, one [`AgentMetrics`] row per [`AgentRole`].
pub struct MetricsCollector {
    rows: Mutex<HashMap<AgentRole, AgentMetrics>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        MetricsCollector {
            rows: Mutex::new(HashMap::new()),
        }
    }

    /// Record the outcome of one agent invocation. Infallible by design: a
    /// metrics backend hiccup must never fail the request it's measuring.
    pub fn record_call(&self, role: AgentRole, delta: CallRecord) {
        let mut rows = match self.rows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = rows.entry(role).or_default();
        entry.calls += 1;
        entry.total_time_ms += delta.time_ms;
        if delta.cache_hit {
            entry.cache_hits += 1;
        } else {
            entry.cache_misses += 1;
        }
        entry.tool_calls += delta.tool_calls as u64;
        entry.input_tokens += delta.input_tokens as u64;
        entry.output_tokens += delta.output_tokens as u64;
    }

    /// Snapshot of a single role's counters. Zero-valued if never called.
    pub fn snapshot(&self, role: AgentRole) -> AgentMetrics {
        let rows = match self.rows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rows.get(&role).copied().unwrap_or_default()
    }

    /// Snapshot over the entire closed [`AgentRole`] enum: every variant is
    /// present, with a zero-valued row for roles that have never been called.
    pub fn snapshot_all(&self) -> HashMap<AgentRole, AgentMetrics> {
        let rows = match self.rows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        AgentRole::ALL
            .iter()
            .map(|role| (*role, rows.get(role).copied().unwrap_or_default()))
            .collect()
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        let mut rows = match self.rows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rows.clear();
    }
}

/// One call's worth of measurements fed into [`MetricsCollector::record_call`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CallRecord {
    pub time_ms: u64,
    pub cache_hit: bool,
    pub tool_calls: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_all_includes_uncalled_roles() {
        let collector = MetricsCollector::new();
        collector.record_call(
            AgentRole::Research,
            CallRecord {
                time_ms: 100,
                cache_hit: false,
                tool_calls: 1,
                input_tokens: 10,
                output_tokens: 20,
            },
        );
        let snapshot = collector.snapshot_all();
        assert_eq!(snapshot.len(), AgentRole::ALL.len());
        assert_eq!(snapshot[&AgentRole::Research].calls, 1);
        assert_eq!(snapshot[&AgentRole::Export].calls, 0);
    }

    #[test]
    fn reset_clears_all_counters() {
        let collector = MetricsCollector::new();
        collector.record_call(AgentRole::Summary, CallRecord::default());
        collector.reset();
        assert_eq!(collector.snapshot(AgentRole::Summary).calls, 0);
    }
}
