use std::collections::BTreeMap;

pub const SPY_WRITES: &str = "spy.writes";
pub const SPY_SUPPRESSED: &str = "spy.suppressed";
pub const NAVIGATIONS_STARTED: &str = "navigation.started";
pub const STALE_TRANSITIONS: &str = "navigation.stale_transitions";

/// Events the interaction store counts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Counter {
    /// Scroll-spy writes the store accepted.
    SpyWrites,
    /// Scroll-spy writes refused because the navigation guard was up.
    SpySuppressed,
    NavigationsStarted,
    /// Settle / finish / abandon calls carrying a superseded token.
    StaleTransitions,
}

impl Counter {
    pub const ALL: [Counter; 4] = [
        Counter::SpyWrites,
        Counter::SpySuppressed,
        Counter::NavigationsStarted,
        Counter::StaleTransitions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Counter::SpyWrites => SPY_WRITES,
            Counter::SpySuppressed => SPY_SUPPRESSED,
            Counter::NavigationsStarted => NAVIGATIONS_STARTED,
            Counter::StaleTransitions => STALE_TRANSITIONS,
        }
    }
}

/// Store counters. Every counter is present (zero until hit), so snapshots
/// always list the same names in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    counts: BTreeMap<Counter, u64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            counts: Counter::ALL.into_iter().map(|c| (c, 0)).collect(),
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&mut self, counter: Counter) {
        *self.counts.entry(counter).or_insert(0) += 1;
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counts.get(&counter).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counts.iter().map(|(c, n)| (c.name(), *n)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
}

impl MetricsSnapshot {
    pub fn get(&self, counter: Counter) -> u64 {
        self.counter(counter.name())
    }

    /// Value by dotted name; unknown names read as zero.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(0, |(_, v)| *v)
    }
}
