//! Running totals for long-lived tasks such as the deadline sweeper.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Named counters shared between a task and whoever reports on it.
///
/// The set of names is fixed at construction; updates to other names are
/// dropped.
pub struct StatsCounter {
    counters: BTreeMap<&'static str, AtomicU64>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        Self {
            counters: names.iter().map(|&n| (n, AtomicU64::new(0))).collect(),
        }
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Current values in name order.
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(&name, c)| (name, c.load(Ordering::Relaxed)))
            .collect()
    }
}

/// `name=value` pairs in name order, space separated.
impl fmt::Display for StatsCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.snapshot().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_registered_names_only() {
        let stats = StatsCounter::new(&["sweeps", "approved"]);
        stats.increment("sweeps");
        stats.add("approved", 3);
        stats.add("unknown", 9);
        assert_eq!(stats.get("sweeps"), 1);
        assert_eq!(stats.get("approved"), 3);
        assert_eq!(stats.get("unknown"), 0);
    }

    #[test]
    fn displays_in_name_order() {
        let stats = StatsCounter::new(&["rejected", "approved", "escalated"]);
        stats.add("approved", 2);
        stats.increment("escalated");
        assert_eq!(stats.to_string(), "approved=2 escalated=1 rejected=0");
    }
}
