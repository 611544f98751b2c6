//! Counters and snapshots reported by the section

use serde::Serialize;

use super::item::{ItemFailure, ItemOutcome};

/// Statistics for a parallel section
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SectionStats {
    pub total_admitted: u64,
    pub total_duplicates: u64,
    pub total_rejected_closed: u64,
    /// Items dropped because their admission hook panicked
    pub total_hook_failures: u64,
    pub total_started: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub peak_active: usize,
    pub peak_pending: usize,
}

/// Point-in-time view of a section
#[derive(Debug, Clone, Serialize)]
pub struct SectionState {
    pub pending: usize,
    pub active: usize,
    pub is_open: bool,
    pub history_len: usize,
    pub stats: SectionStats,
}

/// Everything `drain()` observed while waiting for tracked work
#[derive(Debug, Default, Clone, Serialize)]
pub struct DrainReport {
    /// Keys in completion order, failed items included
    pub completed: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl DrainReport {
    /// Build a report from outcomes collected in any order
    pub(crate) fn from_outcomes(mut outcomes: Vec<ItemOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.sequence);
        let mut report = Self::default();
        for outcome in outcomes {
            report.record(outcome);
        }
        report
    }

    pub(crate) fn record(&mut self, outcome: ItemOutcome) {
        if let Err(message) = outcome.result {
            self.failures.push(ItemFailure {
                key: outcome.key.clone(),
                group_key: outcome.group_key,
                message,
            });
        }
        self.completed.push(outcome.key);
    }

    /// True when no item failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, key: &str) -> Option<&ItemFailure> {
        self.failures.iter().find(|f| f.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(key: &str, sequence: u64, result: Result<(), String>) -> ItemOutcome {
        ItemOutcome {
            key: key.to_string(),
            group_key: "g".to_string(),
            sequence,
            result,
        }
    }

    #[test]
    fn test_report_records_failures() {
        let mut report = DrainReport::default();
        report.record(outcome("a", 1, Ok(())));
        report.record(outcome("b", 2, Err("boom".to_string())));

        assert_eq!(report.completed, vec!["a", "b"]);
        assert!(!report.is_success());
        assert_eq!(report.failure("b").map(|f| f.message.as_str()), Some("boom"));
        assert!(report.failure("a").is_none());
    }

    #[test]
    fn test_from_outcomes_sorts_by_completion() {
        let report = DrainReport::from_outcomes(vec![
            outcome("third", 3, Ok(())),
            outcome("first", 1, Err("early".to_string())),
            outcome("second", 2, Ok(())),
        ]);

        assert_eq!(report.completed, vec!["first", "second", "third"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "first");
    }
}
