//! Group-fair selection of the next pending item
//!
//! Groups that never ran win over every group that did. Among groups that
//! already ran, the one whose most recent start lies furthest back wins.
//! Within the winning group the earliest pending item is chosen, so
//! admission order is kept per group.

use std::collections::HashMap;

use tracing::debug;

use super::error::SectionError;

/// Position of the most recent start of each group.
///
/// Updated once per started item, so selection never has to walk the full
/// start history.
#[derive(Debug, Default, Clone)]
pub struct LastRun {
    starts: HashMap<String, u64>,
    next: u64,
}

impl LastRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a list of started groups in start order
    pub fn from_history<S: AsRef<str>>(history: &[S]) -> Self {
        let mut last_run = Self::new();
        for group in history {
            last_run.record(group.as_ref());
        }
        last_run
    }

    /// Note that an item of `group` just started
    pub fn record(&mut self, group: &str) {
        let position = self.next;
        self.next += 1;
        match self.starts.get_mut(group) {
            Some(start) => *start = position,
            None => {
                self.starts.insert(group.to_string(), position);
            }
        }
    }

    /// Position of the most recent start of `group`, if it ever ran
    pub fn get(&self, group: &str) -> Option<u64> {
        self.starts.get(group).copied()
    }

    /// Number of distinct groups that ran
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Index into `pending` (given as its group keys, in queue order) of the item
/// to dispatch next. Single pass over `pending`.
pub fn select_index<'a, P>(pending: P, last_run: &LastRun) -> Result<usize, SectionError>
where
    P: IntoIterator<Item = &'a str>,
{
    // (index, group, last start); `None` sorts before every `Some`
    let mut best: Option<(usize, &str, Option<u64>)> = None;

    for (index, group) in pending.into_iter().enumerate() {
        let start = last_run.get(group);
        let better = match best {
            None => true,
            Some((_, _, best_start)) => match (start, best_start) {
                (None, Some(_)) => true,
                (Some(s), Some(b)) => s < b,
                _ => false,
            },
        };
        if better {
            best = Some((index, group, start));
            if start.is_none() {
                break;
            }
        }
    }

    match best {
        Some((index, group, None)) => {
            debug!(index, group, "select_index: picked group that never ran");
            Ok(index)
        }
        Some((index, group, Some(_))) => {
            debug!(index, group, "select_index: picked least recently started group");
            Ok(index)
        }
        None => Err(SectionError::EmptyQueue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn last_run(groups: &[&str]) -> LastRun {
        LastRun::from_history(groups)
    }

    #[test]
    fn test_last_run_keeps_most_recent_start() {
        let lr = last_run(&["a", "b", "a", "c", "b"]);
        assert_eq!(lr.get("a"), Some(2));
        assert_eq!(lr.get("c"), Some(3));
        assert_eq!(lr.get("b"), Some(4));
        assert_eq!(lr.get("d"), None);
        assert_eq!(lr.len(), 3);
    }

    #[test]
    fn test_empty_pending_is_an_error() {
        let result = select_index(Vec::<&str>::new(), &LastRun::new());
        assert!(matches!(result, Err(SectionError::EmptyQueue)));
    }

    #[test]
    fn test_never_run_group_preferred() {
        let lr = last_run(&["a", "b"]);
        // "a" ran longest ago, but "c" never ran at all
        let index = select_index(["a", "b", "c", "a"], &lr).unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn test_first_pending_wins_when_nothing_ran() {
        let index = select_index(["g1", "g1", "g2"], &LastRun::new()).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_least_recent_group_preferred() {
        // a last started at index 5, b at index 9
        let lr = last_run(&["a", "b", "b", "a", "b", "a", "b", "b", "b", "b"]);
        let index = select_index(["b", "b", "a"], &lr).unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn test_within_group_admission_order() {
        let lr = last_run(&["x", "y"]);
        let index = select_index(["y", "x", "x"], &lr).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_long_history_keeps_one_entry_per_group() {
        let mut lr = LastRun::new();
        for i in 0..100_000 {
            lr.record(["a", "b", "c"][i % 3]);
        }
        assert_eq!(lr.len(), 3);

        // "a" started at 99_999, "b" at 99_997, "c" at 99_998
        let index = select_index(["a", "c", "b"], &lr).unwrap();
        assert_eq!(index, 2);
    }

    proptest! {
        #[test]
        fn prop_selected_group_never_more_recent_than_alternatives(
            pending in proptest::collection::vec("[a-d]", 1..20),
            past in proptest::collection::vec("[a-d]", 0..30),
        ) {
            let lr = LastRun::from_history(&past);
            let index = select_index(pending.iter().map(String::as_str), &lr).unwrap();
            prop_assert!(index < pending.len());

            let picked = pending[index].as_str();

            // First pending item of its group
            prop_assert!(pending[..index].iter().all(|g| g != picked));

            match lr.get(picked) {
                None => prop_assert!(pending[..index].iter().all(|g| lr.get(g).is_some())),
                Some(r) => {
                    for g in &pending {
                        match lr.get(g) {
                            Some(other) => prop_assert!(r <= other),
                            None => prop_assert!(false, "never-run group {} was skipped", g),
                        }
                    }
                }
            }
        }

        #[test]
        fn prop_distinct_fresh_groups_dispatched_before_repeats(groups in proptest::collection::vec("[a-e]", 1..15)) {
            let mut pending: Vec<String> = groups.clone();
            let mut lr = LastRun::new();
            let mut started = HashSet::new();
            let distinct: HashSet<String> = groups.iter().cloned().collect();

            for _ in 0..distinct.len() {
                let index = select_index(pending.iter().map(String::as_str), &lr).unwrap();
                let group = pending.remove(index);
                lr.record(&group);
                started.insert(group);
            }

            prop_assert_eq!(started.len(), distinct.len());
        }
    }
}
