//! Parallel section implementation

use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SectionConfig;
use super::error::SectionError;
use super::fairness::{self, LastRun};
use super::item::{ItemOutcome, RunnableItem};
use super::stats::{DrainReport, SectionState, SectionStats};

type TaskResult = Result<ItemOutcome, SectionError>;

/// An item that left the queue and is executing
struct ActiveEntry<T> {
    key: String,
    payload: T,
}

/// Internal state protected by mutex
struct SectionInner<T> {
    /// Items waiting for a permit, in admission order
    pending: VecDeque<RunnableItem<T>>,

    /// Items currently executing, in start order
    active: Vec<ActiveEntry<T>>,

    /// Keys of everything in `pending` or `active`
    known_keys: HashSet<String>,

    /// Group of every started item, in start order
    history: Vec<String>,

    /// Most recent start per group, kept alongside `history`
    last_run: LastRun,

    is_open: bool,

    /// Completion handles awaited by `drain()`
    tracked: Vec<JoinHandle<TaskResult>>,

    stats: SectionStats,
}

/// Bounded-concurrency section that de-duplicates items by key and can
/// dispatch fairly across groups.
///
/// Cloning is cheap and yields a handle to the same section.
pub struct ParallelSection<T> {
    concurrency_limit: usize,
    fairness_across_groups: bool,
    inner: Arc<Mutex<SectionInner<T>>>,
    permits: Arc<Semaphore>,
}

impl<T> Clone for ParallelSection<T> {
    fn clone(&self) -> Self {
        Self {
            concurrency_limit: self.concurrency_limit,
            fairness_across_groups: self.fairness_across_groups,
            inner: self.inner.clone(),
            permits: self.permits.clone(),
        }
    }
}

impl<T> ParallelSection<T>
where
    T: Clone + Send + 'static,
{
    /// Create a closed section; call [`open`](Self::open) before admitting
    pub fn new(concurrency_limit: usize, fairness_across_groups: bool) -> Result<Self, SectionError> {
        debug!(concurrency_limit, fairness_across_groups, "ParallelSection::new: called");
        if concurrency_limit == 0 {
            return Err(SectionError::InvalidConcurrency(concurrency_limit));
        }

        Ok(Self {
            concurrency_limit,
            fairness_across_groups,
            inner: Arc::new(Mutex::new(SectionInner {
                pending: VecDeque::new(),
                active: Vec::new(),
                known_keys: HashSet::new(),
                history: Vec::new(),
                last_run: LastRun::new(),
                is_open: false,
                tracked: Vec::new(),
                stats: SectionStats::default(),
            })),
            permits: Arc::new(Semaphore::new(concurrency_limit)),
        })
    }

    pub fn from_config(config: &SectionConfig) -> Result<Self, SectionError> {
        Self::new(config.concurrency_limit, config.fairness_across_groups)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn fairness_across_groups(&self) -> bool {
        self.fairness_across_groups
    }

    /// Start accepting admissions
    pub async fn open(&self) {
        debug!("ParallelSection::open: called");
        let mut inner = self.inner.lock().await;
        inner.is_open = true;
        info!(
            concurrency_limit = self.concurrency_limit,
            fairness = self.fairness_across_groups,
            "Parallel section opened"
        );
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.is_open
    }

    /// Queue items for execution and return how many were admitted.
    ///
    /// Keys repeated within `items`, or already pending or running, are
    /// dropped. Nothing is admitted while the section is closed. Does not
    /// wait for execution; use [`drain`](Self::drain) for that.
    pub async fn admit(&self, items: Vec<RunnableItem<T>>) -> usize {
        debug!(count = items.len(), "ParallelSection::admit: called");
        let mut inner = self.inner.lock().await;

        if !inner.is_open {
            inner.stats.total_rejected_closed += items.len() as u64;
            warn!(count = items.len(), "Cannot admit to a closed parallel section");
            return 0;
        }

        let mut batch_keys = HashSet::new();
        let mut admitted = Vec::with_capacity(items.len());
        for item in items {
            if !batch_keys.insert(item.key.clone()) || inner.known_keys.contains(&item.key) {
                debug!(key = %item.key, "ParallelSection::admit: key already known, dropping");
                inner.stats.total_duplicates += 1;
                continue;
            }
            admitted.push(item);
        }

        if admitted.is_empty() {
            debug!("ParallelSection::admit: nothing new to admit");
            return 0;
        }

        let mut count = 0;
        for mut item in admitted {
            if let Some(hook) = item.on_admitted.take()
                && let Err(panic) = AssertUnwindSafe(hook).catch_unwind().await
            {
                warn!(key = %item.key, message = %panic_message(panic), "Admission hook failed, dropping item");
                inner.stats.total_hook_failures += 1;
                continue;
            }

            // Item and its dispatch become visible together
            inner.known_keys.insert(item.key.clone());
            inner.pending.push_back(item);
            let section = self.clone();
            inner.tracked.push(tokio::spawn(section.dispatch_next()));
            count += 1;
        }

        inner.stats.total_admitted += count as u64;
        inner.stats.peak_pending = inner.stats.peak_pending.max(inner.pending.len());

        debug!(count, pending = inner.pending.len(), "ParallelSection::admit: admitted");
        count
    }

    /// Wait for a permit, move the selected item to active and run it
    async fn dispatch_next(self) -> TaskResult {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SectionError::PermitsClosed(e.to_string()))?;

        let (key, group_key, action, on_started) = {
            let mut inner = self.inner.lock().await;

            let selected = if self.fairness_across_groups {
                fairness::select_index(inner.pending.iter().map(|i| i.group_key.as_str()), &inner.last_run)
            } else if inner.pending.is_empty() {
                Err(SectionError::EmptyQueue)
            } else {
                Ok(0)
            };

            let item = match selected.map(|index| inner.pending.remove(index)) {
                Ok(Some(item)) => item,
                Ok(None) => {
                    error!("ParallelSection::dispatch_next: selected index out of range");
                    return Err(SectionError::EmptyQueue);
                }
                Err(e) => {
                    error!(error = %e, "ParallelSection::dispatch_next: no item to dispatch");
                    return Err(e);
                }
            };

            let RunnableItem {
                key,
                group_key,
                payload,
                action,
                on_started,
                ..
            } = item;

            inner.last_run.record(&group_key);
            inner.history.push(group_key.clone());
            inner.active.push(ActiveEntry {
                key: key.clone(),
                payload,
            });
            debug_assert!(inner.active.len() <= self.concurrency_limit);

            inner.stats.total_started += 1;
            inner.stats.peak_active = inner.stats.peak_active.max(inner.active.len());

            (key, group_key, action, on_started)
        };

        debug!(%key, %group_key, "ParallelSection::dispatch_next: started");
        let run = async move {
            if let Some(hook) = on_started {
                hook.await;
            }
            action.await
        };

        let result = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(panic) => Err(panic_message(panic)),
        };

        let sequence = {
            let mut inner = self.inner.lock().await;
            inner.active.retain(|entry| entry.key != key);
            inner.known_keys.remove(&key);
            inner.stats.total_completed += 1;
            if result.is_err() {
                inner.stats.total_failed += 1;
            }
            inner.stats.total_completed
        };
        drop(permit);

        match &result {
            Ok(()) => debug!(%key, "ParallelSection::dispatch_next: completed"),
            Err(message) => warn!(%key, %group_key, %message, "Item failed"),
        }

        Ok(ItemOutcome {
            key,
            group_key,
            sequence,
            result,
        })
    }

    /// Payloads of pending items (admission order) followed by running
    /// items (start order)
    pub async fn inspect(&self) -> Vec<T> {
        debug!("ParallelSection::inspect: called");
        let inner = self.inner.lock().await;

        inner
            .pending
            .iter()
            .map(|item| item.payload.clone())
            .chain(inner.active.iter().map(|entry| entry.payload.clone()))
            .collect()
    }

    /// Wait for every admitted item to finish, then close the section.
    ///
    /// Admissions made while draining are waited for as well. Returns the
    /// first invariant violation hit by a dispatch, if any.
    pub async fn drain(&self) -> Result<DrainReport, SectionError> {
        debug!("ParallelSection::drain: called");
        let mut outcomes = Vec::new();
        let mut fatal = None;

        loop {
            let handles = {
                let mut inner = self.inner.lock().await;
                if inner.tracked.is_empty() {
                    inner.is_open = false;
                    break;
                }
                std::mem::take(&mut inner.tracked)
            };

            debug!(count = handles.len(), "ParallelSection::drain: awaiting tracked tasks");
            for handle in handles {
                match handle.await {
                    Ok(Ok(outcome)) => outcomes.push(outcome),
                    Ok(Err(e)) => {
                        fatal.get_or_insert(e);
                    }
                    Err(e) => {
                        error!(error = %e, "ParallelSection::drain: tracked task did not join");
                        fatal.get_or_insert(SectionError::TaskJoin(e.to_string()));
                    }
                }
            }
        }

        let report = DrainReport::from_outcomes(outcomes);
        info!(
            completed = report.completed.len(),
            failed = report.failures.len(),
            "Parallel section drained and closed"
        );

        match fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Groups of started items in start order
    pub async fn history(&self) -> Vec<String> {
        self.inner.lock().await.history.clone()
    }

    pub async fn state(&self) -> SectionState {
        debug!("ParallelSection::state: called");
        let inner = self.inner.lock().await;

        SectionState {
            pending: inner.pending.len(),
            active: inner.active.len(),
            is_open: inner.is_open,
            history_len: inner.history.len(),
            stats: inner.stats.clone(),
        }
    }

    pub async fn stats(&self) -> SectionStats {
        self.inner.lock().await.stats.clone()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
