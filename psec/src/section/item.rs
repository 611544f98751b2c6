//! Items admitted to a parallel section

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;

/// Deferred work run by the section once the item is dispatched
pub type ItemAction = BoxFuture<'static, eyre::Result<()>>;

/// One-shot side effect awaited at a lifecycle point of an item
pub type ItemHook = BoxFuture<'static, ()>;

/// A unit of work for a [`ParallelSection`](super::ParallelSection).
///
/// `key` identifies the item for de-duplication, `group_key` is the bucket
/// used by group-fair dispatch and `payload` is what `inspect()` reports.
pub struct RunnableItem<T> {
    pub key: String,
    pub group_key: String,
    pub payload: T,
    pub(crate) action: ItemAction,
    pub(crate) on_admitted: Option<ItemHook>,
    pub(crate) on_started: Option<ItemHook>,
}

impl<T> RunnableItem<T> {
    /// Create an item without hooks
    pub fn new<F>(key: impl Into<String>, group_key: impl Into<String>, payload: T, action: F) -> Self
    where
        F: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        Self {
            key: key.into(),
            group_key: group_key.into(),
            payload,
            action: action.boxed(),
            on_admitted: None,
            on_started: None,
        }
    }

    /// Awaited while the item is admitted, before it becomes visible to `inspect()`
    pub fn on_admitted<F>(mut self, hook: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.on_admitted = Some(hook.boxed());
        self
    }

    /// Awaited right before the action runs
    pub fn on_started<F>(mut self, hook: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.on_started = Some(hook.boxed());
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for RunnableItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableItem")
            .field("key", &self.key)
            .field("group_key", &self.group_key)
            .field("payload", &self.payload)
            .field("on_admitted", &self.on_admitted.is_some())
            .field("on_started", &self.on_started.is_some())
            .finish_non_exhaustive()
    }
}

/// Result of running one item
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub key: String,
    pub group_key: String,
    /// Position in completion order, starting at 1
    pub sequence: u64,
    /// Error message when the action returned an error or panicked
    pub result: Result<(), String>,
}

/// A failed item as reported by `drain()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub key: String,
    pub group_key: String,
    pub message: String,
}
