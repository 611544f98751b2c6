//! Bulk helpers that run a closure over a list with bounded concurrency

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use eyre::{Result, eyre};
use tokio::sync::Mutex;
use tracing::debug;

use crate::section::{ParallelSection, RunnableItem};

/// Run `f(item, index)` for every item, at most `limit` at a time.
///
/// All items run even when some fail; the failure with the lowest index is
/// returned.
pub async fn for_each_with_limit<I, F, Fut>(items: Vec<I>, limit: usize, f: F) -> Result<()>
where
    I: Send + 'static,
    F: Fn(I, usize) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    map_with_limit(items, limit, f).await.map(|_| ())
}

/// Map every item through `f(item, index)`, at most `limit` at a time,
/// keeping input order in the output.
pub async fn map_with_limit<I, O, F, Fut>(items: Vec<I>, limit: usize, f: F) -> Result<Vec<O>>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I, usize) -> Fut,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    debug!(count = items.len(), limit, "map_with_limit: called");
    let section = ParallelSection::new(limit, false)?;
    section.open().await;

    let slots: Arc<Mutex<Vec<Option<Result<O>>>>> = Arc::new(Mutex::new((0..items.len()).map(|_| None).collect()));

    let batch = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let slots = slots.clone();
            let work = f(item, index);
            RunnableItem::new(index.to_string(), "", index, async move {
                let output = work.await;
                slots.lock().await[index] = Some(output);
                Ok(())
            })
        })
        .collect();

    section.admit(batch).await;
    let report = section.drain().await?;

    let panics: HashMap<String, String> = report.failures.into_iter().map(|f| (f.key, f.message)).collect();

    let slots = std::mem::take(&mut *slots.lock().await);
    let mut outputs = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok(output)) => outputs.push(output),
            Some(Err(e)) => return Err(e.wrap_err(format!("Item {} failed", index))),
            None => {
                let reason = panics.get(&index.to_string()).map(String::as_str).unwrap_or("did not run");
                return Err(eyre!("Item {} failed: {}", index, reason));
            }
        }
    }

    debug!(count = outputs.len(), "map_with_limit: complete");
    Ok(outputs)
}
