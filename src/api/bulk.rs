//! Bulk fan-out
//!
//! One tokio task per item, joined behind a barrier. Every dispatched item
//! produces exactly one entry in the shared [`ResultList`], whatever happens
//! to its unit: completion, timeout, cancellation or panic.
//!
//! Without options the fan-out is unbounded and waits indefinitely on each
//! unit. [`BulkOptions`] makes the concurrency cap, the per-item deadline and
//! cancellation explicit opt-ins.

use crate::common::{Outcome, Progress, ResultList};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Message recorded for units stopped by cancellation
pub const CANCELLED: &str = "cancelled";

/// Tuning for bulk calls
#[derive(Debug, Clone, Default)]
pub struct BulkOptions {
    /// Maximum units running at once; `None` runs all items at once
    pub concurrency: Option<usize>,
    /// Deadline for each unit
    pub timeout: Option<Duration>,
    /// Stops pending and running units when triggered
    pub cancel: Option<CancellationToken>,
    /// Ticked once per recorded entry
    pub progress: Option<Progress>,
}

impl BulkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Run `work` for every keyed item and record each outcome in `results`
///
/// Returns once every unit has finished. Entries are keyed, not ordered.
pub(crate) async fn fan_out<I, T, F, Fut>(
    items: Vec<(String, I)>,
    options: &BulkOptions,
    results: &ResultList<T>,
    work: F,
) where
    I: Send + 'static,
    T: Outcome + Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let limiter = options.concurrency.map(|n| Arc::new(Semaphore::new(n.max(1))));
    tracing::debug!(
        "Dispatching {} units (limit: {:?}, timeout: {:?})",
        items.len(),
        options.concurrency,
        options.timeout
    );

    let mut keys = Vec::with_capacity(items.len());
    let mut handles = Vec::with_capacity(items.len());
    for (key, item) in items {
        let unit = work(item);
        let results = results.clone();
        let limiter = limiter.clone();
        let timeout = options.timeout;
        let cancel = options.cancel.clone().unwrap_or_default();
        let progress = options.progress.clone();
        let task_key = key.clone();

        handles.push(tokio::spawn(async move {
            let outcome = run_unit(unit, limiter, timeout, cancel).await;
            results.insert(task_key, outcome);
            if let Some(progress) = progress {
                progress.tick();
            }
        }));
        keys.push(key);
    }

    for (key, joined) in keys.into_iter().zip(join_all(handles).await) {
        if let Err(e) = joined {
            tracing::error!("Unit for {} did not complete: {}", key, e);
            results.insert(key, T::failed_with(format!("task failed: {}", e)));
            if let Some(progress) = &options.progress {
                progress.tick();
            }
        }
    }
}

async fn run_unit<T, Fut>(
    unit: Fut,
    limiter: Option<Arc<Semaphore>>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
) -> T
where
    T: Outcome,
    Fut: Future<Output = T>,
{
    let _permit = match limiter {
        Some(limiter) => tokio::select! {
            permit = limiter.acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(e) => return T::failed_with(e.to_string()),
            },
            _ = cancel.cancelled() => return T::failed_with(CANCELLED.to_string()),
        },
        None => None,
    };

    if cancel.is_cancelled() {
        return T::failed_with(CANCELLED.to_string());
    }

    let bounded = async move {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, unit).await {
                Ok(outcome) => outcome,
                Err(_) => T::failed_with(format!("timed out after {:?}", limit)),
            },
            None => unit.await,
        }
    };

    tokio::select! {
        outcome = bounded => outcome,
        _ = cancel.cancelled() => T::failed_with(CANCELLED.to_string()),
    }
}
