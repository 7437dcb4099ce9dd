//! Fetch orchestration on top of the task runner
//!
//! This module turns a list of "what to fetch" descriptors into one merged
//! collection plus a single classified outcome:
//! - One task per descriptor, run with a worker cap
//! - Each failed task is logged with its descriptor and counted
//! - The batch is classified as success, partial content or no content
//! - Items are de-duplicated and ordered deterministically
//!
//! The orchestrator performs no caching and never retries.

mod merge;
mod outcome;

pub use merge::{merge, sort_by_newest, FeedEntry, MergeOrder};
pub use outcome::{classify, FetchError, Outcome, PartialContent};

use crate::runner::{self, Job, TaskError};
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Worker cap used by most integrations
pub const DEFAULT_FETCH_WORKERS: usize = 30;

/// Options for one orchestrated fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum number of concurrent requests
    pub workers: usize,

    /// How merged items are ordered
    pub order: MergeOrder,

    /// Cancellation signal for the whole batch
    pub cancel: CancellationToken,
}

impl FetchOptions {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            order: MergeOrder::NewestFirst,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_order(mut self, order: MergeOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_WORKERS)
    }
}

/// A single failed task, as reported to the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Position of the descriptor in the request list
    pub index: usize,

    /// Display form of the descriptor
    pub descriptor: String,

    /// Display form of the underlying error
    pub error: String,
}

/// Merged items plus the classified outcome of the batch
#[derive(Debug)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub outcome: Outcome,
    pub failures: Vec<TaskFailure>,
}

impl<T> Fetched<T> {
    /// A batch that produced nothing usable
    pub fn failed(error: FetchError) -> Self {
        Self {
            items: Vec::new(),
            outcome: Outcome::TotalFailure(error),
            failures: Vec::new(),
        }
    }

    /// Number of failed tasks in the batch
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

/// Fetches every descriptor concurrently and merges the results
///
/// # Classification
///
/// | Failed tasks | Outcome | Items |
/// |--------------|---------|-------|
/// | all (including an empty batch) | `TotalFailure(NoContent)` | none |
/// | some | `PartialFailure` | the successful subset |
/// | none | `Success` | everything |
///
/// A batch that cannot be dispatched yields `TotalFailure(Setup(..))`.
///
/// # Example
///
/// ```no_run
/// use pulse_feeds::orchestrator::{fetch_all, FeedEntry, FetchOptions};
/// use chrono::{DateTime, Utc};
///
/// struct Post { id: String, at: DateTime<Utc> }
///
/// impl FeedEntry for Post {
///     fn identity(&self) -> &str { &self.id }
///     fn published_at(&self) -> DateTime<Utc> { self.at }
/// }
///
/// # async fn example() {
/// let urls = vec!["https://a.example/feed".to_string(), "https://b.example/feed".to_string()];
/// let fetched = fetch_all(urls, FetchOptions::new(20), |url| async move {
///     Ok::<_, String>(vec![Post { id: url, at: Utc::now() }])
/// })
/// .await;
/// println!("{} items, outcome: {}", fetched.items.len(), fetched.outcome);
/// # }
/// ```
pub async fn fetch_all<D, T, E, F, Fut>(
    descriptors: Vec<D>,
    options: FetchOptions,
    task: F,
) -> Fetched<T>
where
    D: fmt::Display + Send + 'static,
    T: FeedEntry + Send + 'static,
    E: fmt::Display + Send + 'static,
    F: Fn(D) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
{
    let labels: Vec<String> = descriptors.iter().map(ToString::to_string).collect();
    let total = labels.len();

    let job = Job::new(descriptors)
        .with_workers(options.workers)
        .with_cancellation(options.cancel.clone());

    let batch = match runner::run(job, task).await {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!(error = %e, requests = total, "Failed to dispatch fetch batch");
            return Fetched::failed(FetchError::Setup(e));
        }
    };

    let mut succeeded = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (index, slot) in batch.into_slots().into_iter().enumerate() {
        match slot {
            Ok(items) => succeeded.push(items),
            Err(e) => failures.push(record_failure(index, &labels[index], &e)),
        }
    }

    let outcome = classify(total, failures.len());
    let items = if outcome.is_total_failure() {
        Vec::new()
    } else {
        merge(succeeded, options.order)
    };

    tracing::debug!(
        requests = total,
        failed = failures.len(),
        items = items.len(),
        "Fetch batch complete: {}",
        outcome
    );

    Fetched {
        items,
        outcome,
        failures,
    }
}

fn record_failure<E: fmt::Display>(
    index: usize,
    descriptor: &str,
    error: &TaskError<E>,
) -> TaskFailure {
    match error {
        TaskError::Cancelled => {
            tracing::warn!(index, descriptor, "Fetch cancelled");
        }
        _ => {
            tracing::error!(index, descriptor, error = %error, "Failed to fetch");
        }
    }

    TaskFailure {
        index,
        descriptor: descriptor.to_string(),
        error: error.to_string(),
    }
}
