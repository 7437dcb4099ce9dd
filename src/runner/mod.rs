//! Bounded-concurrency task runner
//!
//! This module executes a batch of independent units of work with a worker cap:
//! - Results are written to index-addressed slots, so output order matches input order
//! - A failing or panicking task never aborts its siblings
//! - Cancellation stops dispatching new inputs and drops in-flight futures at their
//!   next await point
//!
//! The runner knows nothing about HTTP or feeds and never retries.

mod job;

pub use job::{BatchResult, Job, DEFAULT_WORKERS};

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinSet;

/// A batch that could not be dispatched at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskSetupError {
    #[error("job has a worker cap of zero")]
    NoWorkers,

    #[error("job was cancelled before dispatch")]
    Cancelled,
}

/// Why a single input did not produce a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError<E> {
    /// The unit of work returned an error
    Failed(E),

    /// The batch was cancelled before or while this input ran
    Cancelled,

    /// The unit of work panicked
    Panicked(String),

    /// The worker running this input terminated without reporting it
    Abandoned,
}

impl<E> TaskError<E> {
    /// Returns the underlying task error, if the task itself failed
    pub fn as_failure(&self) -> Option<&E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for TaskError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "{}", e),
            Self::Cancelled => write!(f, "task cancelled"),
            Self::Panicked(message) => write!(f, "task panicked: {}", message),
            Self::Abandoned => write!(f, "task abandoned by its worker"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TaskError<E> {}

type Slot<R, E> = (usize, Result<R, TaskError<E>>);

/// Runs `task` against every input of `job` with at most `job.workers` concurrent workers
///
/// # Behavior
///
/// | Condition | Result |
/// |-----------|--------|
/// | Worker cap is zero | `Err(TaskSetupError::NoWorkers)`, nothing runs |
/// | No inputs | `Ok` with an empty batch |
/// | Token already cancelled | `Err(TaskSetupError::Cancelled)`, nothing runs |
/// | Otherwise | `min(workers, n)` workers; one outcome per input, in input order |
///
/// Each input is run exactly once by exactly one worker. The call returns only after
/// every input has an outcome. A unit of work that blocks its thread without ever
/// yielding cannot be interrupted by cancellation.
///
/// # Example
///
/// ```no_run
/// use pulse_feeds::runner::{run, Job};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let job = Job::new(vec![1u64, 2, 3]).with_workers(2);
/// let batch = run(job, |n| async move { Ok::<_, String>(n * 2) }).await?;
/// assert_eq!(batch.len(), 3);
/// # Ok(())
/// # }
/// ```
pub async fn run<I, R, E, F, Fut>(job: Job<I>, task: F) -> Result<BatchResult<R, E>, TaskSetupError>
where
    I: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    if job.workers == 0 {
        return Err(TaskSetupError::NoWorkers);
    }

    let total = job.inputs.len();
    if total == 0 {
        return Ok(BatchResult::empty());
    }

    if job.cancel.is_cancelled() {
        return Err(TaskSetupError::Cancelled);
    }

    let workers = job.workers.min(total);
    tracing::trace!("Dispatching {} tasks to {} workers", total, workers);

    let queue = Arc::new(Mutex::new(job.inputs.into_iter().enumerate()));
    let task = Arc::new(task);
    let mut set: JoinSet<Vec<Slot<R, E>>> = JoinSet::new();

    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let task = Arc::clone(&task);
        let cancel = job.cancel.clone();

        set.spawn(async move {
            let mut completed = Vec::new();

            loop {
                if cancel.is_cancelled() {
                    break;
                }

                // The guard is released before the task is awaited
                let next = match queue.lock() {
                    Ok(mut pending) => pending.next(),
                    Err(poisoned) => poisoned.into_inner().next(),
                };

                let Some((index, input)) = next else {
                    break;
                };

                let unit = AssertUnwindSafe(task(input)).catch_unwind();
                let outcome = tokio::select! {
                    biased;
                    result = unit => match result {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(e)) => Err(TaskError::Failed(e)),
                        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
                    },
                    _ = cancel.cancelled() => Err(TaskError::Cancelled),
                };

                completed.push((index, outcome));
            }

            completed
        });
    }

    let mut slots: Vec<Option<Result<R, TaskError<E>>>> = (0..total).map(|_| None).collect();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(completed) => {
                for (index, outcome) in completed {
                    slots[index] = Some(outcome);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Task runner worker terminated unexpectedly");
            }
        }
    }

    let cancelled = job.cancel.is_cancelled();
    let slots = slots
        .into_iter()
        .map(|slot| match slot {
            Some(outcome) => outcome,
            None if cancelled => Err(TaskError::Cancelled),
            None => Err(TaskError::Abandoned),
        })
        .collect();

    Ok(BatchResult::from_slots(slots))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
