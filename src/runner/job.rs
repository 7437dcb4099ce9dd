use crate::runner::TaskError;
use tokio_util::sync::CancellationToken;

/// Worker cap used when a job does not set one
pub const DEFAULT_WORKERS: usize = 10;

/// An ephemeral batch of independent inputs plus a worker-count limit
///
/// A job is created fresh for every refresh cycle and consumed by [`crate::runner::run`].
#[derive(Debug)]
pub struct Job<I> {
    pub(crate) inputs: Vec<I>,
    pub(crate) workers: usize,
    pub(crate) cancel: CancellationToken,
}

impl<I> Job<I> {
    /// Creates a job over `inputs` with the default worker cap
    pub fn new(inputs: Vec<I>) -> Self {
        Self {
            inputs,
            workers: DEFAULT_WORKERS,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the maximum number of concurrent workers
    ///
    /// A cap of zero makes the job malformed; [`crate::runner::run`] rejects it.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Attaches a cancellation token shared with the caller
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Number of inputs in the job
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Returns whether the job has no inputs
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The worker cap that was requested
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of workers that will actually be spawned
    pub fn effective_workers(&self) -> usize {
        self.workers.min(self.inputs.len()).max(1)
    }
}

/// Per-input outcomes of a job, in input order
///
/// `slot(i)` always corresponds to `inputs[i]` regardless of completion order.
#[derive(Debug)]
pub struct BatchResult<R, E> {
    slots: Vec<Result<R, TaskError<E>>>,
}

impl<R, E> BatchResult<R, E> {
    pub(crate) fn from_slots(slots: Vec<Result<R, TaskError<E>>>) -> Self {
        Self { slots }
    }

    /// An empty batch
    pub fn empty() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The outcome for input `index`
    pub fn get(&self, index: usize) -> Option<&Result<R, TaskError<E>>> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Result<R, TaskError<E>>> {
        self.slots.iter()
    }

    /// Number of inputs that did not produce a result
    pub fn failed_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_err()).count()
    }

    pub fn into_slots(self) -> Vec<Result<R, TaskError<E>>> {
        self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_uses_default_workers() {
        let job = Job::new(vec![1, 2, 3]);
        assert_eq!(job.workers(), DEFAULT_WORKERS);
        assert_eq!(job.len(), 3);
        assert!(!job.is_empty());
    }

    #[test]
    fn test_effective_workers_bounded_by_inputs() {
        assert_eq!(Job::new(vec![1, 2]).with_workers(30).effective_workers(), 2);
        assert_eq!(Job::new(vec![1; 50]).with_workers(30).effective_workers(), 30);
        assert_eq!(Job::<u8>::new(vec![]).with_workers(30).effective_workers(), 1);
    }

    #[test]
    fn test_failed_count() {
        let batch: BatchResult<u32, String> = BatchResult::from_slots(vec![
            Ok(1),
            Err(TaskError::Failed("boom".to_string())),
            Ok(3),
            Err(TaskError::Cancelled),
        ]);

        assert_eq!(batch.len(), 4);
        assert_eq!(batch.failed_count(), 2);
        assert!(matches!(batch.get(0), Some(Ok(1))));
        assert!(batch.get(4).is_none());
    }
}
