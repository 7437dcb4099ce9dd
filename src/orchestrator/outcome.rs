use crate::runner::TaskSetupError;
use std::fmt;
use thiserror::Error;

/// Batch-level hard errors; fatal for the refresh cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("failed to dispatch fetch batch: {0}")]
    Setup(#[from] TaskSetupError),

    #[error("failed to retrieve any content")]
    NoContent,
}

/// Soft signal that some, but not all, requests of a batch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialContent {
    /// Number of failed requests
    pub failed: usize,

    /// Number of requests in the batch
    pub total: usize,
}

impl fmt::Display for PartialContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to retrieve some of the content: {} of {} requests failed",
            self.failed, self.total
        )
    }
}

/// Classified outcome of one fetch batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every request succeeded
    Success,

    /// Some requests failed; the successful subset is still usable
    PartialFailure(PartialContent),

    /// The cycle produced nothing usable
    TotalFailure(FetchError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialFailure(_))
    }

    pub fn is_total_failure(&self) -> bool {
        matches!(self, Self::TotalFailure(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PartialFailure(partial) => write!(f, "{}", partial),
            Self::TotalFailure(e) => write!(f, "{}", e),
        }
    }
}

/// Classifies a batch of `total` requests of which `failed` did not succeed
///
/// An empty batch counts as a total failure, since `failed == total` holds.
pub fn classify(total: usize, failed: usize) -> Outcome {
    if failed >= total {
        Outcome::TotalFailure(FetchError::NoContent)
    } else if failed > 0 {
        Outcome::PartialFailure(PartialContent { failed, total })
    } else {
        Outcome::Success
    }
}
