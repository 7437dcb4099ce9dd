//! State module for refresh scheduling
//!
//! This module provides the per-source state machine that decides when a
//! source is refreshed and how soon it is retried after errors.
//!
//! # Components
//!
//! - `CachePolicy`: How long fetched content stays fresh (infinite, fixed duration, on the hour)
//! - `SourceState`: Next due time, retry counter and content/error/notice flags of one source
//! - `backoff`: Early-retry delay after consecutive failed cycles

mod cache_policy;
mod source_state;

// Re-export main types
pub use cache_policy::{backoff, CachePolicy, MAX_RETRIES};
pub use source_state::{CycleResult, SourceState};
