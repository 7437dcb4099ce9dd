//! Output module for reporting source health
//!
//! This module handles:
//! - Summarizing the scheduler state of every registered source
//! - Printing status reports for the binary

mod status;

pub use status::{collect_statuses, print_statuses, SourceStatus};
