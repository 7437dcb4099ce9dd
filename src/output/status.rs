//! Per-source status summaries
//!
//! This module turns the scheduler state of every registered source into a
//! flat summary and prints it for the binary.

use crate::sources::{Source, SourceId, SourceRegistry};
use chrono::{DateTime, Utc};

/// Status summary of one source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub id: SourceId,
    pub title: String,
    pub title_url: Option<String>,
    pub kind: &'static str,

    /// Number of cached items
    pub items: usize,

    /// Whether the source has content worth showing
    pub content_available: bool,

    /// Hard error of the last cycle
    pub error: Option<String>,

    /// Soft notice of the last cycle
    pub notice: Option<String>,

    /// `None` until the first cycle completes
    pub next_due: Option<DateTime<Utc>>,

    pub retry_count: u32,
}

impl SourceStatus {
    pub fn from_source(id: SourceId, source: &Source) -> Self {
        let state = source.state();

        Self {
            id,
            title: source.title().to_string(),
            title_url: source.title_url().map(String::from),
            kind: source.kind(),
            items: source.item_count(),
            content_available: state.content_available(),
            error: state.last_error().map(ToString::to_string),
            notice: state.last_notice().map(ToString::to_string),
            next_due: state.next_due(),
            retry_count: state.retry_count(),
        }
    }

    /// Short one-word health label
    pub fn label(&self) -> &'static str {
        match (&self.error, &self.notice, self.content_available) {
            (Some(_), _, true) => "stale",
            (Some(_), _, false) => "failed",
            (None, Some(_), _) => "partial",
            (None, None, true) => "ok",
            (None, None, false) => "pending",
        }
    }
}

/// Collects the status of every registered source, in registration order
pub fn collect_statuses(registry: &SourceRegistry) -> Vec<SourceStatus> {
    registry
        .iter()
        .map(|(id, source)| SourceStatus::from_source(id, source))
        .collect()
}

/// Prints source statuses to stdout in a formatted manner
pub fn print_statuses(statuses: &[SourceStatus]) {
    println!("=== Source Status ===\n");

    for status in statuses {
        println!(
            "[{}] {} ({}): {}",
            status.id,
            status.title,
            status.kind,
            status.label()
        );
        if let Some(url) = &status.title_url {
            println!("  Link: {}", url);
        }
        println!("  Items: {}", status.items);

        match status.next_due {
            Some(due) if due == DateTime::<Utc>::MAX_UTC => println!("  Next refresh: never"),
            Some(due) => println!("  Next refresh: {}", due.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("  Next refresh: pending"),
        }

        if status.retry_count > 0 {
            println!("  Retries: {}", status.retry_count);
        }
        if let Some(error) = &status.error {
            println!("  Error: {}", error);
        }
        if let Some(notice) = &status.notice {
            println!("  Notice: {}", notice);
        }
        println!();
    }

    let healthy = statuses
        .iter()
        .filter(|s| s.error.is_none() && s.content_available)
        .count();
    println!("Healthy: {} / {} sources", healthy, statuses.len());
}
