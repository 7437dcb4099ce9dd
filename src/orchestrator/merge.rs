use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// An item that can be merged across the results of several requests
pub trait FeedEntry {
    /// Stable identity key; the first entry seen with a given key wins
    fn identity(&self) -> &str;

    /// Recency indicator used for newest-first ordering
    fn published_at(&self) -> DateTime<Utc>;
}

/// How merged items are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeOrder {
    /// Newest first; ties keep their insertion order
    #[default]
    NewestFirst,

    /// Insertion order, following the descriptor list
    SourceOrder,
}

/// Merges per-request item lists into one de-duplicated list
///
/// Batches are consumed in descriptor order and duplicate identities are dropped,
/// keeping the first one seen.
pub fn merge<T, B>(batches: B, order: MergeOrder) -> Vec<T>
where
    T: FeedEntry,
    B: IntoIterator<Item = Vec<T>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for batch in batches {
        for item in batch {
            if seen.insert(item.identity().to_string()) {
                merged.push(item);
            }
        }
    }

    if order == MergeOrder::NewestFirst {
        sort_by_newest(&mut merged);
    }

    merged
}

/// Stable newest-first sort
pub fn sort_by_newest<T: FeedEntry>(items: &mut [T]) {
    items.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
}
