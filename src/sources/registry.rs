use crate::config::Config;
use crate::sources::{RefreshContext, Source};
use crate::state::CycleResult;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::fmt;

/// Stable identifier of a registered source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns every configured source
///
/// Identifiers are handed out sequentially in registration order and never reused.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<(SourceId, Source)>,
    next_id: u64,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every source of a validated configuration, in file order
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for source in &config.sources {
            registry.register(Source::from_config(source));
        }
        registry
    }

    pub fn register(&mut self, source: Source) -> SourceId {
        self.next_id += 1;
        let id = SourceId(self.next_id);

        tracing::debug!(
            id = %id,
            kind = source.kind(),
            title = source.title(),
            "Registered source"
        );
        self.sources.push((id, source));
        id
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|(sid, _)| *sid == id).map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut Source> {
        self.sources.iter_mut().find(|(sid, _)| *sid == id).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &Source)> {
        self.sources.iter().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sources whose content should be refreshed at `now`
    ///
    /// A source that has never completed a cycle is always due, so sources with
    /// an infinite cache policy still load once.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<SourceId> {
        self.sources
            .iter()
            .filter(|(_, s)| is_due(s, now))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Refreshes every due source concurrently
    ///
    /// # Returns
    ///
    /// The cycle result of each refreshed source, in registration order
    pub async fn refresh_due(
        &mut self,
        ctx: &RefreshContext,
        now: DateTime<Utc>,
    ) -> Vec<(SourceId, CycleResult)> {
        let updates = self
            .sources
            .iter_mut()
            .filter(|(_, s)| is_due(s, now))
            .map(|(id, source)| {
                let id = *id;
                async move { (id, source.update(ctx, now).await) }
            });

        let results = join_all(updates).await;

        if !results.is_empty() {
            let failed = results.iter().filter(|(_, r)| *r == CycleResult::Failed).count();
            tracing::info!(refreshed = results.len(), failed, "Refresh pass complete");
        }

        results
    }
}

fn is_due(source: &Source, now: DateTime<Utc>) -> bool {
    source.state().never_run() || source.requires_update(now)
}
