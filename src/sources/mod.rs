//! Feed integrations built on the fetch orchestrator
//!
//! Every source holds a [`SourceState`] and delegates its scheduling to it.
//! A refresh cycle fans out through [`crate::orchestrator::fetch_all`], and the
//! classified outcome decides whether the cached items are replaced.
//!
//! # Components
//!
//! - `Source`: Tagged dispatch over the supported integrations
//! - `SourceRegistry`: Owns every configured source and hands out identifiers
//! - `Activity`: The standardized item handed to presentation

mod forum;
mod hacker_news;
mod issues;
mod lobsters;
mod mastodon;
mod reddit;
mod registry;
mod releases;
mod rss;
pub mod text;

pub use forum::{calculate_engagement, sort_by_engagement, ForumPost};
pub use hacker_news::HackerNewsSource;
pub use issues::{ActivityKind, IssueActivity, IssuesSource};
pub use lobsters::LobstersSource;
pub use mastodon::MastodonSource;
pub use reddit::RedditSource;
pub use registry::{SourceId, SourceRegistry};
pub use releases::{Release, ReleaseEndpoints, ReleasesSource};
pub use rss::{FeedItem, RssSource};

use crate::config::SourceConfig;
use crate::orchestrator::{FeedEntry, Fetched};
use crate::state::{CycleResult, SourceState};
use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

/// A standardized feed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub uid: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedEntry for Activity {
    fn identity(&self) -> &str {
        &self.uid
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Shared handles passed to every refresh cycle
#[derive(Debug, Clone)]
pub struct RefreshContext {
    pub client: Client,
    pub cancel: CancellationToken,
}

impl RefreshContext {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A configured feed integration
#[derive(Debug)]
pub enum Source {
    Rss(RssSource),
    Releases(ReleasesSource),
    Lobsters(LobstersSource),
    HackerNews(HackerNewsSource),
    Mastodon(MastodonSource),
    Issues(IssuesSource),
    Reddit(RedditSource),
}

impl Source {
    /// Builds a source from its configuration
    pub fn from_config(config: &SourceConfig) -> Self {
        match config {
            SourceConfig::Rss(c) => Source::Rss(RssSource::new(c)),
            SourceConfig::Releases(c) => Source::Releases(ReleasesSource::new(c)),
            SourceConfig::Lobsters(c) => Source::Lobsters(LobstersSource::new(c)),
            SourceConfig::HackerNews(c) => Source::HackerNews(HackerNewsSource::new(c)),
            SourceConfig::Mastodon(c) => Source::Mastodon(MastodonSource::new(c)),
            SourceConfig::Issues(c) => Source::Issues(IssuesSource::new(c)),
            SourceConfig::Reddit(c) => Source::Reddit(RedditSource::new(c)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Source::Rss(_) => "rss",
            Source::Releases(_) => "releases",
            Source::Lobsters(_) => "lobsters",
            Source::HackerNews(_) => "hacker-news",
            Source::Mastodon(_) => "mastodon",
            Source::Issues(_) => "issues",
            Source::Reddit(_) => "reddit",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Source::Rss(s) => &s.title,
            Source::Releases(s) => &s.title,
            Source::Lobsters(s) => &s.title,
            Source::HackerNews(s) => &s.title,
            Source::Mastodon(s) => &s.title,
            Source::Issues(s) => &s.title,
            Source::Reddit(s) => &s.title,
        }
    }

    /// Link attached to the title, configured or the upstream home page
    pub fn title_url(&self) -> Option<&str> {
        match self {
            Source::Rss(s) => s.title_url.as_deref(),
            Source::Releases(s) => s.title_url.as_deref(),
            Source::Lobsters(s) => s.title_url.as_deref(),
            Source::HackerNews(s) => s.title_url.as_deref(),
            Source::Mastodon(s) => s.title_url.as_deref(),
            Source::Issues(s) => s.title_url.as_deref(),
            Source::Reddit(s) => s.title_url.as_deref(),
        }
    }

    pub fn state(&self) -> &SourceState {
        match self {
            Source::Rss(s) => &s.state,
            Source::Releases(s) => &s.state,
            Source::Lobsters(s) => &s.state,
            Source::HackerNews(s) => &s.state,
            Source::Mastodon(s) => &s.state,
            Source::Issues(s) => &s.state,
            Source::Reddit(s) => &s.state,
        }
    }

    /// Pure query: whether the cached content has expired
    pub fn requires_update(&self, now: DateTime<Utc>) -> bool {
        self.state().is_due(now)
    }

    /// Runs one refresh cycle; `now` is the time the schedule is computed from
    pub async fn update(&mut self, ctx: &RefreshContext, now: DateTime<Utc>) -> CycleResult {
        match self {
            Source::Rss(s) => s.update(ctx, now).await,
            Source::Releases(s) => s.update(ctx, now).await,
            Source::Lobsters(s) => s.update(ctx, now).await,
            Source::HackerNews(s) => s.update(ctx, now).await,
            Source::Mastodon(s) => s.update(ctx, now).await,
            Source::Issues(s) => s.update(ctx, now).await,
            Source::Reddit(s) => s.update(ctx, now).await,
        }
    }

    /// The cached items of the last successful or partial cycle
    pub fn feed(&self) -> Vec<Activity> {
        match self {
            Source::Rss(s) => s.feed(),
            Source::Releases(s) => s.feed(),
            Source::Lobsters(s) => s.feed(),
            Source::HackerNews(s) => s.feed(),
            Source::Mastodon(s) => s.feed(),
            Source::Issues(s) => s.feed(),
            Source::Reddit(s) => s.feed(),
        }
    }

    /// Number of cached items
    pub fn item_count(&self) -> usize {
        match self {
            Source::Rss(s) => s.items.len(),
            Source::Releases(s) => s.items.len(),
            Source::Lobsters(s) => s.items.len(),
            Source::HackerNews(s) => s.items.len(),
            Source::Mastodon(s) => s.items.len(),
            Source::Issues(s) => s.items.len(),
            Source::Reddit(s) => s.items.len(),
        }
    }
}

/// Resolves a configured limit, falling back to the type default when unset or zero
pub(crate) fn resolve_limit(configured: Option<usize>, default: usize) -> usize {
    match configured {
        Some(limit) if limit > 0 => limit,
        _ => default,
    }
}

/// Applies a fetched batch to a source
///
/// The scheduler consumes the outcome; the cached items are replaced unless the
/// cycle failed outright, in which case the previous items stay visible.
pub(crate) fn complete_cycle<T>(
    title: &str,
    state: &mut SourceState,
    items: &mut Vec<T>,
    fetched: Fetched<T>,
    limit: usize,
    now: DateTime<Utc>,
) -> CycleResult {
    let result = state.on_cycle_complete(&fetched.outcome, now);

    match result {
        CycleResult::Succeeded => {
            tracing::info!(source = title, items = fetched.items.len(), "Refreshed source");
        }
        CycleResult::PartiallyFailed => {
            tracing::warn!(
                source = title,
                items = fetched.items.len(),
                failed = fetched.failures.len(),
                "Refreshed source with missing content: {}",
                fetched.outcome
            );
        }
        CycleResult::Failed => {
            tracing::error!(
                source = title,
                kept = items.len(),
                "Failed to refresh source: {}",
                fetched.outcome
            );
            return result;
        }
    }

    let mut fresh = fetched.items;
    fresh.truncate(limit);
    *items = fresh;

    result
}
