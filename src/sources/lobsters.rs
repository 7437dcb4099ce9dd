use crate::config::{LobstersConfig, LobstersSort};
use crate::http::{decode_json, RequestError};
use crate::orchestrator::{fetch_all, FetchOptions, Fetched, MergeOrder};
use crate::sources::forum::ForumPost;
use crate::sources::text::extract_domain;
use crate::sources::{complete_cycle, resolve_limit, Activity, RefreshContext};
use crate::state::{CachePolicy, CycleResult, SourceState};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

const DEFAULT_TITLE: &str = "Lobsters";
const DEFAULT_LIMIT: usize = 15;
const DEFAULT_INSTANCE: &str = "https://lobste.rs/";

#[derive(Debug, Deserialize)]
struct LobstersStory {
    #[serde(default)]
    short_id: String,
    #[serde(default)]
    created_at: String,
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    comment_count: u32,
    comments_url: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl LobstersStory {
    fn into_post(self) -> ForumPost {
        let posted_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_default();

        ForumPost {
            id: if self.short_id.is_empty() {
                self.comments_url.clone()
            } else {
                self.short_id
            },
            description: self.title.clone(),
            title: self.title,
            target_url_domain: extract_domain(&self.url),
            target_url: self.url,
            discussion_url: self.comments_url,
            thumbnail_url: None,
            comment_count: self.comment_count,
            score: self.score,
            engagement: 0.0,
            posted_at,
            tags: self.tags,
        }
    }
}

/// Stories from a Lobsters instance
#[derive(Debug)]
pub struct LobstersSource {
    pub(crate) title: String,
    pub(crate) title_url: Option<String>,
    pub(crate) state: SourceState,
    pub(crate) items: Vec<ForumPost>,
    limit: usize,
    feed_url: String,
}

impl LobstersSource {
    pub fn new(config: &LobstersConfig) -> Self {
        let policy = CachePolicy::from_default(
            CachePolicy::FixedDuration(Duration::hours(1)),
            config.cache.map(|c| c.as_duration()),
        );

        Self {
            title: config.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            title_url: config
                .title_url
                .clone()
                .or_else(|| Some(instance_url(config))),
            state: SourceState::new(policy),
            items: Vec::new(),
            limit: resolve_limit(config.limit, DEFAULT_LIMIT),
            feed_url: feed_url(config),
        }
    }

    pub fn items(&self) -> &[ForumPost] {
        &self.items
    }

    pub fn feed(&self) -> Vec<Activity> {
        self.items.iter().map(ForumPost::to_activity).collect()
    }

    pub async fn update(&mut self, ctx: &RefreshContext, now: DateTime<Utc>) -> CycleResult {
        let fetched = self.fetch(ctx).await;
        complete_cycle(&self.title, &mut self.state, &mut self.items, fetched, self.limit, now)
    }

    // A single request, still routed through the orchestrator so failures are
    // logged and classified like every other source
    async fn fetch(&self, ctx: &RefreshContext) -> Fetched<ForumPost> {
        let options = FetchOptions::new(1)
            .with_order(MergeOrder::SourceOrder)
            .with_cancellation(ctx.cancel.clone());
        let client = ctx.client.clone();

        fetch_all(vec![self.feed_url.clone()], options, move |url| {
            let client = client.clone();
            async move { fetch_stories(&client, url).await }
        })
        .await
    }
}

async fn fetch_stories(client: &Client, url: String) -> Result<Vec<ForumPost>, RequestError> {
    let stories: Vec<LobstersStory> = decode_json(client, client.get(&url)).await?;

    if stories.is_empty() {
        return Err(RequestError::Empty { url });
    }

    Ok(stories.into_iter().map(LobstersStory::into_post).collect())
}

/// The instance root, always ending in a slash
fn instance_url(config: &LobstersConfig) -> String {
    match config.instance_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => format!("{}/", url.trim_end_matches('/')),
        None => DEFAULT_INSTANCE.to_string(),
    }
}

/// Resolves the JSON feed to read
///
/// A custom URL wins; otherwise tags select `t/<tags>.json` and the sort
/// selects `hottest.json` or `newest.json` on the instance.
fn feed_url(config: &LobstersConfig) -> String {
    if let Some(custom) = config.custom_url.as_deref().filter(|u| !u.is_empty()) {
        return custom.to_string();
    }

    let instance = instance_url(config);

    if config.tags.is_empty() {
        let list = match config.sort_by {
            LobstersSort::Hot => "hottest",
            LobstersSort::New => "newest",
        };
        format!("{}{}.json", instance, list)
    } else {
        format!("{}t/{}.json", instance, config.tags.join(","))
    }
}
