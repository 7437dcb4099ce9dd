use crate::config::MastodonConfig;
use crate::http::{decode_json, RequestError};
use crate::orchestrator::{fetch_all, FeedEntry, FetchOptions, Fetched, MergeOrder};
use crate::sources::text::{collapse_whitespace, html_to_text, one_line_title};
use crate::sources::{complete_cycle, resolve_limit, Activity, RefreshContext};
use crate::state::{CachePolicy, CycleResult, SourceState};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;

const DEFAULT_TITLE: &str = "Mastodon";
const DEFAULT_LIMIT: usize = 15;
const TITLE_LENGTH: usize = 50;

#[derive(Debug, Deserialize)]
struct Status {
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    reblogs_count: i64,
    #[serde(default)]
    favourites_count: i64,
    #[serde(default)]
    replies_count: u32,
    #[serde(default)]
    media_attachments: Vec<MediaAttachment>,
}

#[derive(Debug, Deserialize)]
struct MediaAttachment {
    #[serde(default)]
    url: Option<String>,
}

/// A status from an account or hashtag timeline
#[derive(Debug, Clone, PartialEq)]
pub struct MastodonPost {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub image_url: Option<String>,
    pub score: i64,
    pub reply_count: u32,
    pub posted_at: DateTime<Utc>,
}

impl MastodonPost {
    pub fn to_activity(&self) -> Activity {
        Activity {
            uid: self.id.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            url: self.url.clone(),
            image_url: self.image_url.clone(),
            created_at: self.posted_at,
        }
    }
}

impl FeedEntry for MastodonPost {
    fn identity(&self) -> &str {
        &self.id
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.posted_at
    }
}

/// One timeline to read
#[derive(Debug, Clone, PartialEq, Eq)]
enum Timeline {
    Account(String),
    Hashtag(String),
}

impl Timeline {
    fn url(&self, instance: &str) -> String {
        match self {
            Timeline::Account(id) => format!("{}/api/v1/accounts/{}/statuses", instance, id),
            Timeline::Hashtag(tag) => format!("{}/api/v1/timelines/tag/{}", instance, tag),
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeline::Account(id) => write!(f, "account {}", id),
            Timeline::Hashtag(tag) => write!(f, "#{}", tag),
        }
    }
}

/// Statuses from accounts and hashtags of one Mastodon instance
#[derive(Debug)]
pub struct MastodonSource {
    pub(crate) title: String,
    pub(crate) title_url: Option<String>,
    pub(crate) state: SourceState,
    pub(crate) items: Vec<MastodonPost>,
    limit: usize,
    instance_url: String,
    timelines: Vec<Timeline>,
}

impl MastodonSource {
    pub fn new(config: &MastodonConfig) -> Self {
        let policy = CachePolicy::from_default(
            CachePolicy::FixedDuration(Duration::minutes(30)),
            config.cache.map(|c| c.as_duration()),
        );

        let timelines = config
            .accounts
            .iter()
            .map(|a| Timeline::Account(a.clone()))
            .chain(
                config
                    .hashtags
                    .iter()
                    .map(|h| Timeline::Hashtag(h.trim_start_matches('#').to_string())),
            )
            .collect();

        Self {
            title: config.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            title_url: config
                .title_url
                .clone()
                .or_else(|| Some(config.instance_url.clone())),
            state: SourceState::new(policy),
            items: Vec::new(),
            limit: resolve_limit(config.limit, DEFAULT_LIMIT),
            instance_url: config.instance_url.trim_end_matches('/').to_string(),
            timelines,
        }
    }

    pub fn items(&self) -> &[MastodonPost] {
        &self.items
    }

    pub fn feed(&self) -> Vec<Activity> {
        self.items.iter().map(MastodonPost::to_activity).collect()
    }

    pub async fn update(&mut self, ctx: &RefreshContext, now: DateTime<Utc>) -> CycleResult {
        let fetched = self.fetch(ctx).await;
        complete_cycle(&self.title, &mut self.state, &mut self.items, fetched, self.limit, now)
    }

    async fn fetch(&self, ctx: &RefreshContext) -> Fetched<MastodonPost> {
        let options = FetchOptions::default()
            .with_order(MergeOrder::NewestFirst)
            .with_cancellation(ctx.cancel.clone());
        let client = ctx.client.clone();
        let instance = self.instance_url.clone();

        fetch_all(self.timelines.clone(), options, move |timeline| {
            let client = client.clone();
            let url = timeline.url(&instance);
            async move { fetch_timeline(&client, url).await }
        })
        .await
    }
}

async fn fetch_timeline(client: &Client, url: String) -> Result<Vec<MastodonPost>, RequestError> {
    let statuses: Vec<Status> = decode_json(client, client.get(&url)).await?;
    Ok(statuses.into_iter().map(into_post).collect())
}

fn into_post(status: Status) -> MastodonPost {
    let text = html_to_text(&status.content);

    MastodonPost {
        title: one_line_title(&text, TITLE_LENGTH),
        body: collapse_whitespace(&text),
        url: status.url.unwrap_or_default(),
        image_url: status.media_attachments.into_iter().find_map(|m| m.url),
        score: status.reblogs_count + status.favourites_count,
        reply_count: status.replies_count,
        posted_at: status.created_at,
        id: status.id,
    }
}
