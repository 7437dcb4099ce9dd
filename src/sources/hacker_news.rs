use crate::config::{ExtraSort, HackerNewsConfig, HackerNewsSort, POST_ID_PLACEHOLDER};
use crate::http::{decode_json, RequestError};
use crate::orchestrator::{fetch_all, FetchError, FetchOptions, Fetched, MergeOrder};
use crate::sources::forum::{calculate_engagement, sort_by_engagement, ForumPost};
use crate::sources::text::extract_domain;
use crate::sources::{complete_cycle, resolve_limit, Activity, RefreshContext};
use crate::state::{CachePolicy, CycleResult, SourceState};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const DEFAULT_TITLE: &str = "Hacker News";
const DEFAULT_TITLE_URL: &str = "https://news.ycombinator.com/";
const DEFAULT_LIMIT: usize = 15;

/// Number of story ids looked up per cycle
const STORIES_PER_CYCLE: usize = 40;

const DEFAULT_API: &str = "https://hacker-news.firebaseio.com/v0";
const DEFAULT_COMMENTS_URL: &str = "https://news.ycombinator.com/item?id={POST-ID}";

#[derive(Debug, Deserialize)]
struct HackerNewsItem {
    id: u64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "descendants", default)]
    comment_count: u32,
    #[serde(rename = "time", default)]
    posted_at: i64,
}

/// Top, new or best stories from Hacker News
#[derive(Debug)]
pub struct HackerNewsSource {
    pub(crate) title: String,
    pub(crate) title_url: Option<String>,
    pub(crate) state: SourceState,
    pub(crate) items: Vec<ForumPost>,
    limit: usize,
    sort_by: HackerNewsSort,
    extra_sort_by: Option<ExtraSort>,
    comments_url_template: String,
    api_base: String,
}

impl HackerNewsSource {
    pub fn new(config: &HackerNewsConfig) -> Self {
        let policy = CachePolicy::from_default(
            CachePolicy::FixedDuration(Duration::minutes(30)),
            config.cache.map(|c| c.as_duration()),
        );

        Self {
            title: config.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            title_url: config
                .title_url
                .clone()
                .or_else(|| Some(DEFAULT_TITLE_URL.to_string())),
            state: SourceState::new(policy),
            items: Vec::new(),
            limit: resolve_limit(config.limit, DEFAULT_LIMIT),
            sort_by: config.sort_by,
            extra_sort_by: config.extra_sort_by,
            comments_url_template: config
                .comments_url_template
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_COMMENTS_URL.to_string()),
            api_base: DEFAULT_API.to_string(),
        }
    }

    /// Points the source at a different API root, without a trailing slash
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn items(&self) -> &[ForumPost] {
        &self.items
    }

    pub fn feed(&self) -> Vec<Activity> {
        self.items.iter().map(ForumPost::to_activity).collect()
    }

    pub async fn update(&mut self, ctx: &RefreshContext, now: DateTime<Utc>) -> CycleResult {
        let mut fetched = self.fetch(ctx).await;

        if self.extra_sort_by == Some(ExtraSort::Engagement) {
            calculate_engagement(&mut fetched.items, now);
            sort_by_engagement(&mut fetched.items);
        }

        complete_cycle(&self.title, &mut self.state, &mut self.items, fetched, self.limit, now)
    }

    async fn fetch(&self, ctx: &RefreshContext) -> Fetched<ForumPost> {
        let ids_url = format!("{}/{}stories.json", self.api_base, self.sort_by.as_str());

        let mut ids: Vec<u64> = match decode_json(&ctx.client, ctx.client.get(&ids_url)).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(
                    source = %self.title,
                    url = %ids_url,
                    error = %e,
                    "Failed to fetch list of story ids"
                );
                return Fetched::failed(FetchError::NoContent);
            }
        };
        ids.truncate(STORIES_PER_CYCLE);

        let item_urls: Vec<String> = ids
            .iter()
            .map(|id| format!("{}/item/{}.json", self.api_base, id))
            .collect();

        // Ranking order of the id list is kept
        let options = FetchOptions::default()
            .with_order(MergeOrder::SourceOrder)
            .with_cancellation(ctx.cancel.clone());
        let client = ctx.client.clone();
        let template = self.comments_url_template.clone();

        fetch_all(item_urls, options, move |url| {
            let client = client.clone();
            let template = template.clone();
            async move {
                let item: HackerNewsItem = decode_json(&client, client.get(&url)).await?;
                Ok::<_, RequestError>(vec![into_post(item, &template)])
            }
        })
        .await
    }
}

fn into_post(item: HackerNewsItem, comments_url_template: &str) -> ForumPost {
    let id = item.id.to_string();

    ForumPost {
        discussion_url: comments_url_template.replace(POST_ID_PLACEHOLDER, &id),
        id,
        description: item.title.clone(),
        title: item.title,
        target_url_domain: extract_domain(&item.url),
        target_url: item.url,
        thumbnail_url: None,
        comment_count: item.comment_count,
        score: item.score,
        engagement: 0.0,
        posted_at: DateTime::from_timestamp(item.posted_at, 0).unwrap_or_default(),
        tags: Vec::new(),
    }
}
