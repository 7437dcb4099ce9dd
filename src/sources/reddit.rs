use crate::config::{ExtraSort, RedditConfig, RedditSort, REQUEST_URL_PLACEHOLDER};
use crate::http::{decode_json, RequestError};
use crate::orchestrator::{fetch_all, FetchOptions, Fetched, MergeOrder};
use crate::sources::forum::{calculate_engagement, sort_by_engagement, ForumPost};
use crate::sources::text::html_to_text;
use crate::sources::{complete_cycle, resolve_limit, Activity, RefreshContext};
use crate::state::{CachePolicy, CycleResult, SourceState};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 15;
const DEFAULT_API: &str = "https://www.reddit.com";
const WEB_BASE: &str = "https://www.reddit.com";

/// Listings return 25 posts unless asked for more
const LISTING_PAGE_SIZE: usize = 25;

/// Thumbnail values that are not URLs
const THUMBNAIL_KEYWORDS: [&str; 4] = ["self", "default", "nsfw", "spoiler"];

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    ups: i64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    created: f64,
    #[serde(default)]
    num_comments: u32,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    thumbnail: String,
    #[serde(default)]
    link_flair_text: Option<String>,
    #[serde(default)]
    crosspost_parent_list: Vec<CrosspostParent>,
}

#[derive(Debug, Deserialize)]
struct CrosspostParent {
    id: String,
    subreddit: String,
    permalink: String,
}

/// How listing entries become forum posts
#[derive(Debug)]
struct PostOptions {
    subreddit: String,
    comments_url_template: Option<String>,
    show_flairs: bool,
    show_thumbnails: bool,
}

impl PostOptions {
    fn discussion_url(&self, subreddit: &str, id: &str, permalink: &str) -> String {
        match &self.comments_url_template {
            Some(template) => template
                .replace("{SUBREDDIT}", subreddit)
                .replace("{POST-ID}", id)
                .replace("{POST-PATH}", permalink.trim_start_matches('/')),
            None => format!("{}{}", WEB_BASE, permalink),
        }
    }

    /// Converts a listing entry; stickied and pinned posts are dropped
    fn to_post(&self, post: RedditPost) -> Option<ForumPost> {
        if post.stickied || post.pinned {
            return None;
        }

        let mut forum_post = ForumPost {
            discussion_url: self.discussion_url(&self.subreddit, &post.id, &post.permalink),
            title: html_to_text(&post.title),
            description: post.selftext,
            target_url: if post.is_self { String::new() } else { post.url },
            target_url_domain: post.domain,
            thumbnail_url: None,
            comment_count: post.num_comments,
            score: post.ups,
            engagement: 0.0,
            posted_at: DateTime::from_timestamp(post.created as i64, 0).unwrap_or_default(),
            tags: Vec::new(),
            id: post.id,
        };

        if self.show_thumbnails
            && !post.thumbnail.is_empty()
            && !THUMBNAIL_KEYWORDS.contains(&post.thumbnail.as_str())
        {
            forum_post.thumbnail_url = Some(html_to_text(&post.thumbnail));
        }

        if self.show_flairs {
            if let Some(flair) = post.link_flair_text.filter(|f| !f.is_empty()) {
                forum_post.tags.push(flair);
            }
        }

        // A crosspost links to the original discussion
        if let Some(parent) = post.crosspost_parent_list.first() {
            forum_post.target_url_domain = format!("r/{}", parent.subreddit);
            forum_post.target_url =
                self.discussion_url(&parent.subreddit, &parent.id, &parent.permalink);
        }

        Some(forum_post)
    }
}

/// Posts of a subreddit, read from the public JSON listings
#[derive(Debug)]
pub struct RedditSource {
    pub(crate) title: String,
    pub(crate) title_url: Option<String>,
    pub(crate) state: SourceState,
    pub(crate) items: Vec<ForumPost>,
    limit: usize,
    extra_sort_by: Option<ExtraSort>,
    request_path: String,
    request_url_template: Option<String>,
    api_base: String,
    options: Arc<PostOptions>,
}

impl RedditSource {
    pub fn new(config: &RedditConfig) -> Self {
        let policy = CachePolicy::from_default(
            CachePolicy::FixedDuration(Duration::minutes(30)),
            config.cache.map(|c| c.as_duration()),
        );
        let subreddit = config.subreddit.trim().to_string();
        let limit = resolve_limit(config.limit, DEFAULT_LIMIT);

        Self {
            title: config.title.clone().unwrap_or_else(|| format!("r/{}", subreddit)),
            title_url: config
                .title_url
                .clone()
                .or_else(|| Some(format!("{}/r/{}/", WEB_BASE, subreddit))),
            state: SourceState::new(policy),
            items: Vec::new(),
            limit,
            extra_sort_by: config.extra_sort_by,
            request_path: request_path(config, &subreddit, limit),
            request_url_template: config
                .request_url_template
                .clone()
                .filter(|t| !t.is_empty()),
            api_base: DEFAULT_API.to_string(),
            options: Arc::new(PostOptions {
                subreddit,
                comments_url_template: config
                    .comments_url_template
                    .clone()
                    .filter(|t| !t.is_empty()),
                show_flairs: config.show_flairs,
                show_thumbnails: config.show_thumbnails,
            }),
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

    /// The URL requested each cycle
    pub fn request_url(&self) -> String {
        let url = format!("{}{}", self.api_base, self.request_path);

        match &self.request_url_template {
            Some(template) => template.replace(REQUEST_URL_PLACEHOLDER, &url),
            None => url,
        }
    }

    pub async fn update(&mut self, ctx: &RefreshContext, now: DateTime<Utc>) -> CycleResult {
        let mut fetched = self.fetch(ctx).await;

        // Only the posts that will be shown are ranked
        fetched.items.truncate(self.limit);
        if self.extra_sort_by == Some(ExtraSort::Engagement) {
            calculate_engagement(&mut fetched.items, now);
            sort_by_engagement(&mut fetched.items);
        }

        complete_cycle(&self.title, &mut self.state, &mut self.items, fetched, self.limit, now)
    }

    async fn fetch(&self, ctx: &RefreshContext) -> Fetched<ForumPost> {
        let options = FetchOptions::new(1)
            .with_order(MergeOrder::SourceOrder)
            .with_cancellation(ctx.cancel.clone());
        let client = ctx.client.clone();
        let post_options = Arc::clone(&self.options);

        fetch_all(vec![self.request_url()], options, move |url| {
            let client = client.clone();
            let post_options = Arc::clone(&post_options);
            async move { fetch_posts(&client, url, &post_options).await }
        })
        .await
    }
}

async fn fetch_posts(
    client: &Client,
    url: String,
    options: &PostOptions,
) -> Result<Vec<ForumPost>, RequestError> {
    let listing: Listing = decode_json(client, client.get(&url)).await?;

    if listing.data.children.is_empty() {
        return Err(RequestError::Empty { url });
    }

    Ok(listing
        .data
        .children
        .into_iter()
        .filter_map(|child| options.to_post(child.data))
        .collect())
}

/// Path and query of the listing or search request
fn request_path(config: &RedditConfig, subreddit: &str, limit: usize) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if limit > LISTING_PAGE_SIZE {
        query.append_pair("limit", &limit.to_string());
    }

    let path = match config.search.as_deref().filter(|s| !s.is_empty()) {
        Some(search) => {
            query.append_pair("q", &format!("{} subreddit:{}", search, subreddit));
            query.append_pair("sort", config.sort_by.as_str());
            "/search.json".to_string()
        }
        None => {
            if config.sort_by == RedditSort::Top {
                query.append_pair("t", config.top_period.as_str());
            }
            format!("/r/{}/{}.json", subreddit, config.sort_by.as_str())
        }
    };

    let query = query.finish();
    if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query)
    }
}
