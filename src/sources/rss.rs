use crate::config::RssConfig;
use crate::http::{fetch_conditional, Conditional, RequestError, Validators};
use crate::orchestrator::{fetch_all, FeedEntry, FetchOptions, Fetched, MergeOrder};
use crate::sources::text::{collapse_whitespace, html_to_text, shorten_description};
use crate::sources::{complete_cycle, resolve_limit, Activity, RefreshContext};
use crate::state::{CachePolicy, CycleResult, SourceState};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

const DEFAULT_TITLE: &str = "RSS Feed";
const DEFAULT_LIMIT: usize = 25;

const TITLE_FALLBACK_LENGTH: usize = 100;
const DESCRIPTION_LENGTH: usize = 200;
const MAX_CATEGORIES: usize = 6;
const MAX_CATEGORY_LENGTH: usize = 30;

/// An entry of a syndication feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub image_url: Option<String>,
    pub categories: Vec<String>,
    pub channel_name: String,
    pub channel_url: String,
    pub published_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn to_activity(&self) -> Activity {
        Activity {
            uid: self.id.clone(),
            title: self.title.clone(),
            body: self.description.clone(),
            url: self.link.clone(),
            image_url: self.image_url.clone(),
            created_at: self.published_at,
        }
    }
}

impl FeedEntry for FeedItem {
    // Feeds that syndicate each other share links, not ids
    fn identity(&self) -> &str {
        &self.link
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

/// One feed to fetch, as configured
#[derive(Debug, Clone)]
struct FeedRequest {
    url: String,
    title: Option<String>,
    limit: Option<usize>,
    item_link_prefix: Option<String>,
    headers: HashMap<String, String>,
}

impl fmt::Display for FeedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Items of a feed plus the validators that produced them
#[derive(Debug, Clone)]
struct CachedFeed {
    validators: Validators,
    items: Vec<FeedItem>,
}

type FeedCache = Arc<Mutex<HashMap<String, CachedFeed>>>;

/// Aggregates several RSS or Atom feeds
#[derive(Debug)]
pub struct RssSource {
    pub(crate) title: String,
    pub(crate) title_url: Option<String>,
    pub(crate) state: SourceState,
    pub(crate) items: Vec<FeedItem>,
    limit: usize,
    preserve_order: bool,
    feeds: Vec<FeedRequest>,
    cache: FeedCache,
}

impl RssSource {
    pub fn new(config: &RssConfig) -> Self {
        let policy = CachePolicy::from_default(
            CachePolicy::FixedDuration(Duration::hours(2)),
            config.cache.map(|c| c.as_duration()),
        );

        let feeds = config
            .feeds
            .iter()
            .map(|feed| FeedRequest {
                url: feed.url.clone(),
                title: feed.title.clone().filter(|t| !t.is_empty()),
                limit: feed.limit.filter(|l| *l > 0),
                item_link_prefix: feed.item_link_prefix.clone().filter(|p| !p.is_empty()),
                headers: feed.headers.clone(),
            })
            .collect();

        Self {
            title: config.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            title_url: config.title_url.clone(),
            state: SourceState::new(policy),
            items: Vec::new(),
            limit: resolve_limit(config.limit, DEFAULT_LIMIT),
            preserve_order: config.preserve_order,
            feeds,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn feed(&self) -> Vec<Activity> {
        self.items.iter().map(FeedItem::to_activity).collect()
    }

    pub async fn update(&mut self, ctx: &RefreshContext, now: DateTime<Utc>) -> CycleResult {
        let fetched = self.fetch(ctx).await;
        complete_cycle(&self.title, &mut self.state, &mut self.items, fetched, self.limit, now)
    }

    async fn fetch(&self, ctx: &RefreshContext) -> Fetched<FeedItem> {
        let order = if self.preserve_order {
            MergeOrder::SourceOrder
        } else {
            MergeOrder::NewestFirst
        };
        let options = FetchOptions::default()
            .with_order(order)
            .with_cancellation(ctx.cancel.clone());

        let client = ctx.client.clone();
        let cache = Arc::clone(&self.cache);

        fetch_all(self.feeds.clone(), options, move |request| {
            fetch_feed(client.clone(), Arc::clone(&cache), request)
        })
        .await
    }
}

async fn fetch_feed(
    client: Client,
    cache: FeedCache,
    request: FeedRequest,
) -> Result<Vec<FeedItem>, RequestError> {
    let previous = cache.lock().await.get(&request.url).cloned();
    let validators = previous.as_ref().map(|c| &c.validators);

    match fetch_conditional(&client, &request.url, &request.headers, validators).await? {
        Conditional::NotModified => {
            tracing::debug!(url = %request.url, "Feed not modified, reusing cached items");
            Ok(previous.map(|c| c.items).unwrap_or_default())
        }
        Conditional::Modified { body, validators } => {
            let feed = parse_feed(&request.url, &body)?;
            let items = build_items(&request, feed, Utc::now());

            if !validators.is_empty() {
                cache.lock().await.insert(
                    request.url.clone(),
                    CachedFeed {
                        validators,
                        items: items.clone(),
                    },
                );
            }

            Ok(items)
        }
    }
}

/// Format-independent view of a parsed feed
#[derive(Debug, Default)]
struct ParsedFeed {
    title: String,
    link: String,
    image_url: Option<String>,
    entries: Vec<ParsedEntry>,
}

#[derive(Debug, Default)]
struct ParsedEntry {
    guid: Option<String>,
    title: String,
    link: String,
    description: String,
    categories: Vec<String>,
    image_url: Option<String>,
    published: Option<DateTime<Utc>>,
}

/// Parses RSS 2.0, falling back to Atom
fn parse_feed(url: &str, body: &str) -> Result<ParsedFeed, RequestError> {
    let rss_error = match body.parse::<rss::Channel>() {
        Ok(channel) => return Ok(from_rss(channel)),
        Err(e) => e,
    };

    match atom_syndication::Feed::read_from(body.as_bytes()) {
        Ok(feed) => Ok(from_atom(feed)),
        Err(atom_error) => Err(RequestError::Feed {
            url: url.to_string(),
            message: format!("not RSS ({}) or Atom ({})", rss_error, atom_error),
        }),
    }
}

fn from_rss(channel: rss::Channel) -> ParsedFeed {
    let entries = channel
        .items()
        .iter()
        .map(|item| {
            let published = item
                .pub_date()
                .and_then(parse_date)
                .or_else(|| {
                    item.dublin_core_ext()
                        .and_then(|dc| dc.dates().first())
                        .and_then(|d| parse_date(d))
                });

            let image_url = item
                .enclosure()
                .filter(|e| e.mime_type().starts_with("image/"))
                .map(|e| e.url().to_string())
                .or_else(|| item.extensions().get("media").and_then(|m| find_rss_thumbnail(m)));

            ParsedEntry {
                guid: item.guid().map(|g| g.value().to_string()),
                title: item.title().unwrap_or_default().to_string(),
                link: item.link().unwrap_or_default().to_string(),
                description: item.description().unwrap_or_default().to_string(),
                categories: item.categories().iter().map(|c| c.name().to_string()).collect(),
                image_url,
                published,
            }
        })
        .collect();

    ParsedFeed {
        title: channel.title().to_string(),
        link: channel.link().to_string(),
        image_url: channel.image().map(|i| i.url().to_string()),
        entries,
    }
}

fn from_atom(feed: atom_syndication::Feed) -> ParsedFeed {
    let entries = feed
        .entries()
        .iter()
        .map(|entry| {
            let link = entry
                .links()
                .iter()
                .find(|l| l.rel() == "alternate")
                .or_else(|| entry.links().first())
                .map(|l| l.href().to_string())
                .unwrap_or_default();

            let description = entry
                .summary()
                .map(|s| s.as_str().to_string())
                .or_else(|| entry.content().and_then(|c| c.value().map(str::to_string)))
                .unwrap_or_default();

            let published = entry
                .published()
                .unwrap_or_else(|| entry.updated())
                .with_timezone(&Utc);

            ParsedEntry {
                guid: Some(entry.id().to_string()).filter(|id| !id.is_empty()),
                title: entry.title().as_str().to_string(),
                link,
                description,
                categories: entry.categories().iter().map(|c| c.term().to_string()).collect(),
                image_url: entry.extensions().get("media").and_then(|m| find_atom_thumbnail(m)),
                published: Some(published),
            }
        })
        .collect();

    let link = feed
        .links()
        .iter()
        .find(|l| l.rel() == "alternate")
        .map(|l| l.href().to_string())
        .unwrap_or_default();

    ParsedFeed {
        title: feed.title().as_str().to_string(),
        link,
        image_url: feed.logo().or_else(|| feed.icon()).map(str::to_string),
        entries,
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .or_else(|_| DateTime::parse_from_rfc3339(raw.trim()))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn find_rss_thumbnail(
    extensions: &BTreeMap<String, Vec<rss::extension::Extension>>,
) -> Option<String> {
    for ext in extensions.values().flatten() {
        if ext.name().ends_with("thumbnail") || ext.name().ends_with("image") {
            if let Some(url) = ext.attrs().get("url") {
                return Some(url.clone());
            }
        }

        if let Some(url) = find_rss_thumbnail(ext.children()) {
            return Some(url);
        }
    }

    None
}

fn find_atom_thumbnail(
    extensions: &BTreeMap<String, Vec<atom_syndication::extension::Extension>>,
) -> Option<String> {
    for ext in extensions.values().flatten() {
        if ext.name().ends_with("thumbnail") || ext.name().ends_with("image") {
            if let Some(url) = ext.attrs().get("url") {
                return Some(url.clone());
            }
        }

        if let Some(url) = find_atom_thumbnail(ext.children()) {
            return Some(url);
        }
    }

    None
}

/// Turns parsed entries into display items
fn build_items(request: &FeedRequest, mut feed: ParsedFeed, now: DateTime<Utc>) -> Vec<FeedItem> {
    if let Some(limit) = request.limit {
        feed.entries.truncate(limit);
    }

    let channel_name = request.title.clone().unwrap_or_else(|| feed.title.clone());
    let channel_image = feed.image_url.as_deref().map(|url| {
        if url.starts_with('/') {
            format!("{}{}", feed.link.trim_end_matches('/'), url)
        } else {
            url.to_string()
        }
    });

    feed.entries
        .into_iter()
        .map(|entry| {
            let link = resolve_link(
                &entry.link,
                request.item_link_prefix.as_deref(),
                &feed.link,
                &request.url,
            );

            let title = if entry.title.is_empty() {
                shorten_description(&entry.description, TITLE_FALLBACK_LENGTH)
            } else {
                collapse_whitespace(&html_to_text(&entry.title))
            };

            let description = if entry.title.is_empty() {
                String::new()
            } else {
                shorten_description(&entry.description, DESCRIPTION_LENGTH)
            };

            let categories = entry
                .categories
                .into_iter()
                .filter(|c| !c.is_empty() && c.chars().count() <= MAX_CATEGORY_LENGTH)
                .take(MAX_CATEGORIES)
                .collect();

            FeedItem {
                id: entry.guid.unwrap_or_else(|| link.clone()),
                title,
                link,
                description,
                image_url: entry.image_url.or_else(|| channel_image.clone()),
                categories,
                channel_name: channel_name.clone(),
                channel_url: feed.link.clone(),
                published_at: entry.published.unwrap_or(now),
            }
        })
        .collect()
}

/// Makes an item link absolute
///
/// A configured prefix is always prepended. Relative links are resolved
/// against the origin of the channel link, or of the feed URL when the channel
/// link is not a valid URL.
fn resolve_link(link: &str, prefix: Option<&str>, channel_link: &str, feed_url: &str) -> String {
    if let Some(prefix) = prefix {
        return format!("{}{}", prefix, link);
    }

    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }

    let base = Url::parse(channel_link).or_else(|_| Url::parse(feed_url));

    match base {
        Ok(base) => {
            let path = if link.starts_with('/') {
                link.to_string()
            } else {
                format!("/{}", link)
            };
            format!("{}{}", base.origin().ascii_serialization(), path)
        }
        Err(_) => link.to_string(),
    }
}
