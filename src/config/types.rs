use crate::config::duration::DurationValue;
use crate::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Main configuration structure for Pulse Feeds
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Shared HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout: DurationValue,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    format!("pulse-feeds/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> DurationValue {
    DurationValue::seconds(5)
}

/// Refresh loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// How often the binary checks for due sources
    #[serde(rename = "poll-interval", default = "default_poll_interval")]
    pub poll_interval: DurationValue,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> DurationValue {
    DurationValue::seconds(30)
}

/// One configured source, tagged by its `type` key
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceConfig {
    Rss(RssConfig),
    Releases(ReleasesConfig),
    Lobsters(LobstersConfig),
    HackerNews(HackerNewsConfig),
    Mastodon(MastodonConfig),
    Issues(IssuesConfig),
    Reddit(RedditConfig),
}

impl SourceConfig {
    /// The `type` key of this source
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Rss(_) => "rss",
            SourceConfig::Releases(_) => "releases",
            SourceConfig::Lobsters(_) => "lobsters",
            SourceConfig::HackerNews(_) => "hacker-news",
            SourceConfig::Mastodon(_) => "mastodon",
            SourceConfig::Issues(_) => "issues",
            SourceConfig::Reddit(_) => "reddit",
        }
    }

    /// The configured title, if any
    pub fn title(&self) -> Option<&str> {
        match self {
            SourceConfig::Rss(c) => c.title.as_deref(),
            SourceConfig::Releases(c) => c.title.as_deref(),
            SourceConfig::Lobsters(c) => c.title.as_deref(),
            SourceConfig::HackerNews(c) => c.title.as_deref(),
            SourceConfig::Mastodon(c) => c.title.as_deref(),
            SourceConfig::Issues(c) => c.title.as_deref(),
            SourceConfig::Reddit(c) => c.title.as_deref(),
        }
    }

    /// The configured title link, if any
    pub fn title_url(&self) -> Option<&str> {
        match self {
            SourceConfig::Rss(c) => c.title_url.as_deref(),
            SourceConfig::Releases(c) => c.title_url.as_deref(),
            SourceConfig::Lobsters(c) => c.title_url.as_deref(),
            SourceConfig::HackerNews(c) => c.title_url.as_deref(),
            SourceConfig::Mastodon(c) => c.title_url.as_deref(),
            SourceConfig::Issues(c) => c.title_url.as_deref(),
            SourceConfig::Reddit(c) => c.title_url.as_deref(),
        }
    }
}

/// RSS / Atom source
#[derive(Debug, Clone, Deserialize)]
pub struct RssConfig {
    pub title: Option<String>,

    /// Link attached to the title
    #[serde(rename = "title-url")]
    pub title_url: Option<String>,

    pub cache: Option<DurationValue>,
    pub limit: Option<usize>,

    /// Keep feed order instead of sorting newest first
    #[serde(rename = "preserve-order", default)]
    pub preserve_order: bool,

    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

/// A single syndication feed of an RSS source
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub url: String,

    /// Overrides the channel title
    pub title: Option<String>,

    /// Maximum number of items taken from this feed
    pub limit: Option<usize>,

    /// Prepended to every item link
    #[serde(rename = "item-link-prefix")]
    pub item_link_prefix: Option<String>,

    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Release tracking source
#[derive(Debug, Clone, Deserialize)]
pub struct ReleasesConfig {
    pub title: Option<String>,

    /// Link attached to the title
    #[serde(rename = "title-url")]
    pub title_url: Option<String>,

    pub cache: Option<DurationValue>,
    pub limit: Option<usize>,

    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,

    /// GitHub API token
    pub token: Option<String>,

    /// GitLab API token
    #[serde(rename = "gitlab-token")]
    pub gitlab_token: Option<String>,
}

/// A repository entry, either `"[prefix:]name"` or a table
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RepositoryEntry {
    Name(String),
    Detailed {
        repository: String,
        #[serde(rename = "include-prereleases", default)]
        include_prereleases: bool,
    },
}

impl RepositoryEntry {
    pub fn repository(&self) -> &str {
        match self {
            RepositoryEntry::Name(name) => name,
            RepositoryEntry::Detailed { repository, .. } => repository,
        }
    }

    pub fn include_prereleases(&self) -> bool {
        match self {
            RepositoryEntry::Name(_) => false,
            RepositoryEntry::Detailed {
                include_prereleases, ..
            } => *include_prereleases,
        }
    }

    /// Splits the entry into its release host and repository name
    ///
    /// Names without a prefix are GitHub repositories.
    pub fn parse(&self) -> Result<(ReleaseHost, String), ConfigError> {
        let raw = self.repository().trim();

        let (host, name) = match raw.split_once(':') {
            None => (ReleaseHost::Github, raw),
            Some((prefix, name)) => (ReleaseHost::from_prefix(prefix)?, name),
        };

        if name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Repository '{}' has an empty name",
                raw
            )));
        }

        Ok((host, name.to_string()))
    }
}

/// Where a release is published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseHost {
    Github,
    Gitlab,
    Codeberg,
    DockerHub,
}

impl ReleaseHost {
    fn from_prefix(prefix: &str) -> Result<Self, ConfigError> {
        match prefix {
            "github" => Ok(ReleaseHost::Github),
            "gitlab" => Ok(ReleaseHost::Gitlab),
            "codeberg" => Ok(ReleaseHost::Codeberg),
            "dockerhub" => Ok(ReleaseHost::DockerHub),
            other => Err(ConfigError::UnknownReleaseSource(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseHost::Github => "github",
            ReleaseHost::Gitlab => "gitlab",
            ReleaseHost::Codeberg => "codeberg",
            ReleaseHost::DockerHub => "dockerhub",
        }
    }
}

impl fmt::Display for ReleaseHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lobsters story list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LobstersSort {
    #[default]
    Hot,
    New,
}

/// Lobsters source
#[derive(Debug, Clone, Deserialize)]
pub struct LobstersConfig {
    pub title: Option<String>,

    /// Link attached to the title
    #[serde(rename = "title-url")]
    pub title_url: Option<String>,

    pub cache: Option<DurationValue>,
    pub limit: Option<usize>,

    #[serde(rename = "instance-url")]
    pub instance_url: Option<String>,

    /// Fetch this URL instead of an instance list
    #[serde(rename = "custom-url")]
    pub custom_url: Option<String>,

    #[serde(rename = "sort-by", default)]
    pub sort_by: LobstersSort,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Hacker News story list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HackerNewsSort {
    #[default]
    Top,
    New,
    Best,
}

impl HackerNewsSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            HackerNewsSort::Top => "top",
            HackerNewsSort::New => "new",
            HackerNewsSort::Best => "best",
        }
    }
}

/// Secondary ordering applied after fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraSort {
    Engagement,
}

/// Hacker News source
#[derive(Debug, Clone, Deserialize)]
pub struct HackerNewsConfig {
    pub title: Option<String>,

    /// Link attached to the title
    #[serde(rename = "title-url")]
    pub title_url: Option<String>,

    pub cache: Option<DurationValue>,
    pub limit: Option<usize>,

    #[serde(rename = "sort-by", default)]
    pub sort_by: HackerNewsSort,

    #[serde(rename = "extra-sort-by")]
    pub extra_sort_by: Option<ExtraSort>,

    /// Discussion URL template; `{POST-ID}` is replaced with the story id
    #[serde(rename = "comments-url-template")]
    pub comments_url_template: Option<String>,
}

/// Mastodon source
#[derive(Debug, Clone, Deserialize)]
pub struct MastodonConfig {
    pub title: Option<String>,

    /// Link attached to the title
    #[serde(rename = "title-url")]
    pub title_url: Option<String>,

    pub cache: Option<DurationValue>,
    pub limit: Option<usize>,

    #[serde(rename = "instance-url", default)]
    pub instance_url: String,

    #[serde(default)]
    pub accounts: Vec<String>,

    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// GitHub issue activity source
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesConfig {
    pub title: Option<String>,

    #[serde(rename = "title-url")]
    pub title_url: Option<String>,

    pub cache: Option<DurationValue>,
    pub limit: Option<usize>,

    #[serde(default)]
    pub repositories: Vec<IssueRepository>,

    /// GitHub API token
    pub token: Option<String>,

    /// Any of `opened`, `closed` and `commented`; empty means all three
    #[serde(rename = "activity-types", default)]
    pub activity_types: Vec<String>,
}

/// A repository entry, either `"owner/name"` or a table
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IssueRepository {
    Name(String),
    Detailed { repository: String },
}

impl IssueRepository {
    pub fn repository(&self) -> &str {
        match self {
            IssueRepository::Name(name) => name,
            IssueRepository::Detailed { repository } => repository,
        }
    }
}

/// Subreddit listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedditSort {
    #[default]
    Hot,
    New,
    Top,
    Rising,
}

impl RedditSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedditSort::Hot => "hot",
            RedditSort::New => "new",
            RedditSort::Top => "top",
            RedditSort::Rising => "rising",
        }
    }
}

/// Time window of the `top` listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedditPeriod {
    Hour,
    #[default]
    Day,
    Week,
    Month,
    Year,
    All,
}

impl RedditPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedditPeriod::Hour => "hour",
            RedditPeriod::Day => "day",
            RedditPeriod::Week => "week",
            RedditPeriod::Month => "month",
            RedditPeriod::Year => "year",
            RedditPeriod::All => "all",
        }
    }
}

/// Reddit source, read through the public JSON listings
#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    pub title: Option<String>,

    #[serde(rename = "title-url")]
    pub title_url: Option<String>,

    pub cache: Option<DurationValue>,
    pub limit: Option<usize>,

    #[serde(default)]
    pub subreddit: String,

    #[serde(rename = "sort-by", default)]
    pub sort_by: RedditSort,

    #[serde(rename = "top-period", default)]
    pub top_period: RedditPeriod,

    /// Search the subreddit instead of reading a listing
    pub search: Option<String>,

    #[serde(rename = "extra-sort-by")]
    pub extra_sort_by: Option<ExtraSort>,

    /// Discussion URL template with `{SUBREDDIT}`, `{POST-ID}` and `{POST-PATH}`
    #[serde(rename = "comments-url-template")]
    pub comments_url_template: Option<String>,

    /// Wraps the listing URL; `{REQUEST-URL}` is replaced with it
    #[serde(rename = "request-url-template")]
    pub request_url_template: Option<String>,

    #[serde(rename = "show-flairs", default)]
    pub show_flairs: bool,

    #[serde(rename = "show-thumbnails", default)]
    pub show_thumbnails: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_without_prefix_is_github() {
        let entry = RepositoryEntry::Name("tokio-rs/tokio".to_string());
        let (host, name) = entry.parse().unwrap();
        assert_eq!(host, ReleaseHost::Github);
        assert_eq!(name, "tokio-rs/tokio");
    }

    #[test]
    fn test_repository_prefixes() {
        let cases = [
            ("gitlab:inkscape/inkscape", ReleaseHost::Gitlab, "inkscape/inkscape"),
            ("codeberg:forgejo/forgejo", ReleaseHost::Codeberg, "forgejo/forgejo"),
            ("dockerhub:nginx:1.25", ReleaseHost::DockerHub, "nginx:1.25"),
        ];

        for (raw, host, name) in cases {
            let entry = RepositoryEntry::Name(raw.to_string());
            let (parsed_host, parsed_name) = entry.parse().unwrap();
            assert_eq!(parsed_host, host);
            assert_eq!(parsed_name, name);
        }
    }

    #[test]
    fn test_unknown_repository_prefix() {
        let result = RepositoryEntry::Name("sourcehut:~sir/hare".to_string()).parse();
        assert!(matches!(result, Err(ConfigError::UnknownReleaseSource(p)) if p == "sourcehut"));
    }

    #[test]
    fn test_detailed_repository_entry() {
        #[derive(Deserialize)]
        struct Wrapper {
            repositories: Vec<RepositoryEntry>,
        }

        let wrapper: Wrapper = toml::from_str(
            r#"
repositories = [
    "glanceapp/glance",
    { repository = "gitlab:fdroid/fdroidclient", include-prereleases = true },
]
"#,
        )
        .unwrap();

        assert!(!wrapper.repositories[0].include_prereleases());
        assert!(wrapper.repositories[1].include_prereleases());
        let (host, _) = wrapper.repositories[1].parse().unwrap();
        assert_eq!(host, ReleaseHost::Gitlab);
    }

    #[test]
    fn test_source_kind_tag() {
        let config: Config = toml::from_str(
            r#"
[[sources]]
type = "hacker-news"
sort-by = "best"
extra-sort-by = "engagement"
"#,
        )
        .unwrap();

        assert_eq!(config.sources[0].kind(), "hacker-news");
        match &config.sources[0] {
            SourceConfig::HackerNews(hn) => {
                assert_eq!(hn.sort_by, HackerNewsSort::Best);
                assert_eq!(hn.extra_sort_by, Some(ExtraSort::Engagement));
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_reddit_defaults_and_title_url() {
        let config: Config = toml::from_str(
            r#"
[[sources]]
type = "reddit"
subreddit = "rust"
title-url = "https://old.reddit.com/r/rust/"
"#,
        )
        .unwrap();

        assert_eq!(config.sources[0].kind(), "reddit");
        assert_eq!(config.sources[0].title_url(), Some("https://old.reddit.com/r/rust/"));
        match &config.sources[0] {
            SourceConfig::Reddit(reddit) => {
                assert_eq!(reddit.sort_by, RedditSort::Hot);
                assert_eq!(reddit.top_period, RedditPeriod::Day);
                assert!(!reddit.show_flairs);
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_issue_repository_entries() {
        let config: IssuesConfig = toml::from_str(
            r#"
repositories = ["tokio-rs/tokio", { repository = "rust-lang/rust" }]
activity-types = ["opened"]
"#,
        )
        .unwrap();

        let names: Vec<&str> = config.repositories.iter().map(|r| r.repository()).collect();
        assert_eq!(names, vec!["tokio-rs/tokio", "rust-lang/rust"]);
        assert_eq!(config.activity_types, vec!["opened"]);
        assert!(config.title_url.is_none());
    }

    #[test]
    fn test_http_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.http.user_agent.starts_with("pulse-feeds/"));
        assert_eq!(config.http.timeout, DurationValue::seconds(5));
        assert_eq!(config.refresh.poll_interval, DurationValue::seconds(30));
        assert!(config.sources.is_empty());
    }
}
