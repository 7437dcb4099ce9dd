use crate::config::types::{
    Config, HackerNewsConfig, HttpConfig, IssuesConfig, LobstersConfig, MastodonConfig,
    RedditConfig, RefreshConfig, ReleasesConfig, RssConfig, SourceConfig,
};
use crate::ConfigError;
use url::Url;

/// Placeholder replaced with the story id in Hacker News comment URLs
pub const POST_ID_PLACEHOLDER: &str = "{POST-ID}";

/// Placeholder replaced with the listing URL in Reddit request templates
pub const REQUEST_URL_PLACEHOLDER: &str = "{REQUEST-URL}";

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_refresh_config(&config.refresh)?;

    if config.sources.is_empty() {
        return Err(ConfigError::Validation(
            "At least one source must be configured".to_string(),
        ));
    }

    for source in &config.sources {
        if let Some(url) = source.title_url() {
            validate_http_url(url, "title-url")?;
        }

        match source {
            SourceConfig::Rss(c) => validate_rss(c)?,
            SourceConfig::Releases(c) => validate_releases(c)?,
            SourceConfig::Lobsters(c) => validate_lobsters(c)?,
            SourceConfig::HackerNews(c) => validate_hacker_news(c)?,
            SourceConfig::Mastodon(c) => validate_mastodon(c)?,
            SourceConfig::Issues(c) => validate_issues(c)?,
            SourceConfig::Reddit(c) => validate_reddit(c)?,
        }
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if !config.timeout.is_positive() {
        return Err(ConfigError::Validation(format!(
            "timeout must be positive, got {}",
            config.timeout
        )));
    }

    Ok(())
}

fn validate_refresh_config(config: &RefreshConfig) -> Result<(), ConfigError> {
    if !config.poll_interval.is_positive() {
        return Err(ConfigError::Validation(format!(
            "poll-interval must be positive, got {}",
            config.poll_interval
        )));
    }

    Ok(())
}

fn validate_rss(config: &RssConfig) -> Result<(), ConfigError> {
    if config.feeds.is_empty() {
        return Err(ConfigError::Validation(
            "RSS source must have at least one feed".to_string(),
        ));
    }

    for feed in &config.feeds {
        validate_http_url(&feed.url, "feed URL")?;
    }

    Ok(())
}

fn validate_releases(config: &ReleasesConfig) -> Result<(), ConfigError> {
    if config.repositories.is_empty() {
        return Err(ConfigError::Validation(
            "Releases source must have at least one repository".to_string(),
        ));
    }

    for entry in &config.repositories {
        entry.parse()?;
    }

    Ok(())
}

fn validate_lobsters(config: &LobstersConfig) -> Result<(), ConfigError> {
    if let Some(url) = &config.instance_url {
        validate_http_url(url, "instance-url")?;
    }

    if let Some(url) = &config.custom_url {
        validate_http_url(url, "custom-url")?;
    }

    Ok(())
}

fn validate_hacker_news(config: &HackerNewsConfig) -> Result<(), ConfigError> {
    if let Some(template) = &config.comments_url_template {
        if !template.contains(POST_ID_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "comments-url-template '{}' must contain {}",
                template, POST_ID_PLACEHOLDER
            )));
        }
    }

    Ok(())
}

fn validate_mastodon(config: &MastodonConfig) -> Result<(), ConfigError> {
    if config.instance_url.is_empty() {
        return Err(ConfigError::Validation(
            "Mastodon source requires instance-url".to_string(),
        ));
    }

    validate_http_url(&config.instance_url, "instance-url")?;

    if config.accounts.is_empty() && config.hashtags.is_empty() {
        return Err(ConfigError::Validation(
            "Mastodon source must list at least one account or hashtag".to_string(),
        ));
    }

    Ok(())
}

fn validate_issues(config: &IssuesConfig) -> Result<(), ConfigError> {
    if config.repositories.is_empty() {
        return Err(ConfigError::Validation(
            "Issues source must have at least one repository".to_string(),
        ));
    }

    for entry in &config.repositories {
        let valid = entry.repository().split_once('/').is_some_and(|(owner, name)| {
            !owner.is_empty() && !name.is_empty() && !name.contains('/')
        });

        if !valid {
            return Err(ConfigError::Validation(format!(
                "Repository '{}' must be in the form owner/name",
                entry.repository()
            )));
        }
    }

    for activity in &config.activity_types {
        if !matches!(activity.as_str(), "opened" | "closed" | "commented") {
            return Err(ConfigError::Validation(format!(
                "Unknown activity type '{}'",
                activity
            )));
        }
    }

    Ok(())
}

fn validate_reddit(config: &RedditConfig) -> Result<(), ConfigError> {
    if config.subreddit.trim().is_empty() {
        return Err(ConfigError::Validation(
            "Reddit source requires subreddit".to_string(),
        ));
    }

    if let Some(template) = &config.request_url_template {
        if !template.contains(REQUEST_URL_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "request-url-template '{}' must contain {}",
                template, REQUEST_URL_PLACEHOLDER
            )));
        }
    }

    Ok(())
}

/// Validates that a URL parses and uses the HTTP or HTTPS scheme
fn validate_http_url(raw: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            what, raw
        )));
    }

    Ok(())
}
