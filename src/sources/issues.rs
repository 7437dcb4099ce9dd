use crate::config::IssuesConfig;
use crate::http::{decode_json, RequestError};
use crate::orchestrator::{fetch_all, FeedEntry, FetchOptions, Fetched};
use crate::sources::text::one_line_title;
use crate::sources::{complete_cycle, resolve_limit, Activity, RefreshContext};
use crate::state::{CachePolicy, CycleResult, SourceState};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

const DEFAULT_TITLE: &str = "Issue Activity";
const DEFAULT_LIMIT: usize = 10;
const DEFAULT_API: &str = "https://api.github.com";
const WORKERS: usize = 20;

/// Issues and comments requested per repository and kind
const PER_PAGE: usize = 10;

/// Comments have no title; their body is cut to this many characters
const COMMENT_TITLE_LENGTH: usize = 40;

/// What happened on an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Opened,
    Closed,
    Commented,
}

impl ActivityKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "opened" => Some(ActivityKind::Opened),
            "closed" => Some(ActivityKind::Closed),
            "commented" => Some(ActivityKind::Commented),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Opened => "opened",
            ActivityKind::Closed => "closed",
            ActivityKind::Commented => "commented",
        }
    }
}

/// One issue or pull request event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueActivity {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub repository: String,
    pub issue_number: u64,
    pub kind: ActivityKind,
    pub is_pull_request: bool,
    pub updated_at: DateTime<Utc>,
}

impl IssueActivity {
    pub fn to_activity(&self) -> Activity {
        Activity {
            uid: self.id.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            url: self.url.clone(),
            image_url: None,
            created_at: self.updated_at,
        }
    }
}

impl FeedEntry for IssueActivity {
    fn identity(&self) -> &str {
        &self.id
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[derive(Debug, Clone)]
struct IssueRequest {
    repository: String,
    token: Option<String>,
}

impl fmt::Display for IssueRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository)
    }
}

/// Recent issue, pull request and comment activity across GitHub repositories
#[derive(Debug)]
pub struct IssuesSource {
    pub(crate) title: String,
    pub(crate) title_url: Option<String>,
    pub(crate) state: SourceState,
    pub(crate) items: Vec<IssueActivity>,
    limit: usize,
    requests: Vec<IssueRequest>,
    kinds: Arc<Vec<ActivityKind>>,
    api_base: Arc<String>,
}

impl IssuesSource {
    /// Builds the source; without a configured token `GITHUB_TOKEN` is used when set
    pub fn new(config: &IssuesConfig) -> Self {
        let policy = CachePolicy::from_default(
            CachePolicy::FixedDuration(Duration::minutes(30)),
            config.cache.map(|c| c.as_duration()),
        );

        let token = config
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.is_empty());

        let requests = config
            .repositories
            .iter()
            .map(|entry| IssueRequest {
                repository: entry.repository().trim().to_string(),
                token: token.clone(),
            })
            .collect();

        let mut kinds: Vec<ActivityKind> = config
            .activity_types
            .iter()
            .filter_map(|raw| ActivityKind::parse(raw))
            .collect();
        if kinds.is_empty() {
            kinds = vec![ActivityKind::Opened, ActivityKind::Closed, ActivityKind::Commented];
        }

        Self {
            title: config.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            title_url: config.title_url.clone(),
            state: SourceState::new(policy),
            items: Vec::new(),
            limit: resolve_limit(config.limit, DEFAULT_LIMIT),
            requests,
            kinds: Arc::new(kinds),
            api_base: Arc::new(DEFAULT_API.to_string()),
        }
    }

    /// Points the source at a different API root, without a trailing slash
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Arc::new(api_base.into());
        self
    }

    pub fn items(&self) -> &[IssueActivity] {
        &self.items
    }

    pub fn feed(&self) -> Vec<Activity> {
        self.items.iter().map(IssueActivity::to_activity).collect()
    }

    pub async fn update(&mut self, ctx: &RefreshContext, now: DateTime<Utc>) -> CycleResult {
        let fetched = self.fetch(ctx).await;
        complete_cycle(&self.title, &mut self.state, &mut self.items, fetched, self.limit, now)
    }

    async fn fetch(&self, ctx: &RefreshContext) -> Fetched<IssueActivity> {
        let options = FetchOptions::new(WORKERS).with_cancellation(ctx.cancel.clone());
        let client = ctx.client.clone();
        let kinds = Arc::clone(&self.kinds);
        let api_base = Arc::clone(&self.api_base);

        fetch_all(self.requests.clone(), options, move |request| {
            let client = client.clone();
            let kinds = Arc::clone(&kinds);
            let api_base = Arc::clone(&api_base);
            async move { fetch_repository_activity(&client, &api_base, &request, &kinds).await }
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct GithubIssue {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    state: String,
    html_url: String,
    #[serde(default)]
    updated_at: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GithubComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    issue_url: String,
    html_url: String,
    #[serde(default)]
    updated_at: String,
}

/// Issues of one repository, then its comments when they are wanted
///
/// Either request failing fails the whole repository.
async fn fetch_repository_activity(
    client: &Client,
    api_base: &str,
    request: &IssueRequest,
    kinds: &[ActivityKind],
) -> Result<Vec<IssueActivity>, RequestError> {
    let url = format!(
        "{}/repos/{}/issues?state=all&sort=updated&direction=desc&per_page={}",
        api_base, request.repository, PER_PAGE
    );
    let issues: Vec<GithubIssue> =
        decode_json(client, authorized(client.get(&url), request)).await?;

    let mut activities: Vec<IssueActivity> = issues
        .into_iter()
        .filter_map(|issue| issue_activity(&request.repository, issue))
        .filter(|activity| kinds.contains(&activity.kind))
        .collect();

    if kinds.contains(&ActivityKind::Commented) {
        let url = format!(
            "{}/repos/{}/issues/comments?sort=updated&direction=desc&per_page={}",
            api_base, request.repository, PER_PAGE
        );
        let comments: Vec<GithubComment> =
            decode_json(client, authorized(client.get(&url), request)).await?;

        activities.extend(
            comments
                .into_iter()
                .map(|comment| comment_activity(&request.repository, comment)),
        );
    }

    Ok(activities)
}

fn authorized(builder: reqwest::RequestBuilder, request: &IssueRequest) -> reqwest::RequestBuilder {
    match &request.token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Converts an issue; states other than open and closed are dropped
fn issue_activity(repository: &str, issue: GithubIssue) -> Option<IssueActivity> {
    let kind = match issue.state.as_str() {
        "open" => ActivityKind::Opened,
        "closed" => ActivityKind::Closed,
        _ => return None,
    };

    Some(IssueActivity {
        id: format!("{}/issue-{}", repository, issue.number),
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        url: issue.html_url,
        repository: repository.to_string(),
        issue_number: issue.number,
        kind,
        is_pull_request: issue.pull_request.is_some(),
        updated_at: parse_timestamp(&issue.updated_at),
    })
}

fn comment_activity(repository: &str, comment: GithubComment) -> IssueActivity {
    let body = comment.body.unwrap_or_default();

    // The issue number is the last segment of the issue API URL
    let issue_number = comment
        .issue_url
        .rsplit('/')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or_default();

    IssueActivity {
        id: format!("{}/comment-{}", repository, comment.id),
        title: one_line_title(&body, COMMENT_TITLE_LENGTH),
        body,
        url: comment.html_url,
        repository: repository.to_string(),
        issue_number,
        kind: ActivityKind::Commented,
        is_pull_request: false,
        updated_at: parse_timestamp(&comment.updated_at),
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}
