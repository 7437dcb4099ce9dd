use crate::config::{ReleaseHost, ReleasesConfig};
use crate::http::{decode_json, RequestError};
use crate::orchestrator::{fetch_all, FeedEntry, FetchOptions, Fetched};
use crate::sources::text::normalize_version;
use crate::sources::{complete_cycle, resolve_limit, Activity, RefreshContext};
use crate::state::{CachePolicy, CycleResult, SourceState};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

const DEFAULT_TITLE: &str = "Releases";
const DEFAULT_LIMIT: usize = 10;
const WORKERS: usize = 20;

/// Base URLs of the release APIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEndpoints {
    pub github_api: String,
    pub gitlab_api: String,
    pub codeberg_api: String,
    pub dockerhub_api: String,
    pub dockerhub_web: String,
}

impl Default for ReleaseEndpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            gitlab_api: "https://gitlab.com/api/v4".to_string(),
            codeberg_api: "https://codeberg.org/api/v1".to_string(),
            dockerhub_api: "https://hub.docker.com/v2".to_string(),
            dockerhub_web: "https://hub.docker.com".to_string(),
        }
    }
}

/// The latest release of one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub key: String,
    pub host: ReleaseHost,
    pub name: String,
    pub version: String,
    pub notes_url: String,
    pub released_at: DateTime<Utc>,
    pub downvotes: u32,
}

impl Release {
    pub fn to_activity(&self) -> Activity {
        Activity {
            uid: self.key.clone(),
            title: format!("{} {}", self.name, self.version),
            body: format!("{} released {} on {}", self.name, self.version, self.host),
            url: self.notes_url.clone(),
            image_url: None,
            created_at: self.released_at,
        }
    }
}

impl FeedEntry for Release {
    fn identity(&self) -> &str {
        &self.key
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.released_at
    }
}

/// One repository to look up
#[derive(Debug, Clone)]
struct ReleaseRequest {
    host: ReleaseHost,
    repository: String,
    include_prereleases: bool,
    token: Option<String>,
}

impl fmt::Display for ReleaseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.repository)
    }
}

/// Tracks the latest releases of repositories across several hosts
#[derive(Debug)]
pub struct ReleasesSource {
    pub(crate) title: String,
    pub(crate) title_url: Option<String>,
    pub(crate) state: SourceState,
    pub(crate) items: Vec<Release>,
    limit: usize,
    requests: Vec<ReleaseRequest>,
    endpoints: Arc<ReleaseEndpoints>,
}

impl ReleasesSource {
    /// Builds the source; repositories with an unknown host are skipped
    pub fn new(config: &ReleasesConfig) -> Self {
        let policy = CachePolicy::from_default(
            CachePolicy::FixedDuration(Duration::hours(2)),
            config.cache.map(|c| c.as_duration()),
        );

        let requests = config
            .repositories
            .iter()
            .filter_map(|entry| match entry.parse() {
                Ok((host, repository)) => Some((host, repository, entry.include_prereleases())),
                Err(e) => {
                    tracing::warn!(
                        repository = entry.repository(),
                        error = %e,
                        "Skipping repository"
                    );
                    None
                }
            })
            .map(|(host, repository, include_prereleases)| {
                let token = match host {
                    ReleaseHost::Github => config.token.clone(),
                    ReleaseHost::Gitlab => config.gitlab_token.clone(),
                    _ => None,
                };

                ReleaseRequest {
                    host,
                    repository,
                    include_prereleases,
                    token: token.filter(|t| !t.is_empty()),
                }
            })
            .collect();

        Self {
            title: config.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            title_url: config.title_url.clone(),
            state: SourceState::new(policy),
            items: Vec::new(),
            limit: resolve_limit(config.limit, DEFAULT_LIMIT),
            requests,
            endpoints: Arc::new(ReleaseEndpoints::default()),
        }
    }

    /// Points the source at different API hosts
    pub fn with_endpoints(mut self, endpoints: ReleaseEndpoints) -> Self {
        self.endpoints = Arc::new(endpoints);
        self
    }

    pub fn items(&self) -> &[Release] {
        &self.items
    }

    pub fn feed(&self) -> Vec<Activity> {
        self.items.iter().map(Release::to_activity).collect()
    }

    pub async fn update(&mut self, ctx: &RefreshContext, now: DateTime<Utc>) -> CycleResult {
        let fetched = self.fetch(ctx).await;
        complete_cycle(&self.title, &mut self.state, &mut self.items, fetched, self.limit, now)
    }

    async fn fetch(&self, ctx: &RefreshContext) -> Fetched<Release> {
        let options = FetchOptions::new(WORKERS).with_cancellation(ctx.cancel.clone());
        let client = ctx.client.clone();
        let endpoints = Arc::clone(&self.endpoints);

        fetch_all(self.requests.clone(), options, move |request| {
            let client = client.clone();
            let endpoints = Arc::clone(&endpoints);
            async move {
                let release = fetch_latest_release(&client, &endpoints, &request).await?;
                Ok::<_, RequestError>(vec![release])
            }
        })
        .await
    }
}

async fn fetch_latest_release(
    client: &Client,
    endpoints: &ReleaseEndpoints,
    request: &ReleaseRequest,
) -> Result<Release, RequestError> {
    match request.host {
        ReleaseHost::Github => fetch_github_release(client, endpoints, request).await,
        ReleaseHost::Gitlab => fetch_gitlab_release(client, endpoints, request).await,
        ReleaseHost::Codeberg => fetch_codeberg_release(client, endpoints, request).await,
        ReleaseHost::DockerHub => fetch_dockerhub_release(client, endpoints, request).await,
    }
}

/// Parses an RFC 3339 timestamp, using the current time when it is missing or malformed
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    published_at: Option<String>,
    html_url: String,
    #[serde(default)]
    reactions: GithubReactions,
}

#[derive(Debug, Default, Deserialize)]
struct GithubReactions {
    #[serde(rename = "-1", default)]
    downvotes: u32,
}

async fn fetch_github_release(
    client: &Client,
    endpoints: &ReleaseEndpoints,
    request: &ReleaseRequest,
) -> Result<Release, RequestError> {
    let url = if request.include_prereleases {
        format!("{}/repos/{}/releases", endpoints.github_api, request.repository)
    } else {
        format!("{}/repos/{}/releases/latest", endpoints.github_api, request.repository)
    };

    let mut builder = client.get(&url);
    if let Some(token) = &request.token {
        builder = builder.bearer_auth(token);
    }

    let release: GithubRelease = if request.include_prereleases {
        let releases: Vec<GithubRelease> = decode_json(client, builder).await?;
        releases.into_iter().next().ok_or(RequestError::Empty { url })?
    } else {
        decode_json(client, builder).await?
    };

    Ok(Release {
        key: request.to_string(),
        host: ReleaseHost::Github,
        name: request.repository.clone(),
        version: normalize_version(&release.tag_name),
        notes_url: release.html_url,
        released_at: parse_timestamp(release.published_at.as_deref().unwrap_or_default()),
        downvotes: release.reactions.downvotes,
    })
}

#[derive(Debug, Deserialize)]
struct GitlabRelease {
    tag_name: String,
    #[serde(default)]
    released_at: String,
    #[serde(rename = "_links")]
    links: GitlabLinks,
}

#[derive(Debug, Deserialize)]
struct GitlabLinks {
    #[serde(rename = "self")]
    self_url: String,
}

async fn fetch_gitlab_release(
    client: &Client,
    endpoints: &ReleaseEndpoints,
    request: &ReleaseRequest,
) -> Result<Release, RequestError> {
    let project: String =
        url::form_urlencoded::byte_serialize(request.repository.as_bytes()).collect();
    let url = format!(
        "{}/projects/{}/releases/permalink/latest",
        endpoints.gitlab_api, project
    );

    let mut builder = client.get(&url);
    if let Some(token) = &request.token {
        builder = builder.header("PRIVATE-TOKEN", token);
    }

    let release: GitlabRelease = decode_json(client, builder).await?;

    Ok(Release {
        key: request.to_string(),
        host: ReleaseHost::Gitlab,
        name: request.repository.clone(),
        version: normalize_version(&release.tag_name),
        notes_url: release.links.self_url,
        released_at: parse_timestamp(&release.released_at),
        downvotes: 0,
    })
}

#[derive(Debug, Deserialize)]
struct CodebergRelease {
    tag_name: String,
    #[serde(default)]
    published_at: String,
    html_url: String,
}

async fn fetch_codeberg_release(
    client: &Client,
    endpoints: &ReleaseEndpoints,
    request: &ReleaseRequest,
) -> Result<Release, RequestError> {
    let url = format!(
        "{}/repos/{}/releases/latest",
        endpoints.codeberg_api, request.repository
    );

    let release: CodebergRelease = decode_json(client, client.get(&url)).await?;

    Ok(Release {
        key: request.to_string(),
        host: ReleaseHost::Codeberg,
        name: request.repository.clone(),
        version: normalize_version(&release.tag_name),
        notes_url: release.html_url,
        released_at: parse_timestamp(&release.published_at),
        downvotes: 0,
    })
}

#[derive(Debug, Deserialize)]
struct DockerHubTags {
    results: Vec<DockerHubTag>,
}

#[derive(Debug, Deserialize)]
struct DockerHubTag {
    name: String,
    #[serde(rename = "tag_last_pushed", default)]
    last_pushed: String,
}

/// A Docker Hub image reference split into its parts
#[derive(Debug, PartialEq, Eq)]
struct DockerImage<'a> {
    namespace: &'a str,
    repository: &'a str,
    tag: Option<&'a str>,
}

impl<'a> DockerImage<'a> {
    /// Parses `[namespace/]repository[:tag]`; official images live in `library`
    fn parse(raw: &'a str) -> Option<Self> {
        let (namespace, rest) = match raw.split('/').collect::<Vec<_>>().as_slice() {
            [name] => ("library", *name),
            [namespace, name] => (*namespace, *name),
            _ => return None,
        };

        let (repository, tag) = match rest.split_once(':') {
            Some((repository, tag)) => (repository, Some(tag)),
            None => (rest, None),
        };

        if namespace.is_empty() || repository.is_empty() {
            return None;
        }

        Some(Self {
            namespace,
            repository,
            tag,
        })
    }

    fn display_name(&self) -> String {
        if self.namespace == "library" {
            self.repository.to_string()
        } else {
            format!("{}/{}", self.namespace, self.repository)
        }
    }

    fn tag_page(&self, web: &str, tag: &str) -> String {
        if self.namespace == "library" {
            format!("{}/_/{}/tags?name={}", web, self.repository, tag)
        } else {
            format!("{}/r/{}/tags?name={}", web, self.display_name(), tag)
        }
    }
}

async fn fetch_dockerhub_release(
    client: &Client,
    endpoints: &ReleaseEndpoints,
    request: &ReleaseRequest,
) -> Result<Release, RequestError> {
    let image = DockerImage::parse(&request.repository).ok_or_else(|| RequestError::Feed {
        url: request.to_string(),
        message: format!("invalid repository name: {}", request.repository),
    })?;

    let tags_url = format!(
        "{}/namespaces/{}/repositories/{}/tags",
        endpoints.dockerhub_api, image.namespace, image.repository
    );

    let tag: DockerHubTag = match image.tag {
        Some(tag) => {
            let url = format!("{}/{}", tags_url, tag);
            decode_json(client, client.get(&url)).await?
        }
        None => {
            let tags: DockerHubTags = decode_json(client, client.get(&tags_url)).await?;
            tags.results
                .into_iter()
                .next()
                .ok_or(RequestError::Empty { url: tags_url })?
        }
    };

    Ok(Release {
        key: request.to_string(),
        host: ReleaseHost::DockerHub,
        name: image.display_name(),
        notes_url: image.tag_page(&endpoints.dockerhub_web, &tag.name),
        version: tag.name,
        released_at: parse_timestamp(&tag.last_pushed),
        downvotes: 0,
    })
}
