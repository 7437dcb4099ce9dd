//! HTTP helpers shared by every source
//!
//! This module handles:
//! - Building the shared HTTP client with the configured user agent and timeout
//! - Performing a request and decoding a typed JSON response
//! - Conditional GET requests for syndication feeds (ETag / Last-Modified)
//! - Error classification (network failure, unexpected status, decode failure)

use crate::config::HttpConfig;
use reqwest::header::{HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of characters of an error response body kept for diagnostics
pub const ERROR_BODY_LIMIT: usize = 256;

/// Failure of a single upstream request
///
/// The orchestrator only counts these; they are logged with their descriptor.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to build request: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status code {status} from {url}, response: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse feed from {url}: {message}")]
    Feed { url: String, message: String },

    #[error("no entries returned from {url}")]
    Empty { url: String },
}

/// Builds the HTTP client shared by all sources
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use pulse_feeds::config::HttpConfig;
/// use pulse_feeds::http::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout.to_std())
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a request, mapping transport failures to [`RequestError`]
async fn send(
    client: &Client,
    request: RequestBuilder,
) -> Result<(String, Response), RequestError> {
    let request = request.build().map_err(RequestError::Build)?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(response) => Ok((url, response)),
        Err(source) => Err(RequestError::Network { url, source }),
    }
}

/// Reads the body of a response that is expected to be `200 OK`
async fn read_ok_body(url: String, response: Response) -> Result<(String, String), RequestError> {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(source) => return Err(RequestError::Network { url, source }),
    };

    if status != StatusCode::OK {
        return Err(RequestError::Status {
            status: status.as_u16(),
            url,
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }

    Ok((url, body))
}

/// Performs a request and decodes its JSON body
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `request` - The request to send, typically `client.get(url)` plus headers
///
/// # Returns
///
/// * `Ok(T)` - The decoded response
/// * `Err(RequestError)` - Network failure, non-200 status or malformed JSON
pub async fn decode_json<T: DeserializeOwned>(
    client: &Client,
    request: RequestBuilder,
) -> Result<T, RequestError> {
    let (url, response) = send(client, request).await?;
    let (url, body) = read_ok_body(url, response).await?;

    serde_json::from_str(&body).map_err(|source| RequestError::Decode { url, source })
}

/// Validators remembered from a previous successful feed response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Result of a conditional GET
#[derive(Debug)]
pub enum Conditional {
    /// The server answered `304 Not Modified`
    NotModified,

    /// A fresh body, with the validators to send next time
    Modified { body: String, validators: Validators },
}

/// Performs a GET that may be answered with `304 Not Modified`
///
/// `304` is only accepted when `previous` validators were sent; otherwise it is
/// reported as an unexpected status like any other non-200 response.
pub async fn fetch_conditional(
    client: &Client,
    url: &str,
    headers: &HashMap<String, String>,
    previous: Option<&Validators>,
) -> Result<Conditional, RequestError> {
    let mut request = client.get(url);

    if let Some(validators) = previous {
        if let Some(etag) = &validators.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &validators.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    for (key, value) in headers {
        request = request.header(key.as_str(), value.as_str());
    }

    let (url, response) = send(client, request).await?;

    if response.status() == StatusCode::NOT_MODIFIED && previous.is_some() {
        return Ok(Conditional::NotModified);
    }

    let header = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let validators = Validators {
        etag: header(ETAG),
        last_modified: header(LAST_MODIFIED),
    };

    let (_, body) = read_ok_body(url, response).await?;
    Ok(Conditional::Modified { body, validators })
}
