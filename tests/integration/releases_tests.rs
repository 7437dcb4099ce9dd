use crate::{create_test_config, create_test_context};
use chrono::Utc;
use pulse_feeds::config::SourceConfig;
use pulse_feeds::sources::{ReleaseEndpoints, ReleasesSource, Source};
use pulse_feeds::CycleResult;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn releases_source(server: &MockServer, repositories: &str) -> Source {
    let config = create_test_config(&format!(
        "[[sources]]\ntype = \"releases\"\ntoken = \"gh-secret\"\nrepositories = {}\n",
        repositories
    ));

    let SourceConfig::Releases(releases) = &config.sources[0] else {
        panic!("expected a releases source");
    };

    let base = server.uri();
    let endpoints = ReleaseEndpoints {
        github_api: base.clone(),
        gitlab_api: base.clone(),
        codeberg_api: base.clone(),
        dockerhub_api: base.clone(),
        dockerhub_web: base,
    };

    Source::Releases(ReleasesSource::new(releases).with_endpoints(endpoints))
}

#[tokio::test]
async fn test_releases_merged_newest_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/tokio-rs/tokio/releases/latest"))
        .and(header("authorization", "Bearer gh-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "1.38.0",
            "published_at": "2024-05-30T12:00:00Z",
            "html_url": "https://github.com/tokio-rs/tokio/releases/tag/1.38.0"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/forgejo/forgejo/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "V7.0.4",
            "published_at": "2024-06-10T08:00:00Z",
            "html_url": "https://codeberg.org/forgejo/forgejo/releases/tag/v7.0.4"
        })))
        .mount(&server)
        .await;

    let mut source = releases_source(&server, r#"["tokio-rs/tokio", "codeberg:forgejo/forgejo"]"#);
    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::Succeeded);

    let titles: Vec<String> = source.feed().into_iter().map(|a| a.title).collect();
    assert_eq!(titles, vec!["forgejo/forgejo v7.0.4", "tokio-rs/tokio v1.38.0"]);
}

#[tokio::test]
async fn test_missing_repository_is_a_partial_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/tokio-rs/tokio/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v1.38.0",
            "published_at": "2024-05-30T12:00:00Z",
            "html_url": "https://github.com/tokio-rs/tokio/releases/tag/v1.38.0"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/does-not/exist/releases/latest"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let mut source = releases_source(&server, r#"["tokio-rs/tokio", "does-not/exist"]"#);
    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::PartiallyFailed);
    assert_eq!(source.item_count(), 1);
    assert!(source.state().content_available());
    assert_eq!(source.state().retry_count(), 1);
}
