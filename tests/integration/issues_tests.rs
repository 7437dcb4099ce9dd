use crate::{create_test_config, create_test_context};
use chrono::Utc;
use pulse_feeds::config::SourceConfig;
use pulse_feeds::sources::{IssuesSource, Source};
use pulse_feeds::CycleResult;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn issues_source(server: &MockServer, extra: &str) -> Source {
    let config = create_test_config(&format!(
        "[[sources]]\ntype = \"issues\"\ntoken = \"gh-secret\"\n{}",
        extra
    ));

    let SourceConfig::Issues(issues) = &config.sources[0] else {
        panic!("expected an issues source");
    };

    Source::Issues(IssuesSource::new(issues).with_api_base(server.uri()))
}

async fn mount_issues(server: &MockServer, repository: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/issues", repository)))
        .and(header("authorization", "Bearer gh-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "number": 12,
                "title": "Panic in the scheduler",
                "state": "open",
                "html_url": format!("https://github.com/{}/issues/12", repository),
                "updated_at": "2024-07-01T09:00:00Z",
                "body": "Steps to reproduce"
            },
            {
                "number": 11,
                "title": "Bump dependencies",
                "state": "closed",
                "html_url": format!("https://github.com/{}/pull/11", repository),
                "updated_at": "2024-06-28T09:00:00Z",
                "body": null,
                "pull_request": { "url": "https://api.github.com/pulls/11" }
            }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_issue_activity_merged_newest_first() {
    let server = MockServer::start().await;
    mount_issues(&server, "tokio-rs/tokio").await;

    Mock::given(method("GET"))
        .and(path("/repos/tokio-rs/tokio/issues/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 5001,
            "body": "Confirmed on main",
            "issue_url": "https://api.github.com/repos/tokio-rs/tokio/issues/12",
            "html_url": "https://github.com/tokio-rs/tokio/issues/12#issuecomment-5001",
            "updated_at": "2024-07-02T09:00:00Z"
        }])))
        .mount(&server)
        .await;

    let mut source = issues_source(&server, "repositories = [\"tokio-rs/tokio\"]\n");
    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::Succeeded);

    let titles: Vec<String> = source.feed().into_iter().map(|a| a.title).collect();
    assert_eq!(
        titles,
        vec!["Confirmed on main", "Panic in the scheduler", "Bump dependencies"]
    );
}

#[tokio::test]
async fn test_failed_repository_is_a_partial_failure() {
    let server = MockServer::start().await;
    mount_issues(&server, "tokio-rs/tokio").await;

    Mock::given(method("GET"))
        .and(path("/repos/tokio-rs/tokio/issues/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/gone/away/issues"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let mut source = issues_source(&server, "repositories = [\"tokio-rs/tokio\", \"gone/away\"]\n");
    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::PartiallyFailed);
    assert_eq!(source.item_count(), 2);
    assert_eq!(source.state().last_notice().map(|n| (n.failed, n.total)), Some((1, 2)));
}

#[tokio::test]
async fn test_comments_skipped_when_not_wanted() {
    let server = MockServer::start().await;
    mount_issues(&server, "tokio-rs/tokio").await;

    Mock::given(method("GET"))
        .and(path("/repos/tokio-rs/tokio/issues/comments"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut source = issues_source(
        &server,
        "repositories = [\"tokio-rs/tokio\"]\nactivity-types = [\"closed\"]\n",
    );
    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::Succeeded);
    let titles: Vec<String> = source.feed().into_iter().map(|a| a.title).collect();
    assert_eq!(titles, vec!["Bump dependencies"]);
}
