use crate::{create_test_config, create_test_context};
use chrono::Utc;
use pulse_feeds::config::{HackerNewsConfig, SourceConfig};
use pulse_feeds::sources::{HackerNewsSource, Source};
use pulse_feeds::{CycleResult, FetchError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hacker_news_config(extra: &str) -> HackerNewsConfig {
    let config = create_test_config(&format!("[[sources]]\ntype = \"hacker-news\"\n{}", extra));
    match &config.sources[0] {
        SourceConfig::HackerNews(c) => c.clone(),
        other => panic!("expected a hacker-news source, got {}", other.kind()),
    }
}

async fn mount_story(server: &MockServer, id: u64, title: &str, score: i64, comments: u32) {
    Mock::given(method("GET"))
        .and(path(format!("/item/{}.json", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "title": title,
            "score": score,
            "descendants": comments,
            "time": Utc::now().timestamp(),
            "url": format!("https://www.example.com/{}", id)
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_hacker_news_keeps_ranking_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/topstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([30, 10, 20])))
        .mount(&server)
        .await;

    mount_story(&server, 10, "second", 50, 5).await;
    mount_story(&server, 20, "third", 10, 1).await;
    mount_story(&server, 30, "first", 100, 40).await;

    let config = hacker_news_config("");
    let mut source = Source::HackerNews(HackerNewsSource::new(&config).with_api_base(server.uri()));

    let result = source.update(&create_test_context(), Utc::now()).await;
    assert_eq!(result, CycleResult::Succeeded);

    let feed = source.feed();
    let titles: Vec<&str> = feed.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second", "third"]);
    assert_eq!(feed[0].url, "https://www.example.com/30");
}

#[tokio::test]
async fn test_hacker_news_engagement_ranking() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/beststories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .mount(&server)
        .await;

    mount_story(&server, 1, "quiet", 2, 0).await;
    mount_story(&server, 2, "busy", 300, 120).await;

    let config = hacker_news_config("sort-by = \"best\"\nextra-sort-by = \"engagement\"\n");
    let mut source = Source::HackerNews(HackerNewsSource::new(&config).with_api_base(server.uri()));

    source.update(&create_test_context(), Utc::now()).await;

    let titles: Vec<String> = source.feed().into_iter().map(|a| a.title).collect();
    assert_eq!(titles, vec!["busy", "quiet"]);
}

#[tokio::test]
async fn test_hacker_news_id_list_failure_is_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/newstories.json"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let config = hacker_news_config("sort-by = \"new\"\n");
    let mut source = Source::HackerNews(HackerNewsSource::new(&config).with_api_base(server.uri()));

    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::Failed);
    assert_eq!(source.state().last_error(), Some(&FetchError::NoContent));
    assert!(!source.state().content_available());
}

#[tokio::test]
async fn test_lobsters_custom_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/t/rust.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "short_id": "xyz789",
            "created_at": "2024-07-01T09:00:00.000-05:00",
            "title": "Writing a feed reader",
            "url": "",
            "score": 12,
            "comment_count": 3,
            "comments_url": "https://lobste.rs/s/xyz789",
            "tags": ["rust"]
        }])))
        .mount(&server)
        .await;

    let config = create_test_config(&format!(
        "[[sources]]\ntype = \"lobsters\"\ncustom-url = \"{}/t/rust.json\"\n",
        server.uri()
    ));
    let mut source = Source::from_config(&config.sources[0]);

    assert_eq!(source.update(&create_test_context(), Utc::now()).await, CycleResult::Succeeded);

    let feed = source.feed();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].url, "https://lobste.rs/s/xyz789");
}

#[tokio::test]
async fn test_lobsters_empty_feed_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hottest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = create_test_config(&format!(
        "[[sources]]\ntype = \"lobsters\"\ninstance-url = \"{}\"\n",
        server.uri()
    ));
    let mut source = Source::from_config(&config.sources[0]);

    assert_eq!(source.update(&create_test_context(), Utc::now()).await, CycleResult::Failed);
    assert_eq!(source.item_count(), 0);
}
