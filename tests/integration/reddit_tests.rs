use crate::{create_test_config, create_test_context};
use chrono::Utc;
use pulse_feeds::config::SourceConfig;
use pulse_feeds::sources::{RedditSource, Source};
use pulse_feeds::{CycleResult, FetchError};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reddit_source(server: &MockServer, extra: &str) -> Source {
    let config = create_test_config(&format!(
        "[[sources]]\ntype = \"reddit\"\nsubreddit = \"rust\"\n{}",
        extra
    ));

    let SourceConfig::Reddit(reddit) = &config.sources[0] else {
        panic!("expected a reddit source");
    };

    Source::Reddit(RedditSource::new(reddit).with_api_base(server.uri()))
}

fn listing_entry(id: &str, title: &str, ups: i64, comments: u32, stickied: bool) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": title,
            "selftext": "",
            "ups": ups,
            "url": format!("https://www.example.com/{}", id),
            "created": Utc::now().timestamp() as f64,
            "num_comments": comments,
            "domain": "example.com",
            "permalink": format!("/r/rust/comments/{}/post/", id),
            "stickied": stickied,
            "is_self": false,
            "thumbnail": "default"
        }
    })
}

#[tokio::test]
async fn test_listing_skips_stickied_posts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/rust/hot.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": { "children": [
                listing_entry("a1", "Weekly questions thread", 5, 300, true),
                listing_entry("b2", "Announcing Rust 1.80", 900, 120, false),
                listing_entry("c3", "My first crate", 40, 12, false)
            ]}
        })))
        .mount(&server)
        .await;

    let mut source = reddit_source(&server, "");
    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::Succeeded);

    let feed = source.feed();
    let titles: Vec<&str> = feed.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Announcing Rust 1.80", "My first crate"]);
    assert_eq!(feed[0].url, "https://www.example.com/b2");
    assert_eq!(source.title_url(), Some("https://www.reddit.com/r/rust/"));
}

#[tokio::test]
async fn test_top_listing_ranked_by_engagement() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/rust/top.json"))
        .and(query_param("t", "week"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "children": [
                listing_entry("q1", "quiet", 3, 0, false),
                listing_entry("b1", "busy", 500, 200, false)
            ]}
        })))
        .mount(&server)
        .await;

    let mut source = reddit_source(
        &server,
        "sort-by = \"top\"\ntop-period = \"week\"\nextra-sort-by = \"engagement\"\n",
    );
    source.update(&create_test_context(), Utc::now()).await;

    let titles: Vec<String> = source.feed().into_iter().map(|a| a.title).collect();
    assert_eq!(titles, vec!["busy", "quiet"]);
}

#[tokio::test]
async fn test_empty_listing_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/rust/new.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "children": [] }
        })))
        .mount(&server)
        .await;

    let mut source = reddit_source(&server, "sort-by = \"new\"\n");
    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::Failed);
    assert_eq!(source.state().last_error(), Some(&FetchError::NoContent));
    assert_eq!(source.item_count(), 0);
}
