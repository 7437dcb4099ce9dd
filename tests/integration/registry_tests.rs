use crate::{create_test_config, create_test_context};
use chrono::{Duration, Utc};
use pulse_feeds::output::collect_statuses;
use pulse_feeds::{CycleResult, SourceRegistry};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>Alpha</title>
<link>https://alpha.example.com/</link>
<description>test</description>
<item>
<title>hello</title>
<link>https://alpha.example.com/hello</link>
<pubDate>Mon, 01 Jul 2024 10:00:00 GMT</pubDate>
</item>
</channel></rss>"#;

fn create_test_registry(server: &MockServer) -> SourceRegistry {
    let config = create_test_config(&format!(
        r#"
[[sources]]
type = "rss"
title = "Working"
cache = "1h"
[[sources.feeds]]
url = "{base}/alpha.xml"

[[sources]]
type = "lobsters"
title = "Broken"
custom-url = "{base}/broken.json"
"#,
        base = server.uri()
    ));
    SourceRegistry::from_config(&config)
}

#[tokio::test]
async fn test_refresh_due_runs_every_new_source() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut registry = create_test_registry(&server);
    let now = Utc::now();

    let results = registry.refresh_due(&create_test_context(), now).await;
    let outcomes: Vec<CycleResult> = results.iter().map(|(_, r)| *r).collect();
    assert_eq!(outcomes, vec![CycleResult::Succeeded, CycleResult::Failed]);

    let statuses = collect_statuses(&registry);
    assert_eq!(statuses[0].label(), "ok");
    assert_eq!(statuses[0].items, 1);
    assert_eq!(statuses[1].label(), "failed");
    assert_eq!(statuses[1].retry_count, 1);
}

#[tokio::test]
async fn test_only_expired_sources_are_refreshed_again() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let mut registry = create_test_registry(&server);
    let ctx = create_test_context();

    registry.refresh_due(&ctx, Utc::now()).await;

    // The failed source retries after one minute; the healthy one waits an hour
    let later = Utc::now() + Duration::minutes(2);
    let due = registry.due(later);
    assert_eq!(due.len(), 1);
    assert_eq!(registry.get(due[0]).map(|s| s.title()), Some("Broken"));

    let results = registry.refresh_due(&ctx, later).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, due[0]);
}

#[tokio::test]
async fn test_failure_after_success_never_moves_next_due_backwards() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut registry = create_test_registry(&server);
    let ctx = create_test_context();
    let t0 = Utc::now();

    registry.refresh_due(&ctx, t0).await;
    let (rss_id, rss) = registry.iter().next().unwrap();
    let after_success = rss.state().next_due().unwrap();
    assert_eq!(after_success, t0 + Duration::hours(1));

    // Two hours later the feed is down; the retry is one minute after that time
    let later = t0 + Duration::hours(2);
    registry.refresh_due(&ctx, later).await;

    let state = registry.get(rss_id).unwrap().state();
    let after_failure = state.next_due().unwrap();
    assert_eq!(after_failure, later + Duration::minutes(1));
    assert!(after_failure > after_success);
    assert!(state.is_stale());
}
