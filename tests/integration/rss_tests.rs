use crate::{create_test_config, create_test_context};
use chrono::Utc;
use pulse_feeds::sources::Source;
use pulse_feeds::{CycleResult, FetchError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rss_body(channel: &str, items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, date)| {
            format!(
                "<item><title>{title}</title>\
                 <link>https://{channel}.example.com/{title}</link>\
                 <pubDate>{date}</pubDate></item>"
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>{channel}</title>
<link>https://{channel}.example.com/</link>
<description>test</description>
{items}
</channel></rss>"#
    )
}

fn rss_source(server: &MockServer, paths: &[&str]) -> Source {
    let feeds: String = paths
        .iter()
        .map(|p| format!("[[sources.feeds]]\nurl = \"{}{}\"\n", server.uri(), p))
        .collect();

    let config = create_test_config(&format!(
        "[[sources]]\ntype = \"rss\"\ntitle = \"Blogs\"\n{}",
        feeds
    ));
    Source::from_config(&config.sources[0])
}

fn feed_items(source: &Source) -> Vec<String> {
    source.feed().into_iter().map(|a| a.title).collect()
}

#[tokio::test]
async fn test_rss_partial_failure_keeps_successful_feeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_body(
            "alpha",
            &[
                ("older", "Mon, 01 Jul 2024 10:00:00 GMT"),
                ("newest", "Wed, 03 Jul 2024 10:00:00 GMT"),
            ],
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let mut source = rss_source(&server, &["/alpha.xml", "/broken.xml"]);
    let result = source.update(&create_test_context(), Utc::now()).await;

    assert_eq!(result, CycleResult::PartiallyFailed);
    assert_eq!(feed_items(&source), vec!["newest", "older"]);

    let state = source.state();
    assert!(state.content_available());
    assert!(state.has_notice());
    assert!(!state.has_error());
    assert_eq!(state.retry_count(), 1);
    assert_eq!(state.last_notice().map(|n| (n.failed, n.total)), Some((1, 2)));
}

#[tokio::test]
async fn test_rss_total_failure_keeps_previous_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_body(
            "alpha",
            &[("kept", "Mon, 01 Jul 2024 10:00:00 GMT")],
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let ctx = create_test_context();
    let mut source = rss_source(&server, &["/alpha.xml"]);

    assert_eq!(source.update(&ctx, Utc::now()).await, CycleResult::Succeeded);
    assert_eq!(source.update(&ctx, Utc::now()).await, CycleResult::Failed);

    assert_eq!(feed_items(&source), vec!["kept"]);
    let state = source.state();
    assert!(state.is_stale());
    assert_eq!(state.last_error(), Some(&FetchError::NoContent));
    assert_eq!(state.retry_count(), 1);
}

#[tokio::test]
async fn test_rss_not_modified_reuses_cached_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/alpha.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v1\"")
                .set_body_string(rss_body("alpha", &[("cached", "Mon, 01 Jul 2024 10:00:00 GMT")])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let ctx = create_test_context();
    let mut source = rss_source(&server, &["/alpha.xml"]);

    assert_eq!(source.update(&ctx, Utc::now()).await, CycleResult::Succeeded);
    assert_eq!(source.update(&ctx, Utc::now()).await, CycleResult::Succeeded);
    assert_eq!(feed_items(&source), vec!["cached"]);
}
