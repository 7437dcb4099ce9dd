//! Integration tests for the refresh cycle
//!
//! These tests use wiremock to create mock HTTP servers and drive sources
//! through full refresh cycles end-to-end.

mod forum_tests;
mod issues_tests;
mod reddit_tests;
mod registry_tests;
mod releases_tests;
mod rss_tests;

use pulse_feeds::config::{parse_config, Config, HttpConfig};
use pulse_feeds::http::build_http_client;
use pulse_feeds::RefreshContext;

/// Parses a test configuration, panicking on invalid input
pub fn create_test_config(content: &str) -> Config {
    parse_config(content).expect("test config should be valid")
}

/// A refresh context with the default HTTP settings
pub fn create_test_context() -> RefreshContext {
    RefreshContext::new(build_http_client(&HttpConfig::default()).expect("client should build"))
}
