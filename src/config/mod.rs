//! Configuration module for Pulse Feeds
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pulse_feeds::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pulse.toml")).unwrap();
//! println!("Configured sources: {}", config.sources.len());
//! ```

mod duration;
mod parser;
mod types;
mod validation;

// Re-export types
pub use duration::{parse_duration, DurationValue};
pub use types::{
    Config, ExtraSort, FeedConfig, HackerNewsConfig, HackerNewsSort, HttpConfig, IssueRepository,
    IssuesConfig, LobstersConfig, LobstersSort, MastodonConfig, RedditConfig, RedditPeriod,
    RedditSort, RefreshConfig, ReleaseHost, ReleasesConfig, RepositoryEntry, RssConfig,
    SourceConfig,
};
pub use validation::{validate, POST_ID_PLACEHOLDER, REQUEST_URL_PLACEHOLDER};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
