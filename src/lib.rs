//! Pulse Feeds: cached, periodically refreshed content collections
//!
//! This crate aggregates content from forums, release registries and syndication
//! feeds. Every integration shares the same core: a bounded-concurrency task runner,
//! a fetch orchestrator that turns per-request failures into one degrade-gracefully
//! outcome, and a per-source state machine that decides when to refresh and how
//! aggressively to retry.

pub mod config;
pub mod http;
pub mod orchestrator;
pub mod output;
pub mod runner;
pub mod sources;
pub mod state;

use thiserror::Error;

/// Main error type for Pulse Feeds operations
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Unknown release source: {0}")]
    UnknownReleaseSource(String),
}

/// Result type alias for Pulse Feeds operations
pub type Result<T> = std::result::Result<T, PulseError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::{
    fetch_all, FetchError, FetchOptions, Fetched, MergeOrder, Outcome, PartialContent,
};
pub use runner::{BatchResult, Job, TaskError, TaskSetupError};
pub use sources::{Activity, RefreshContext, Source, SourceId, SourceRegistry};
pub use state::{CachePolicy, CycleResult, SourceState};
