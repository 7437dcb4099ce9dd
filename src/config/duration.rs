use crate::ConfigError;
use chrono::Duration;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;

/// A duration written as `<number><unit>` in the configuration file
///
/// Supported units are `s`, `m`, `h` and `d`, e.g. `"30s"`, `"2h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct DurationValue(Duration);

impl DurationValue {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn seconds(seconds: i64) -> Self {
        Self(Duration::seconds(seconds))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Converts to a std duration; non-positive values become zero
    pub fn to_std(&self) -> std::time::Duration {
        self.0.to_std().unwrap_or(std::time::Duration::ZERO)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Duration::zero()
    }
}

impl TryFrom<String> for DurationValue {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_duration(&value).map(DurationValue)
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.num_seconds())
    }
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)(s|m|h|d)$")
            .unwrap_or_else(|err| panic!("invalid duration regex: {err}"))
    })
}

/// Parses a duration string such as `"90s"` or `"2h"`
///
/// # Arguments
///
/// * `value` - The duration string
///
/// # Returns
///
/// * `Ok(Duration)` - The parsed duration
/// * `Err(ConfigError::InvalidDuration)` - The string does not match `<number><s|m|h|d>`
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || {
        ConfigError::InvalidDuration(format!("'{}' (expected e.g. 30s, 5m, 2h, 1d)", value))
    };

    let captures = duration_pattern().captures(value.trim()).ok_or_else(invalid)?;
    let amount: i64 = captures[1].parse().map_err(|_| invalid())?;

    let seconds_per_unit = match &captures[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return Err(invalid()),
    };

    amount
        .checked_mul(seconds_per_unit)
        .and_then(Duration::try_seconds)
        .ok_or_else(invalid)
}
