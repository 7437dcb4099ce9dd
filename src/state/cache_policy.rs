use chrono::{DateTime, Duration, DurationRound, Utc};

/// Upper bound for the retry counter of a source
pub const MAX_RETRIES: u32 = 5;

/// How long fetched content stays fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Never refreshed after the first load
    Infinite,

    /// Refreshed a fixed duration after each cycle
    FixedDuration(Duration),

    /// Refreshed at the next top of the hour
    OnTheHour,
}

impl CachePolicy {
    /// Resolves the policy for a source from its type default and a user override
    ///
    /// # Arguments
    ///
    /// * `default` - The policy of the source type
    /// * `override_duration` - The configured `cache` value, if any
    ///
    /// # Returns
    ///
    /// A fixed-duration policy when the override is set and positive, otherwise `default`
    pub fn from_default(default: CachePolicy, override_duration: Option<Duration>) -> Self {
        match override_duration {
            Some(d) if d > Duration::zero() => CachePolicy::FixedDuration(d),
            _ => default,
        }
    }

    /// The next time content cached at `now` expires
    pub fn next_due(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            CachePolicy::Infinite => DateTime::<Utc>::MAX_UTC,
            CachePolicy::FixedDuration(d) => {
                now.checked_add_signed(*d).unwrap_or(DateTime::<Utc>::MAX_UTC)
            }
            CachePolicy::OnTheHour => {
                let hour = Duration::hours(1);
                now.duration_trunc(hour).unwrap_or(now) + hour
            }
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, CachePolicy::Infinite)
    }
}

/// Early-retry delay after `retries` consecutive failed cycles
///
/// Grows quadratically in minutes and stops growing at [`MAX_RETRIES`].
pub fn backoff(retries: u32) -> Duration {
    let capped = i64::from(retries.min(MAX_RETRIES));
    Duration::minutes(capped * capped)
}
