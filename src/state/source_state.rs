use super::cache_policy::{backoff, CachePolicy, MAX_RETRIES};
use crate::orchestrator::{FetchError, Outcome, PartialContent};
use chrono::{DateTime, Utc};

/// Result of one completed refresh cycle, as seen by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleResult {
    Succeeded,
    PartiallyFailed,
    Failed,
}

/// Refresh schedule and health of a single source
///
/// A source state is created once when the configuration is loaded and is
/// only mutated by the refresh cycles of its own source, one at a time.
#[derive(Debug, Clone)]
pub struct SourceState {
    /// How long fetched content stays fresh
    policy: CachePolicy,

    /// When the next refresh is due; `None` until the first cycle ran
    next_due: Option<DateTime<Utc>>,

    /// Consecutive unsuccessful cycles, capped at [`MAX_RETRIES`]
    retry_count: u32,

    /// Whether any cycle has produced displayable content
    content_available: bool,

    /// Hard error of the last cycle
    last_error: Option<FetchError>,

    /// Soft notice of the last cycle
    last_notice: Option<PartialContent>,

    /// When a cycle last produced content
    last_refreshed: Option<DateTime<Utc>>,
}

impl SourceState {
    /// Creates the state of a source that has never been refreshed
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            next_due: None,
            retry_count: 0,
            content_available: false,
            last_error: None,
            last_notice: None,
            last_refreshed: None,
        }
    }

    /// Checks whether the source should be refreshed
    ///
    /// Sources with an infinite cache are never due; a source that has
    /// never run is due immediately. Pure query, no side effects.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.policy.is_infinite() {
            return false;
        }

        match self.next_due {
            None => true,
            Some(due) => now > due,
        }
    }

    /// Returns whether no cycle has completed yet
    pub fn never_run(&self) -> bool {
        self.next_due.is_none()
    }

    /// The regular next refresh time for a cycle completing at `now`
    pub fn compute_next_due(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.policy.next_due(now)
    }

    /// Applies the classified outcome of a refresh cycle
    ///
    /// # Arguments
    ///
    /// * `outcome` - The outcome reported by the orchestrator
    /// * `now` - The time the cycle completed
    ///
    /// # Returns
    ///
    /// The scheduler transition that was taken
    pub fn on_cycle_complete(&mut self, outcome: &Outcome, now: DateTime<Utc>) -> CycleResult {
        let result = match outcome {
            Outcome::Success => {
                self.last_error = None;
                self.last_notice = None;
                self.content_available = true;
                self.last_refreshed = Some(now);
                self.retry_count = 0;
                self.next_due = Some(self.compute_next_due(now));
                CycleResult::Succeeded
            }
            Outcome::PartialFailure(partial) => {
                self.last_error = None;
                self.last_notice = Some(*partial);
                self.content_available = true;
                self.last_refreshed = Some(now);
                self.schedule_retry(now);
                CycleResult::PartiallyFailed
            }
            Outcome::TotalFailure(error) => {
                self.last_error = Some(error.clone());
                self.last_notice = None;
                self.schedule_retry(now);
                CycleResult::Failed
            }
        };

        tracing::debug!(
            result = ?result,
            retry_count = self.retry_count,
            next_due = ?self.next_due,
            "Scheduled next refresh"
        );

        result
    }

    fn schedule_retry(&mut self, now: DateTime<Utc>) {
        self.retry_count = (self.retry_count + 1).min(MAX_RETRIES);
        let regular = self.compute_next_due(now);
        let early = now + backoff(self.retry_count);
        self.next_due = Some(regular.min(early));
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.next_due
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn content_available(&self) -> bool {
        self.content_available
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn last_notice(&self) -> Option<&PartialContent> {
        self.last_notice.as_ref()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn has_notice(&self) -> bool {
        self.last_notice.is_some()
    }

    /// Checks whether cached content is shown alongside a hard error
    pub fn is_stale(&self) -> bool {
        self.content_available && self.last_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn create_test_state() -> SourceState {
        SourceState::new(CachePolicy::FixedDuration(Duration::hours(2)))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 10, 0, 0).unwrap()
    }

    fn partial(failed: usize, total: usize) -> Outcome {
        Outcome::PartialFailure(PartialContent { failed, total })
    }

    #[test]
    fn test_new_state_is_due_immediately() {
        let state = create_test_state();
        assert!(state.is_due(now()));
        assert!(state.never_run());
        assert_eq!(state.retry_count(), 0);
        assert!(!state.content_available());
        assert!(!state.has_error());
        assert!(!state.has_notice());
    }

    #[test]
    fn test_infinite_policy_is_never_due() {
        let state = SourceState::new(CachePolicy::Infinite);
        assert!(!state.is_due(now()));
    }

    #[test]
    fn test_success_schedules_full_interval() {
        let mut state = create_test_state();
        let result = state.on_cycle_complete(&Outcome::Success, now());

        assert_eq!(result, CycleResult::Succeeded);
        assert_eq!(state.retry_count(), 0);
        assert_eq!(state.next_due(), Some(now() + Duration::hours(2)));
        assert!(state.content_available());
        assert_eq!(state.last_refreshed(), Some(now()));
    }

    #[test]
    fn test_not_due_until_after_next_due() {
        let mut state = create_test_state();
        state.on_cycle_complete(&Outcome::Success, now());

        let due = now() + Duration::hours(2);
        assert!(!state.is_due(now() + Duration::minutes(30)));
        assert!(!state.is_due(due));
        assert!(state.is_due(due + Duration::seconds(1)));
    }

    #[test]
    fn test_partial_failure_retries_early_and_keeps_content() {
        let mut state = create_test_state();
        let result = state.on_cycle_complete(&partial(1, 5), now());

        assert_eq!(result, CycleResult::PartiallyFailed);
        assert!(state.content_available());
        assert_eq!(state.retry_count(), 1);
        assert_eq!(state.next_due(), Some(now() + Duration::minutes(1)));
        assert!(state.next_due() < Some(now() + Duration::hours(2)));
        assert_eq!(state.last_notice(), Some(&PartialContent { failed: 1, total: 5 }));
        assert!(!state.has_error());
    }

    #[test]
    fn test_failure_before_any_success_keeps_content_unavailable() {
        let mut state = create_test_state();
        let result = state.on_cycle_complete(&Outcome::TotalFailure(FetchError::NoContent), now());

        assert_eq!(result, CycleResult::Failed);
        assert!(!state.content_available());
        assert_eq!(state.retry_count(), 1);
        assert_eq!(state.last_error(), Some(&FetchError::NoContent));
        assert!(!state.is_stale());
    }

    #[test]
    fn test_failure_after_success_keeps_content_and_marks_stale() {
        let mut state = create_test_state();
        state.on_cycle_complete(&Outcome::Success, now());
        let failure = Outcome::TotalFailure(FetchError::NoContent);
        state.on_cycle_complete(&failure, now() + Duration::hours(3));

        assert!(state.content_available());
        assert!(state.is_stale());
    }

    #[test]
    fn test_retry_count_is_capped() {
        let mut state = create_test_state();
        let mut t = now();
        for _ in 0..8 {
            state.on_cycle_complete(&Outcome::TotalFailure(FetchError::NoContent), t);
            t += Duration::hours(1);
        }

        assert_eq!(state.retry_count(), MAX_RETRIES);
        let last = t - Duration::hours(1);
        assert_eq!(state.next_due(), Some(last + Duration::minutes(25)));
    }

    #[test]
    fn test_backoff_never_exceeds_regular_schedule() {
        let mut state = SourceState::new(CachePolicy::FixedDuration(Duration::minutes(10)));
        for _ in 0..5 {
            state.on_cycle_complete(&Outcome::TotalFailure(FetchError::NoContent), now());
        }

        assert_eq!(state.next_due(), Some(now() + Duration::minutes(10)));
    }

    #[test]
    fn test_success_after_failures_resets_retries_and_clears_flags() {
        let mut state = create_test_state();
        state.on_cycle_complete(&Outcome::TotalFailure(FetchError::NoContent), now());
        state.on_cycle_complete(&partial(2, 4), now() + Duration::minutes(2));
        assert_eq!(state.retry_count(), 2);
        assert!(state.has_notice());

        state.on_cycle_complete(&Outcome::Success, now() + Duration::minutes(10));
        assert_eq!(state.retry_count(), 0);
        assert!(!state.has_error());
        assert!(!state.has_notice());
    }

    #[test]
    fn test_hard_error_clears_notice() {
        let mut state = create_test_state();
        state.on_cycle_complete(&partial(1, 3), now());
        let failure = Outcome::TotalFailure(FetchError::NoContent);
        state.on_cycle_complete(&failure, now() + Duration::minutes(2));

        assert!(!state.has_notice());
        assert!(state.has_error());
    }

    #[test]
    fn test_on_the_hour_failure_retries_within_the_hour() {
        let mut state = SourceState::new(CachePolicy::OnTheHour);
        let t = Utc.with_ymd_and_hms(2024, 5, 17, 12, 58, 0).unwrap();
        state.on_cycle_complete(&Outcome::TotalFailure(FetchError::NoContent), t);
        assert_eq!(state.next_due(), Some(t + Duration::minutes(1)));
    }
}
