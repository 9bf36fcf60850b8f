//! Retry policy configuration and delay computation.

use std::collections::BTreeSet;
use std::time::Duration;

/// Condition that causes another physical attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum RetryTrigger {
    /// The transport failed before a status code was obtained.
    OnException,
    /// The response status is listed in [`RetryPolicy::retryable_statuses`].
    OnStatusCodes,
}

/// Independently combinable set of [`RetryTrigger`]s.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RetryTriggers {
    on_exception: bool,
    on_status_codes: bool,
}

impl RetryTriggers {
    /// No triggers enabled.
    pub const NONE: Self = Self {
        on_exception: false,
        on_status_codes: false,
    };

    /// Both triggers enabled.
    pub const ALL: Self = Self {
        on_exception: true,
        on_status_codes: true,
    };

    /// Returns a copy with `trigger` enabled.
    pub fn with(mut self, trigger: RetryTrigger) -> Self {
        self.insert(trigger);
        self
    }

    /// Enables `trigger`.
    pub fn insert(&mut self, trigger: RetryTrigger) {
        match trigger {
            RetryTrigger::OnException => self.on_exception = true,
            RetryTrigger::OnStatusCodes => self.on_status_codes = true,
        }
    }

    /// Disables `trigger`.
    pub fn remove(&mut self, trigger: RetryTrigger) {
        match trigger {
            RetryTrigger::OnException => self.on_exception = false,
            RetryTrigger::OnStatusCodes => self.on_status_codes = false,
        }
    }

    /// Whether `trigger` is enabled.
    pub fn contains(&self, trigger: RetryTrigger) -> bool {
        match trigger {
            RetryTrigger::OnException => self.on_exception,
            RetryTrigger::OnStatusCodes => self.on_status_codes,
        }
    }

    /// Whether no trigger is enabled.
    pub fn is_empty(&self) -> bool {
        !self.on_exception && !self.on_status_codes
    }
}

impl FromIterator<RetryTrigger> for RetryTriggers {
    fn from_iter<I: IntoIterator<Item = RetryTrigger>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

/// Function used to compute the wait before an attempt.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DelayMode {
    /// Retry immediately.
    #[default]
    None,
    /// Wait [`RetryPolicy::fixed_delay_ms`] before every retry.
    FixedInterval,
    /// Wait progressively longer before each retry.
    ExponentialBackoff,
}

/// Describes when and how long to wait before retrying a failed request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay function applied before each attempt.
    pub delay_mode: DelayMode,
    /// Wait in milliseconds used by [`DelayMode::FixedInterval`].
    pub fixed_delay_ms: u64,
    /// Conditions that trigger a retry.
    pub triggers: RetryTriggers,
    /// Status codes treated as failures when [`RetryTrigger::OnStatusCodes`] is enabled.
    pub retryable_statuses: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            delay_mode: DelayMode::None,
            fixed_delay_ms: 0,
            triggers: RetryTriggers::NONE,
            retryable_statuses: BTreeSet::new(),
        }
    }
}

impl RetryPolicy {
    /// Retries when the response status is one of `statuses`.
    pub fn on(mut self, statuses: &[u16]) -> Self {
        self.retryable_statuses.extend(statuses.iter().copied());
        self.triggers.insert(RetryTrigger::OnStatusCodes);
        self
    }

    /// Retries when the transport fails.
    pub fn on_exception(mut self) -> Self {
        self.triggers.insert(RetryTrigger::OnException);
        self
    }

    /// Waits a fixed number of milliseconds between attempts.
    pub fn every(mut self, millis: u64) -> Self {
        self.delay_mode = DelayMode::FixedInterval;
        self.fixed_delay_ms = millis;
        self
    }

    /// Waits progressively longer between attempts.
    pub fn with_exponential_backoff(mut self) -> Self {
        self.delay_mode = DelayMode::ExponentialBackoff;
        self
    }

    /// Limits the number of retries after the initial attempt.
    pub fn stop_after(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Computes the wait before attempt `attempt` (0 for the initial attempt).
    ///
    /// Exponential backoff yields 0, 1000, 1500, 3500, 7500 ms for attempts
    /// 0 through 4. Growth is uncapped; bound it with `max_retries`.
    pub fn delay_before(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let millis = match self.delay_mode {
            DelayMode::None => 0,
            DelayMode::FixedInterval => self.fixed_delay_ms,
            DelayMode::ExponentialBackoff => exponential_delay_ms(attempt),
        };
        Duration::from_millis(millis)
    }

    /// Whether a transport failure on `attempt` should be retried.
    pub fn should_retry_exception(&self, attempt: usize) -> bool {
        self.triggers.contains(RetryTrigger::OnException) && attempt < self.max_retries
    }

    /// Whether a response with `status` on `attempt` should be retried.
    pub fn should_retry_status(&self, status: u16, attempt: usize) -> bool {
        self.triggers.contains(RetryTrigger::OnStatusCodes)
            && self.retryable_statuses.contains(&status)
            && attempt < self.max_retries
    }
}

fn exponential_delay_ms(attempt: usize) -> u64 {
    let exp = u32::try_from(attempt).unwrap_or(u32::MAX);
    let steps = 2u64.checked_pow(exp).unwrap_or(u64::MAX).saturating_sub(1);
    steps.saturating_mul(500).max(1_000)
}

/// Shorthand constructors mirroring the [`RetryPolicy`] builder methods.
///
/// ```
/// use jsonrest_http::Retry;
///
/// let policy = Retry::on(&[429, 503]).on_exception().every(250).stop_after(3);
/// assert_eq!(policy.max_retries, 3);
/// ```
pub struct Retry;

impl Retry {
    /// Retries when the response status is one of `statuses`.
    pub fn on(statuses: &[u16]) -> RetryPolicy {
        RetryPolicy::default().on(statuses)
    }

    /// Retries when the transport fails.
    pub fn on_exception() -> RetryPolicy {
        RetryPolicy::default().on_exception()
    }

    /// Waits a fixed number of milliseconds between attempts.
    pub fn every(millis: u64) -> RetryPolicy {
        RetryPolicy::default().every(millis)
    }

    /// Waits progressively longer between attempts.
    pub fn with_exponential_backoff() -> RetryPolicy {
        RetryPolicy::default().with_exponential_backoff()
    }

    /// Limits the number of retries after the initial attempt.
    pub fn stop_after(retries: usize) -> RetryPolicy {
        RetryPolicy::default().stop_after(retries)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{DelayMode, Retry, RetryPolicy, RetryTrigger, RetryTriggers};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn default_policy_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 10);
        assert!(policy.triggers.is_empty());
        assert!(!policy.should_retry_exception(0));
        assert!(!policy.should_retry_status(503, 0));
    }

    #[test]
    fn no_delay_mode_is_always_zero() {
        let policy = RetryPolicy::default();
        for attempt in 0..5 {
            assert_eq!(policy.delay_before(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn fixed_interval_skips_first_attempt() {
        let policy = Retry::every(250);
        assert_eq!(policy.delay_mode, DelayMode::FixedInterval);
        assert_eq!(policy.delay_before(0), Duration::ZERO);
        assert_eq!(policy.delay_before(1), ms(250));
        assert_eq!(policy.delay_before(7), ms(250));
    }

    #[test]
    fn exponential_backoff_sequence() {
        let policy = Retry::with_exponential_backoff();
        assert_eq!(policy.delay_before(0), Duration::ZERO);
        assert_eq!(policy.delay_before(1), ms(1_000));
        assert_eq!(policy.delay_before(2), ms(1_500));
        assert_eq!(policy.delay_before(3), ms(3_500));
        assert_eq!(policy.delay_before(4), ms(7_500));
    }

    #[test]
    fn exponential_backoff_saturates_instead_of_overflowing() {
        let policy = Retry::with_exponential_backoff();
        assert_eq!(policy.delay_before(200), ms(u64::MAX));
    }

    #[test]
    fn status_codes_only_consulted_when_trigger_enabled() {
        let mut policy = Retry::on(&[503]);
        assert!(policy.should_retry_status(503, 0));
        assert!(!policy.should_retry_status(500, 0));

        policy.triggers.remove(RetryTrigger::OnStatusCodes);
        assert!(!policy.should_retry_status(503, 0));
    }

    #[test]
    fn retry_budget_is_exclusive_upper_bound() {
        let policy = Retry::on_exception().stop_after(2);
        assert!(policy.should_retry_exception(0));
        assert!(policy.should_retry_exception(1));
        assert!(!policy.should_retry_exception(2));
    }

    #[test]
    fn triggers_combine_independently() {
        let triggers: RetryTriggers = [RetryTrigger::OnException].into_iter().collect();
        assert!(triggers.contains(RetryTrigger::OnException));
        assert!(!triggers.contains(RetryTrigger::OnStatusCodes));

        let both = triggers.with(RetryTrigger::OnStatusCodes);
        assert_eq!(both, RetryTriggers::ALL);
    }

    #[test]
    fn chained_builders_accumulate() {
        let policy = Retry::on(&[429])
            .on(&[502, 503])
            .on_exception()
            .with_exponential_backoff()
            .stop_after(4);

        assert_eq!(policy.retryable_statuses.len(), 3);
        assert_eq!(policy.triggers, RetryTriggers::ALL);
        assert_eq!(policy.delay_mode, DelayMode::ExponentialBackoff);
        assert_eq!(policy.max_retries, 4);
    }
}
