//! Retry budget and adaptive wait schedule for a single request execution.

use std::thread;
use std::time::Duration;

/// Attempts made by one execution before giving up.
pub const MAX_ATTEMPTS: u8 = 20;
/// Wait before the first retry.
pub const INITIAL_WAIT: Duration = Duration::from_millis(100);
/// Ceiling for a single wait, until rate limiting widens it.
pub const INITIAL_MAX_WAIT: Duration = Duration::from_secs(5);
/// Absolute ceiling for a single wait.
pub const ABSOLUTE_MAX_WAIT: Duration = Duration::from_secs(15);

// Growth factors expressed as numerator/denominator: x1.5 and x1.1.
const WAIT_GROWTH: (u32, u32) = (3, 2);
const MAX_WAIT_GROWTH: (u32, u32) = (11, 10);

/// Blocks the caller between two attempts.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

impl<F> Pause for F
where
    F: Fn(Duration),
{
    fn pause(&self, duration: Duration) {
        self(duration)
    }
}

/// Pauses by putting the current thread to sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration)
    }
}

/// Per-execution retry state.
///
/// The wait and its ceiling are two independent accumulators: every transient failure grows the
/// wait (bounded by the current ceiling) while only rate-limit responses grow the ceiling itself
/// (bounded by [ABSOLUTE_MAX_WAIT]).
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    wait: Duration,
    max_wait: Duration,
    attempt: u8,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            wait: INITIAL_WAIT,
            max_wait: INITIAL_MAX_WAIT,
            attempt: 0,
        }
    }
}

impl Backoff {
    /// Consumes one attempt from the budget, returning its 1-based number, or `None` once the
    /// budget is exhausted.
    pub fn next_attempt(&mut self) -> Option<u8> {
        if self.attempt >= MAX_ATTEMPTS {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// Returns the wait to apply after a transient failure and grows the next one.
    pub fn on_transient_failure(&mut self) -> Duration {
        let wait = self.wait;
        self.wait = grow(self.wait, WAIT_GROWTH).min(self.max_wait);
        wait
    }

    /// Same as [Backoff::on_transient_failure], additionally widening the ceiling.
    pub fn on_rate_limited(&mut self) -> Duration {
        let wait = self.on_transient_failure();
        self.max_wait = grow(self.max_wait, MAX_WAIT_GROWTH).min(ABSOLUTE_MAX_WAIT);
        wait
    }

    #[cfg(test)]
    fn wait(&self) -> Duration {
        self.wait
    }

    #[cfg(test)]
    fn max_wait(&self) -> Duration {
        self.max_wait
    }
}

fn grow(duration: Duration, (numerator, denominator): (u32, u32)) -> Duration {
    duration.saturating_mul(numerator) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_bounded() {
        let mut backoff = Backoff::default();
        let attempts: Vec<u8> = std::iter::from_fn(|| backoff.next_attempt()).collect();

        assert_eq!(attempts, (1..=MAX_ATTEMPTS).collect::<Vec<_>>());
        assert_eq!(backoff.next_attempt(), None);
    }

    #[test]
    fn transient_failures_grow_the_wait() {
        let mut backoff = Backoff::default();

        assert_eq!(backoff.on_transient_failure(), Duration::from_millis(100));
        assert_eq!(backoff.on_transient_failure(), Duration::from_millis(150));
        assert_eq!(backoff.on_transient_failure(), Duration::from_millis(225));
        assert_eq!(backoff.wait(), Duration::from_micros(337_500));
        assert_eq!(backoff.max_wait(), INITIAL_MAX_WAIT);
    }

    #[test]
    fn transient_failures_never_exceed_the_initial_ceiling() {
        let mut backoff = Backoff::default();
        for _ in 0..50 {
            assert!(backoff.on_transient_failure() <= INITIAL_MAX_WAIT);
        }

        assert_eq!(backoff.wait(), INITIAL_MAX_WAIT);
        assert_eq!(backoff.max_wait(), INITIAL_MAX_WAIT);
    }

    #[test]
    fn rate_limiting_widens_the_ceiling() {
        let mut backoff = Backoff::default();

        assert_eq!(backoff.on_rate_limited(), Duration::from_millis(100));
        assert_eq!(backoff.max_wait(), Duration::from_millis(5500));
        assert_eq!(backoff.on_rate_limited(), Duration::from_millis(150));
        assert_eq!(backoff.max_wait(), Duration::from_millis(6050));
    }

    #[test]
    fn sustained_rate_limiting_is_capped() {
        let mut backoff = Backoff::default();
        for _ in 0..50 {
            assert!(backoff.on_rate_limited() <= ABSOLUTE_MAX_WAIT);
        }

        assert_eq!(backoff.max_wait(), ABSOLUTE_MAX_WAIT);
        assert_eq!(backoff.wait(), ABSOLUTE_MAX_WAIT);
    }

    #[test]
    fn ceiling_growth_only_applies_to_later_waits() {
        let mut backoff = Backoff::default();
        // Reach the initial ceiling with ordinary failures.
        for _ in 0..20 {
            backoff.on_transient_failure();
        }
        assert_eq!(backoff.wait(), INITIAL_MAX_WAIT);

        // The wait is capped by the ceiling in effect before it widens.
        assert_eq!(backoff.on_rate_limited(), INITIAL_MAX_WAIT);
        assert_eq!(backoff.wait(), INITIAL_MAX_WAIT);
        assert_eq!(backoff.max_wait(), Duration::from_millis(5500));
        assert_eq!(backoff.on_rate_limited(), INITIAL_MAX_WAIT);
        assert_eq!(backoff.wait(), Duration::from_millis(5500));
    }

    #[test]
    fn closures_pause() {
        let paused = std::cell::Cell::new(Duration::ZERO);
        let pause = |d: Duration| paused.set(paused.get() + d);

        pause.pause(Duration::from_millis(10));
        pause.pause(Duration::from_millis(5));

        assert_eq!(paused.get(), Duration::from_millis(15));
    }
}
