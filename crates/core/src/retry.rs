use std::time::Duration;

use log::warn;

use crate::error::Error;

/// Exponential backoff with jitter around transient database errors
/// (spec.md §4.C3). Passed by immutable value per call site rather than
/// mutated in place (spec.md §9 Open Questions: no per-call state
/// isolation is needed if callers just pass a fresh `RetryPolicy`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            cap: Duration::from_millis(5_000),
        }
    }
}

/// Deterministic source of jitter, injected so tests can assert exact
/// delays; production callers use `rand`-backed `random_jitter`.
pub trait JitterSource {
    /// Returns a value in `[0.0, 1.0)`.
    fn next(&mut self) -> f64;
}

/// Jitter source that always returns zero, useful for asserting the
/// base exponential curve without randomness in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn next(&mut self) -> f64 {
        0.0
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (0-based), per spec.md §4.C3:
    /// `min(cap, base * multiplier^attempt) + uniform_random(0, 10% of that)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, jitter: &mut dyn JitterSource) -> Duration {
        let base = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.cap.as_secs_f64());
        let jitter_span = capped * 0.10;
        let jittered = capped + jitter_span * jitter.next();
        Duration::from_secs_f64(jittered.max(0.0))
    }

    /// Runs `operation`, retrying transient failures up to
    /// `max_attempts`, sleeping `delay_for` between attempts. On final
    /// failure the last observed error is returned unchanged.
    pub fn run<T>(
        &self,
        jitter: &mut dyn JitterSource,
        sleep: &mut dyn FnMut(Duration),
        mut operation: impl FnMut() -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let retryable = error.is_transient();
                    if !retryable || attempt + 1 >= self.max_attempts {
                        if retryable {
                            warn!("retry budget exhausted after {} attempts", attempt + 1);
                        }
                        return Err(error);
                    }
                    sleep(self.delay_for(attempt, jitter));
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, QueryError};

    #[test]
    fn delay_grows_exponentially_without_jitter() {
        let policy = RetryPolicy::default();
        let mut jitter = NoJitter;
        assert_eq!(policy.delay_for(0, &mut jitter), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1, &mut jitter), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2, &mut jitter), Duration::from_millis(400));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::default();
        let mut jitter = NoJitter;
        assert_eq!(policy.delay_for(20, &mut jitter), policy.cap);
    }

    #[test]
    fn retries_transient_query_error_until_success() {
        let policy = RetryPolicy::default();
        let mut jitter = NoJitter;
        let mut sleeps = Vec::new();
        let mut sleep = |d: Duration| sleeps.push(d);
        let mut attempts = 0;
        let result = policy.run(&mut jitter, &mut sleep, || {
            attempts += 1;
            if attempts <= 2 {
                Err(Error::Query(QueryError {
                    sql: "SELECT 1".to_string(),
                    code: Some(1213),
                    message: "deadlock".to_string(),
                }))
            } else {
                Ok("ok")
            }
        });
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(sleeps, vec![Duration::from_millis(100), Duration::from_millis(200)]);
    }

    #[test]
    fn non_transient_error_propagates_immediately() {
        let policy = RetryPolicy::default();
        let mut jitter = NoJitter;
        let mut sleep = |_: Duration| panic!("should not sleep");
        let mut attempts = 0;
        let result: Result<(), Error> = policy.run(&mut jitter, &mut sleep, || {
            attempts += 1;
            Err(Error::Connection(ConnectionError {
                message: "auth failed".to_string(),
                transient: false,
                source: None,
            }))
        });
        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }
}
