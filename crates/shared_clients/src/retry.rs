use log::warn;
use std::time::Duration;

/// Exponential backoff for calls that can be throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            max: Duration::from_secs(60),
            attempts: 5,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based): doubles from `initial`,
    /// capped at `max`.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial.saturating_mul(factor).min(self.max)
    }

    pub fn retry<T, E>(
        &self,
        is_transient: impl Fn(&E) -> bool,
        op: impl FnMut() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
    {
        self.retry_with_sleeper(is_transient, op, std::thread::sleep)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget
    /// is spent. The last error is returned.
    pub fn retry_with_sleeper<T, E>(
        &self,
        is_transient: impl Fn(&E) -> bool,
        mut op: impl FnMut() -> Result<T, E>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut retry = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && retry + 1 < attempts => {
                    let delay = self.delay(retry);
                    warn!(
                        "attempt {}/{} failed: {err}; retrying in {}s",
                        retry + 1,
                        attempts,
                        delay.as_secs()
                    );
                    sleep(delay);
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
