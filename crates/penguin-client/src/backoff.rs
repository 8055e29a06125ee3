//! Capped exponential backoff shared by the sync loop and the push channel.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Count one more failure and return the delay before the next attempt.
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.delay()
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// `base` with no failures, then `base * 2^failures`, never above `max`.
    pub fn delay(&self) -> Duration {
        let factor = 1u32.checked_shl(self.failures.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// [`delay`](Self::delay) plus up to 25% random jitter, still capped.
    pub fn jittered_delay(&self) -> Duration {
        let delay = self.delay();
        let spread = delay.as_millis() as u64 / 4;
        let jitter = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=spread)
        };
        (delay + Duration::from_millis(jitter)).min(self.max)
    }
}
