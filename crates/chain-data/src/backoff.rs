//! Randomized exponential backoff.

use std::time::Duration;

use rand::Rng;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Default ceiling applied before jitter.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Default jitter, as a fraction of the capped delay (±25%).
pub const DEFAULT_JITTER_RATIO: f64 = 0.25;

/// Computes how long to wait before retry attempt `n` (zero-based).
///
/// The base delay doubles per attempt starting at `initial`, is capped at
/// `max`, then scaled by a random factor in `[1 - jitter, 1 + jitter]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub jitter_ratio: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_BACKOFF,
            max: DEFAULT_MAX_BACKOFF,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

impl BackoffPolicy {
    pub fn new(initial: Duration, max: Duration, jitter_ratio: f64) -> Self {
        Self {
            initial,
            max,
            jitter_ratio,
        }
    }

    /// Delay for `attempt` before jitter: `min(initial * 2^attempt, max)`.
    pub fn capped_base(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Jittered delay for `attempt` using the thread-local RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Jittered delay for `attempt` drawing randomness from `rng`.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.capped_base(attempt);
        let ratio = self.jitter_ratio.clamp(0.0, 1.0);
        if ratio == 0.0 || base.is_zero() {
            return base;
        }

        let factor = 1.0 + rng.gen_range(-ratio..=ratio);
        base.mul_f64(factor)
    }
}
