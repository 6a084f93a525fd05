//! Retry backoff utilities

use rand::Rng;
use std::time::Duration;

/// Largest exponent applied to the base delay (base * 2^6 = 64x)
const MAX_DOUBLINGS: u32 = 6;

/// Exponential retry backoff with a cap and symmetric jitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryBackoff {
    /// Delay after the first failure
    base: Duration,
    /// Upper bound before jitter
    max: Duration,
    /// Jitter as a fraction of the delay, in [0, 1)
    jitter_ratio: f64,
}

impl RetryBackoff {
    /// Create a new backoff policy
    ///
    /// # Arguments
    /// * `base` - Delay after the first failure
    /// * `max` - Upper bound for the un-jittered delay
    /// * `jitter_ratio` - Fraction of the delay to randomize by, clamped to [0, 1)
    pub fn new(base: Duration, max: Duration, jitter_ratio: f64) -> Self {
        Self {
            base,
            max: max.max(base),
            jitter_ratio: jitter_ratio.clamp(0.0, 0.99),
        }
    }

    /// Un-jittered delay for the given consecutive failure count (1-based)
    pub fn nominal_delay(&self, failures: u32) -> Duration {
        let doublings = failures.saturating_sub(1).min(MAX_DOUBLINGS);
        let scaled = self.base.saturating_mul(1u32 << doublings);
        scaled.min(self.max)
    }

    /// Delay for the given consecutive failure count with jitter applied
    pub fn delay(&self, failures: u32) -> Duration {
        self.delay_with(failures, &mut rand::thread_rng())
    }

    /// Same as [`RetryBackoff::delay`] with a caller-supplied RNG
    pub fn delay_with<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        let nominal = self.nominal_delay(failures);
        if self.jitter_ratio == 0.0 || nominal.is_zero() {
            return nominal;
        }

        let factor = rng.gen_range((1.0 - self.jitter_ratio)..=(1.0 + self.jitter_ratio));
        nominal.mul_f64(factor)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}
