//! Jittered exponential backoff for delivery retries.

use std::time::Duration;

use rand::Rng;

/// Default base delay for the first retry.
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Default ceiling for a single delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

/// Floor applied to every delay, so attempt 1 still waits.
pub const MIN_DELAY_MS: u64 = 50;

/// Un-jittered delay for a 1-based attempt: `base * 2^(attempt-1)`, capped.
pub fn capped_delay_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exponent = attempt.saturating_sub(1).min(63);
    base_ms
        .saturating_mul(1u64 << exponent)
        .min(max_ms)
        .max(MIN_DELAY_MS)
}

/// Full-jitter delay in milliseconds, uniform in `[50, capped]`.
pub fn exponential_backoff_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let capped = capped_delay_ms(attempt, base_ms, max_ms);
    rand::rng().random_range(MIN_DELAY_MS..=capped)
}

/// [`exponential_backoff_ms`] with the default base and ceiling.
pub fn default_backoff(attempt: u32) -> Duration {
    Duration::from_millis(exponential_backoff_ms(
        attempt,
        DEFAULT_BASE_DELAY_MS,
        DEFAULT_MAX_DELAY_MS,
    ))
}
