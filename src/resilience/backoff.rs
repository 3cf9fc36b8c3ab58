//! Exponential backoff with jitter for retry scheduling.

use std::time::Duration;

use rand::Rng;

/// Delay before replay attempt `attempt` (1-based): `base * 2^(attempt-1)`
/// plus up to 10% jitter, never exceeding `max_ms`.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential = base_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
    let capped = exponential.min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis((capped + jitter).min(max_ms))
}
