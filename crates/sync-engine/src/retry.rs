//! Jittered exponential delays for the few internal retry loops.

use std::time::Duration;

use rand::Rng;

/// Delay before retry number `attempt` (0-based): uniform in
/// `[base_ms, 2^attempt * base_ms]`, capped at `cap_ms`.
pub fn jittered_delay(attempt: u32, base_ms: u64, cap_ms: u64) -> Duration {
    let slots = 2_u64.saturating_pow(attempt.saturating_add(1));
    let full = slots.saturating_mul(base_ms).min(cap_ms).max(base_ms);

    Duration::from_millis(rand::rng().random_range(base_ms..=full))
}
