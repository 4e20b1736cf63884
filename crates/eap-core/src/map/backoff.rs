use std::time::Duration;

use eap_model::BackoffStrategy;
use taskvisor::BackoffPolicy;

use super::to_jitter_policy;

/// `success_delay` is the pause after a successful run (the period of periodic tasks).
pub fn to_backoff_policy(s: &BackoffStrategy, success_delay: Option<Duration>) -> BackoffPolicy {
    BackoffPolicy {
        success_delay,
        first: Duration::from_millis(s.first_ms),
        max: Duration::from_millis(s.max_ms),
        jitter: to_jitter_policy(s.jitter),
        factor: s.factor,
    }
}
