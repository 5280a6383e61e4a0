use std::time::Duration;

use testing_framework_env as tf_env;

pub const ACCEPTANCE_TIMEOUT_SECS: u64 = 120;
pub const POLL_INTERVAL_MS: u64 = 1_000;
pub const NODE_HEALTH_TIMEOUT_SECS: u64 = 90;

fn env_duration(value: Option<u64>, default: u64, unit: fn(u64) -> Duration) -> Duration {
    unit(value.unwrap_or(default))
}

/// How long a workflow waits for a transaction to reach a terminal status.
pub fn acceptance_timeout() -> Duration {
    crate::adjust_timeout(env_duration(
        tf_env::avalanche_acceptance_timeout_secs(),
        ACCEPTANCE_TIMEOUT_SECS,
        Duration::from_secs,
    ))
}

/// Interval between two transaction status queries.
pub fn poll_interval() -> Duration {
    env_duration(
        tf_env::avalanche_poll_interval_ms(),
        POLL_INTERVAL_MS,
        Duration::from_millis,
    )
}

pub fn node_health_timeout() -> Duration {
    crate::adjust_timeout(env_duration(
        tf_env::avalanche_node_health_timeout_secs(),
        NODE_HEALTH_TIMEOUT_SECS,
        Duration::from_secs,
    ))
}
