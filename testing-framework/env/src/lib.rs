use std::{env, path::PathBuf};

#[must_use]
pub fn slow_test_env() -> bool {
    env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true")
}

#[must_use]
pub fn debug_tracing() -> bool {
    env::var("AVALANCHE_TESTS_TRACING").is_ok_and(|val| val.eq_ignore_ascii_case("true"))
}

#[must_use]
pub fn avalanche_acceptance_timeout_secs() -> Option<u64> {
    parse_var("AVALANCHE_ACCEPTANCE_TIMEOUT_SECS")
}

#[must_use]
pub fn avalanche_poll_interval_ms() -> Option<u64> {
    parse_var("AVALANCHE_POLL_INTERVAL_MS")
}

#[must_use]
pub fn avalanche_node_health_timeout_secs() -> Option<u64> {
    parse_var("AVALANCHE_NODE_HEALTH_TIMEOUT_SECS")
}

#[must_use]
pub fn avalanche_network_file() -> Option<PathBuf> {
    env::var("AVALANCHE_NETWORK_FILE").ok().map(PathBuf::from)
}

#[must_use]
pub fn avalanche_bombard_txs() -> Option<u64> {
    parse_var("AVALANCHE_BOMBARD_TXS")
}

#[must_use]
pub fn avalanche_bombard_tx_fee() -> Option<u64> {
    parse_var("AVALANCHE_BOMBARD_TX_FEE")
}

#[must_use]
pub fn avalanche_api_port() -> Option<u16> {
    parse_var("AVALANCHE_API_PORT")
}

#[must_use]
pub fn rust_log() -> Option<String> {
    env::var("RUST_LOG").ok()
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
