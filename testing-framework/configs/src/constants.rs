use std::time::Duration;

use testing_framework_env as tf_env;

/// Symbol of the native asset on the local network.
pub const AVAX_ASSET_ID: &str = "AVAX";

/// Alias of the asset-transfer chain.
pub const X_CHAIN_ALIAS: &str = "X";

/// Alias of the platform (staking) chain.
pub const P_CHAIN_ALIAS: &str = "P";

/// Network ID of a locally launched network.
pub const LOCAL_NETWORK_ID: u32 = 12345;

/// Default API port used by nodes.
pub const DEFAULT_API_PORT: u16 = 9650;

/// Default staking port used by nodes.
pub const DEFAULT_STAKING_PORT: u16 = 9651;

/// Default HTTP probe interval used across readiness checks.
pub const DEFAULT_HTTP_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default per-request HTTP timeout towards node APIs.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size used when walking UTXO pagination.
pub const DEFAULT_UTXO_PAGE_LIMIT: u32 = 1024;

/// Prefix of exported secp256k1 private keys.
pub const PRIVATE_KEY_PREFIX: &str = "PrivateKey-";

/// Prefix of node identifiers.
pub const NODE_ID_PREFIX: &str = "NodeID-";

/// Resolve the API port from `AVALANCHE_API_PORT`, falling back to the default.
pub fn api_port() -> u16 {
    tf_env::avalanche_api_port().unwrap_or(DEFAULT_API_PORT)
}
