use anyhow::{Context as _, Result};
use testing_framework_core::{
    IS_DEBUG_TRACING,
    topology::{NetworkDescriptor, StaticNetwork},
};
use testing_framework_env as tf_env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_FILTER: &str = "info";
const DEBUG_LOG_FILTER: &str = "info,testing_framework_core=debug,testing_framework_workflows=debug";

/// Installs a fmt subscriber filtered by `RUST_LOG`. Without it the filter is
/// `info`, raised to `debug` for the framework crates when
/// `AVALANCHE_TESTS_TRACING=true`.
pub fn init_tracing() {
    let filter = tf_env::rust_log()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter(*IS_DEBUG_TRACING)));
    let _ = fmt().with_env_filter(filter).try_init();
}

fn default_filter(debug_tracing: bool) -> &'static str {
    if debug_tracing {
        DEBUG_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}

/// Binds clients to the network named by `AVALANCHE_NETWORK_FILE`, or to a
/// single local node when unset.
pub fn load_network() -> Result<StaticNetwork> {
    let descriptor = match tf_env::avalanche_network_file() {
        Some(path) => {
            info!(path = %path.display(), "loading network descriptor");
            NetworkDescriptor::load(&path)
                .with_context(|| format!("loading network descriptor {}", path.display()))?
        }
        None => {
            info!("AVALANCHE_NETWORK_FILE not set; using a single localhost node");
            NetworkDescriptor::localhost()
        }
    };
    StaticNetwork::from_descriptor(&descriptor).context("binding node clients")
}
