use std::time::Duration;

use async_trait::async_trait;
use testing_framework_config::timeouts;
use testing_framework_core::scenario::{
    DEFAULT_EXECUTION_TIMEOUT, DynError, NetworkControl, ScenarioTest,
};
use tracing::info;

use crate::builder::BombardBuilder;

/// Standby nodes joined after the bombard to check they bootstrap the new
/// asset chain state.
pub const ADDITIONAL_NODES: [&str; 2] = ["additional-node-1", "additional-node-2"];

/// Bombards the boot nodes, then joins two fresh nodes and waits for them to
/// come up healthy.
#[derive(Clone, Debug)]
pub struct StakingNetworkBombardTest {
    builder: BombardBuilder,
    additional_nodes: Vec<String>,
    bootstrap_timeout: Duration,
}

impl StakingNetworkBombardTest {
    #[must_use]
    pub fn new(builder: BombardBuilder) -> Self {
        Self {
            builder,
            additional_nodes: ADDITIONAL_NODES.iter().map(|n| (*n).to_owned()).collect(),
            bootstrap_timeout: timeouts::node_health_timeout(),
        }
    }

    /// Replaces the standby nodes joined after the bombard.
    #[must_use]
    pub fn with_additional_nodes(mut self, nodes: impl IntoIterator<Item = String>) -> Self {
        self.additional_nodes = nodes.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = timeout;
        self
    }
}

#[async_trait]
impl ScenarioTest for StakingNetworkBombardTest {
    fn name(&self) -> &str {
        "staking_network_bombard"
    }

    fn execution_timeout(&self) -> Duration {
        DEFAULT_EXECUTION_TIMEOUT
    }

    async fn execute(&self, network: &dyn NetworkControl) -> Result<(), DynError> {
        let nodes = network
            .boot_nodes()
            .into_iter()
            .map(|(_, api)| api)
            .collect();
        let report = self.builder.build(nodes).execute().await?;
        info!(
            txs = report.total_txs(),
            throughput = report.throughput(),
            "bombard completed"
        );

        info!(nodes = ?self.additional_nodes, "adding nodes and waiting for them to bootstrap");
        for name in &self.additional_nodes {
            network.add_node(name).await?;
        }
        for name in &self.additional_nodes {
            network
                .wait_for_healthy(name, self.bootstrap_timeout)
                .await?;
            info!(node = %name, "node finished bootstrapping");
        }
        Ok(())
    }
}
