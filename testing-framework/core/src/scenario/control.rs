use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    nodes::SharedNodeApi,
    topology::readiness::{NodeHealthReadiness, ReadinessCheck as _, ReadinessError},
};

#[derive(Debug, Error)]
pub enum NetworkControlError {
    #[error("{operation} not supported by this network")]
    Unsupported { operation: &'static str },
    #[error("no node named '{0}' in this network")]
    UnknownNode(String),
    #[error("node '{0}' is already part of the network")]
    AlreadyActive(String),
    #[error(transparent)]
    Readiness(#[from] ReadinessError),
}

/// Deployer-agnostic control surface over a running test network.
#[async_trait]
pub trait NetworkControl: Send + Sync {
    /// Nodes that were running when the network came up, in a stable order.
    fn boot_nodes(&self) -> Vec<(String, SharedNodeApi)>;

    fn node_api(&self, name: &str) -> Option<SharedNodeApi>;

    async fn add_node(&self, _name: &str) -> Result<SharedNodeApi, NetworkControlError> {
        Err(NetworkControlError::Unsupported {
            operation: "add_node",
        })
    }

    async fn wait_for_healthy(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<(), NetworkControlError> {
        let node = self
            .node_api(name)
            .ok_or_else(|| NetworkControlError::UnknownNode(name.to_owned()))?;
        let nodes = [(name.to_owned(), node)];
        NodeHealthReadiness::new(&nodes, timeout).wait().await?;
        Ok(())
    }
}
