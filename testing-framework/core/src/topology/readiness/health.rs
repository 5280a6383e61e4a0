use std::time::Duration;

use tracing::{debug, warn};

use super::ReadinessCheck;
use crate::nodes::{ApiClientError, SharedNodeApi};

#[derive(Debug)]
pub struct NodeHealthStatus {
    label: String,
    result: Result<bool, ApiClientError>,
}

impl NodeHealthStatus {
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self.result, Ok(true))
    }
}

/// Waits until every listed node reports itself live.
pub struct NodeHealthReadiness<'a> {
    nodes: &'a [(String, SharedNodeApi)],
    timeout: Duration,
}

impl<'a> NodeHealthReadiness<'a> {
    #[must_use]
    pub const fn new(nodes: &'a [(String, SharedNodeApi)], timeout: Duration) -> Self {
        Self { nodes, timeout }
    }
}

#[async_trait::async_trait]
impl<'a> ReadinessCheck<'a> for NodeHealthReadiness<'a> {
    type Data = Vec<NodeHealthStatus>;

    async fn collect(&'a self) -> Self::Data {
        let probes = self.nodes.iter().map(|(label, node)| async move {
            let result = node.health().liveness().await;
            if let Err(err) = &result {
                warn!(target: "readiness", node = %label, error = %err, "liveness probe failed");
            }
            NodeHealthStatus {
                label: label.clone(),
                result,
            }
        });
        futures::future::join_all(probes).await
    }

    fn is_ready(&self, data: &Self::Data) -> bool {
        let ready = data.iter().all(NodeHealthStatus::is_healthy);
        debug!(target: "readiness", nodes = data.len(), ready, "health readiness sample");
        ready
    }

    fn timeout_message(&self, data: Self::Data) -> String {
        let summary = data
            .iter()
            .map(|status| match &status.result {
                Ok(true) => format!("{}: healthy", status.label),
                Ok(false) => format!("{}: unhealthy", status.label),
                Err(err) => format!("{}: {err}", status.label),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("timed out waiting for node health: {summary}")
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
