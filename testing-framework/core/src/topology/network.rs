use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tracing::info;

use super::descriptor::{DescriptorError, NetworkDescriptor};
use crate::{
    nodes::{ApiClient, SharedNodeApi},
    scenario::{NetworkControl, NetworkControlError},
};

/// A network whose nodes are provisioned outside the framework.
///
/// Boot nodes are usable immediately. Standby nodes are known up front but
/// only become part of the network once [`NetworkControl::add_node`] is
/// called for them.
pub struct StaticNetwork {
    boot: Vec<(String, SharedNodeApi)>,
    standby: HashMap<String, SharedNodeApi>,
    added: Mutex<HashSet<String>>,
}

impl StaticNetwork {
    #[must_use]
    pub fn new(boot: Vec<(String, SharedNodeApi)>, standby: Vec<(String, SharedNodeApi)>) -> Self {
        Self {
            boot,
            standby: standby.into_iter().collect(),
            added: Mutex::new(HashSet::new()),
        }
    }

    /// Binds a JSON-RPC client to every node listed in `descriptor`.
    pub fn from_descriptor(descriptor: &NetworkDescriptor) -> Result<Self, DescriptorError> {
        let bind = |node: &super::descriptor::NodeDescriptor| -> Result<_, DescriptorError> {
            let api: SharedNodeApi = Arc::new(ApiClient::from_url(node.api_url()?));
            Ok((node.name.clone(), api))
        };
        let boot = descriptor
            .boot_nodes()
            .map(bind)
            .collect::<Result<Vec<_>, _>>()?;
        let standby = descriptor
            .standby_nodes()
            .map(bind)
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            boot = boot.len(),
            standby = standby.len(),
            "bound clients to static network"
        );
        Ok(Self::new(boot, standby))
    }

    fn is_added(&self, name: &str) -> bool {
        self.added
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(name)
    }
}

#[async_trait]
impl NetworkControl for StaticNetwork {
    fn boot_nodes(&self) -> Vec<(String, SharedNodeApi)> {
        self.boot.clone()
    }

    fn node_api(&self, name: &str) -> Option<SharedNodeApi> {
        if let Some((_, api)) = self.boot.iter().find(|(label, _)| label == name) {
            return Some(Arc::clone(api));
        }
        self.standby
            .get(name)
            .filter(|_| self.is_added(name))
            .cloned()
    }

    async fn add_node(&self, name: &str) -> Result<SharedNodeApi, NetworkControlError> {
        let api = self
            .standby
            .get(name)
            .cloned()
            .ok_or_else(|| NetworkControlError::UnknownNode(name.to_owned()))?;
        let newly_added = self
            .added
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_owned());
        if !newly_added {
            return Err(NetworkControlError::AlreadyActive(name.to_owned()));
        }
        info!(node = name, "standby node joined the network");
        Ok(api)
    }
}
