use std::{collections::HashSet, fs::File, path::Path};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use testing_framework_config::constants;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("opening network descriptor at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing network descriptor: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("network descriptor lists no boot nodes")]
    NoBootNodes,
    #[error("node name '{0}' appears more than once")]
    DuplicateName(String),
    #[error("invalid url '{url}' for node {name}: {message}")]
    InvalidUrl {
        name: String,
        url: String,
        message: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Running from the start and used to drive workflows.
    #[default]
    Boot,
    /// Provisioned but only joined to the network on request.
    Standby,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub role: NodeRole,
}

impl NodeDescriptor {
    pub fn api_url(&self) -> Result<Url, DescriptorError> {
        Url::parse(&self.url).map_err(|err| DescriptorError::InvalidUrl {
            name: self.name.clone(),
            url: self.url.clone(),
            message: err.to_string(),
        })
    }
}

/// Named API endpoints of an already provisioned network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub nodes: Vec<NodeDescriptor>,
}

impl NetworkDescriptor {
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        debug!(path = %path.display(), "loading network descriptor");
        let file = File::open(path).map_err(|source| DescriptorError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let descriptor: Self = serde_yaml::from_reader(file)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = serde_yaml::from_str(yaml)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// A single boot node listening on localhost.
    #[must_use]
    pub fn localhost() -> Self {
        Self {
            nodes: vec![NodeDescriptor {
                name: "node-1".to_owned(),
                url: format!("http://127.0.0.1:{}", constants::api_port()),
                role: NodeRole::Boot,
            }],
        }
    }

    pub fn boot_nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.nodes.iter().filter(|node| node.role == NodeRole::Boot)
    }

    pub fn standby_nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.nodes
            .iter()
            .filter(|node| node.role == NodeRole::Standby)
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(DescriptorError::DuplicateName(node.name.clone()));
            }
            node.api_url()?;
        }
        if self.boot_nodes().next().is_none() {
            return Err(DescriptorError::NoBootNodes);
        }
        Ok(())
    }
}
