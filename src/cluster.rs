//! Cluster topology and store definitions
//!
//! Both are immutable for the duration of a build. They can be loaded from
//! JSON files so the CLI can describe a serving cluster without code.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A serving node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Node id, also used to name the node's output directory
    pub id: u32,

    /// Host the node serves from
    #[serde(default)]
    pub host: String,
}

impl Node {
    pub fn new(id: u32, host: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
        }
    }
}

/// Ordered set of serving nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    name: String,
    nodes: Vec<Node>,
}

impl Cluster {
    /// Create a cluster. A cluster must contain at least one node.
    pub fn new(name: impl Into<String>, nodes: Vec<Node>) -> Result<Self, ConfigError> {
        let name = name.into();
        if nodes.is_empty() {
            return Err(ConfigError::EmptyCluster { name });
        }
        Ok(Self { name, nodes })
    }

    /// Convenience constructor for `count` nodes with ids `0..count`
    pub fn with_node_count(name: impl Into<String>, count: u32) -> Result<Self, ConfigError> {
        let nodes = (0..count)
            .map(|id| Node::new(id, format!("node{}", id)))
            .collect();
        Self::new(name, nodes)
    }

    /// Load a cluster from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let cluster: Cluster = load_json(path)?;
        // Deserialization bypasses `new`, so re-check the invariant
        Self::new(cluster.name, cluster.nodes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> u32 {
        self.nodes.len() as u32
    }
}

/// Definition of the store being built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDefinition {
    name: String,
    replication_factor: u32,
}

impl StoreDefinition {
    pub fn new(name: impl Into<String>, replication_factor: u32) -> Result<Self, ConfigError> {
        if replication_factor == 0 {
            return Err(ConfigError::InvalidReplicationFactor {
                factor: replication_factor,
            });
        }
        Ok(Self {
            name: name.into(),
            replication_factor,
        })
    }

    /// Load a store definition from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let def: StoreDefinition = load_json(path)?;
        Self::new(def.name, def.replication_factor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replication_factor(&self) -> u32 {
        self.replication_factor
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::MetadataLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ConfigError::MetadataLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
