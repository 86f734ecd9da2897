//! Persistence collaborator: a property-graph store whose nodes are addressed
//! by an opaque id or by a stable `uuid` property.
//!
//! The executor never talks to a store directly. [`GraphStore`] loads the data
//! nodes a graph needs before a run, mirrors the graph's structure into the
//! store, and writes computed outputs back afterwards.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::PropertyBag;

mod manager;
#[cfg(test)]
mod manager_test;
mod memory;

pub use manager::{COMPUTATION_NODE_LABEL, GraphStore};
pub use memory::{
  DATA_NODE_LABEL, InMemoryDataProvider, STORE_FILENAME, StoreContents, StoredNode,
  StoredRelationship,
};

/// Property holding a node's stable identifier.
pub const UUID_PROPERTY: &str = "uuid";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("node '{0}' not found")]
  NodeNotFound(String),
  #[error("node spec '{0}' has no label")]
  MissingLabel(String),
  #[error(
    "missing data nodes for graph: {}; create them before loading",
    missing.join(", ")
  )]
  MissingDataNodes { missing: Vec<String> },
  #[error("store file error: {0}")]
  Io(#[from] std::io::Error),
  #[error("store serialization error: {0}")]
  Serde(#[from] serde_json::Error),
}

/// Operations the engine needs from a property-graph store.
#[async_trait]
pub trait DataProvider: Send + Sync {
  /// Properties of the node with this id.
  async fn get_node_data(&self, node_id: &str) -> Result<Option<PropertyBag>, StoreError>;

  /// Properties of the business node (any label except [`DATA_NODE_LABEL`])
  /// whose `uuid` property equals `uuid`.
  async fn get_data_node_by_uuid(&self, uuid: &str) -> Result<Option<PropertyBag>, StoreError>;

  /// Creates or replaces the [`DATA_NODE_LABEL`] node for `uuid`. Returns the uuid.
  async fn merge_data_node(&self, uuid: &str, properties: PropertyBag) -> Result<String, StoreError>;

  /// Creates a node and returns its new id.
  async fn create_node(&self, label: &str, properties: PropertyBag) -> Result<String, StoreError>;

  /// Merges `properties` into a node, found by id or, with `match_by_uuid`,
  /// as the data node carrying that uuid.
  async fn set_node_properties(
    &self,
    node_id: &str,
    properties: PropertyBag,
    match_by_uuid: bool,
  ) -> Result<(), StoreError>;

  /// Creates a typed edge and returns its id. Each endpoint is an id, or a
  /// data node uuid when the matching `*_by_uuid` flag is set.
  async fn create_relationship(
    &self,
    source_id: &str,
    target_id: &str,
    rel_type: &str,
    properties: PropertyBag,
    source_by_uuid: bool,
    target_by_uuid: bool,
  ) -> Result<String, StoreError>;
}
