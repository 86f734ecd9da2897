//! In-memory [`DataProvider`] with JSON save/load.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{DataProvider, StoreError, UUID_PROPERTY};
use crate::types::{PropertyBag, PropertyValue};

/// Label of the nodes that computation graphs connect to.
pub const DATA_NODE_LABEL: &str = "DataNode";

/// Default filename for a saved store.
pub const STORE_FILENAME: &str = "store.json";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoredNode {
  pub label: String,
  #[serde(default)]
  pub properties: PropertyBag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRelationship {
  pub source_id: String,
  pub target_id: String,
  pub rel_type: String,
  #[serde(default)]
  pub properties: PropertyBag,
}

/// Everything held by an [`InMemoryDataProvider`], keyed by id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreContents {
  #[serde(default)]
  pub nodes: BTreeMap<String, StoredNode>,
  #[serde(default)]
  pub relationships: BTreeMap<String, StoredRelationship>,
}

impl StoreContents {
  fn find_by_uuid(&self, uuid: &str, data_nodes: bool) -> Option<(&String, &StoredNode)> {
    let wanted = PropertyValue::String(uuid.to_string());
    self.nodes.iter().find(|(_, node)| {
      (node.label == DATA_NODE_LABEL) == data_nodes && node.properties.get(UUID_PROPERTY) == Some(&wanted)
    })
  }

  fn resolve(&self, id: &str, by_uuid: bool) -> Result<String, StoreError> {
    let found = if by_uuid {
      self.find_by_uuid(id, true).map(|(k, _)| k.clone())
    } else {
      self.nodes.contains_key(id).then(|| id.to_string())
    };
    found.ok_or_else(|| StoreError::NodeNotFound(id.to_string()))
  }

  pub fn nodes_with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = (&'a String, &'a StoredNode)> {
    self.nodes.iter().filter(move |(_, n)| n.label == label)
  }
}

/// A store held in memory. Created nodes and edges get random uuid ids; data
/// nodes merged by uuid live under `datanode_<uuid>`.
#[derive(Debug, Default)]
pub struct InMemoryDataProvider {
  contents: RwLock<StoreContents>,
}

impl InMemoryDataProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_contents(contents: StoreContents) -> Self {
    Self {
      contents: RwLock::new(contents),
    }
  }

  /// Copy of everything currently stored.
  pub async fn contents(&self) -> StoreContents {
    self.contents.read().await.clone()
  }

  /// Saves the store to `path` as JSON, creating parent directories.
  #[instrument(level = "trace", skip(self, path))]
  pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(&*self.contents.read().await)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    Ok(())
  }

  /// Loads a store saved by [`InMemoryDataProvider::save`].
  #[instrument(level = "trace", skip(path))]
  pub async fn load(path: &Path) -> Result<Self, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    let contents: StoreContents = serde_json::from_slice(&bytes)?;
    Ok(Self::from_contents(contents))
  }
}

#[async_trait]
impl DataProvider for InMemoryDataProvider {
  async fn get_node_data(&self, node_id: &str) -> Result<Option<PropertyBag>, StoreError> {
    let contents = self.contents.read().await;
    Ok(contents.nodes.get(node_id).map(|n| n.properties.clone()))
  }

  async fn get_data_node_by_uuid(&self, uuid: &str) -> Result<Option<PropertyBag>, StoreError> {
    let contents = self.contents.read().await;
    Ok(contents.find_by_uuid(uuid, false).map(|(_, n)| n.properties.clone()))
  }

  async fn merge_data_node(&self, uuid: &str, properties: PropertyBag) -> Result<String, StoreError> {
    let mut props = properties;
    props
      .entry(UUID_PROPERTY.to_string())
      .or_insert_with(|| PropertyValue::String(uuid.to_string()));
    let mut contents = self.contents.write().await;
    contents.nodes.insert(
      format!("datanode_{uuid}"),
      StoredNode {
        label: DATA_NODE_LABEL.to_string(),
        properties: props,
      },
    );
    debug!(uuid = %uuid, "merged data node");
    Ok(uuid.to_string())
  }

  async fn create_node(&self, label: &str, properties: PropertyBag) -> Result<String, StoreError> {
    let id = Uuid::new_v4().to_string();
    let mut contents = self.contents.write().await;
    contents.nodes.insert(
      id.clone(),
      StoredNode {
        label: label.to_string(),
        properties,
      },
    );
    debug!(id = %id, label = %label, "created node");
    Ok(id)
  }

  async fn set_node_properties(
    &self,
    node_id: &str,
    properties: PropertyBag,
    match_by_uuid: bool,
  ) -> Result<(), StoreError> {
    let mut contents = self.contents.write().await;
    let key = contents.resolve(node_id, match_by_uuid)?;
    if let Some(node) = contents.nodes.get_mut(&key) {
      node.properties.extend(properties);
    }
    Ok(())
  }

  async fn create_relationship(
    &self,
    source_id: &str,
    target_id: &str,
    rel_type: &str,
    properties: PropertyBag,
    source_by_uuid: bool,
    target_by_uuid: bool,
  ) -> Result<String, StoreError> {
    let mut contents = self.contents.write().await;
    let source = contents.resolve(source_id, source_by_uuid)?;
    let target = contents.resolve(target_id, target_by_uuid)?;
    let id = Uuid::new_v4().to_string();
    contents.relationships.insert(
      id.clone(),
      StoredRelationship {
        source_id: source,
        target_id: target,
        rel_type: rel_type.to_string(),
        properties,
      },
    );
    Ok(id)
  }
}
