//! Moves graphs and data node values between a [`DataProvider`] and the executor.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::{DataProvider, StoreError, UUID_PROPERTY};
use crate::types::{ComputationGraph, NodeDataMap, PropertyBag, PropertyValue, RelationType};
use crate::what_if::ScenarioRunResult;

/// Label of the stored copies of computation nodes.
pub const COMPUTATION_NODE_LABEL: &str = "ComputationNode";

/// Graph-level operations over a [`DataProvider`].
pub struct GraphStore<P> {
  provider: P,
  /// Computation node id -> store id, filled by `create_computation_nodes`.
  computation_ids: BTreeMap<String, String>,
}

impl<P: DataProvider> GraphStore<P> {
  pub fn new(provider: P) -> Self {
    Self {
      provider,
      computation_ids: BTreeMap::new(),
    }
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  pub fn into_provider(self) -> P {
    self.provider
  }

  pub fn computation_ids(&self) -> &BTreeMap<String, String> {
    &self.computation_ids
  }

  /// Creates business nodes from `uuid -> properties` specs. Each spec must
  /// carry a `label` property, which becomes the node label; `uuid` defaults to
  /// the spec key. Returns `uuid -> store id`.
  #[instrument(level = "trace", skip(self, specs))]
  pub async fn create_business_nodes(
    &self,
    specs: &BTreeMap<String, PropertyBag>,
  ) -> Result<BTreeMap<String, String>, StoreError> {
    let mut ids = BTreeMap::new();
    for (uuid, spec) in specs {
      let mut props = spec.clone();
      let label = match props.remove("label") {
        Some(PropertyValue::String(label)) if !label.is_empty() => label,
        _ => return Err(StoreError::MissingLabel(uuid.clone())),
      };
      props
        .entry(UUID_PROPERTY.to_string())
        .or_insert_with(|| json!(uuid));
      let id = self.provider.create_node(&label, props).await?;
      ids.insert(uuid.clone(), id);
    }
    Ok(ids)
  }

  /// Reads every data node the graph references (by uuid, from business
  /// nodes), materializes each as a data node in the store and returns the
  /// executor's initial data. Fails without returning anything partial when
  /// any node is missing.
  pub async fn load_graph_data(&self, graph: &ComputationGraph) -> Result<NodeDataMap, StoreError> {
    let mut data = NodeDataMap::new();
    let mut missing = BTreeSet::new();
    for uuid in graph.get_data_node_ids() {
      let Some(props) = self.provider.get_data_node_by_uuid(&uuid).await? else {
        warn!(uuid = %uuid, "data node not found in store");
        missing.insert(uuid);
        continue;
      };
      let mut merged = props.clone();
      merged.insert(UUID_PROPERTY.to_string(), json!(uuid));
      self.provider.merge_data_node(&uuid, merged).await?;
      data.insert(uuid, props);
    }
    if !missing.is_empty() {
      return Err(StoreError::MissingDataNodes {
        missing: missing.into_iter().collect(),
      });
    }
    info!(graph = %graph.id(), nodes = data.len(), "loaded graph data");
    Ok(data)
  }

  /// Stores one node per computation and remembers their store ids.
  pub async fn create_computation_nodes(
    &mut self,
    graph: &ComputationGraph,
  ) -> Result<BTreeMap<String, String>, StoreError> {
    self.computation_ids.clear();
    for (id, node) in graph.computation_nodes() {
      let props: PropertyBag = [
        ("id", json!(node.id)),
        ("name", json!(node.name)),
        ("level", json!(node.level)),
        ("code", json!(node.code)),
        ("engine", json!(node.engine)),
        ("inputs_count", json!(node.inputs.len())),
        ("outputs_count", json!(node.outputs.len())),
        ("graph_id", json!(graph.id())),
        ("is_computation", json!(true)),
        ("priority", json!(node.priority)),
      ]
      .into_iter()
      .map(|(k, v)| (k.to_string(), v))
      .collect();
      let store_id = self.provider.create_node(COMPUTATION_NODE_LABEL, props).await?;
      self.computation_ids.insert(id.clone(), store_id);
    }
    Ok(self.computation_ids.clone())
  }

  /// Stores every relationship. Data node endpoints are matched by uuid and
  /// computation endpoints by the ids from `create_computation_nodes`;
  /// relationships whose computation endpoint was never stored are skipped.
  pub async fn create_relationships(&self, graph: &ComputationGraph) -> Result<Vec<String>, StoreError> {
    let mut created = Vec::new();
    for rel in graph.computation_relationships().values() {
      let depends_on = rel.relation_type == RelationType::DependsOn;
      let (source, target) = if depends_on {
        (Some(&rel.source_id), self.computation_ids.get(&rel.target_id))
      } else {
        (self.computation_ids.get(&rel.source_id), Some(&rel.target_id))
      };
      let (Some(source), Some(target)) = (source, target) else {
        debug!(relationship = %rel.id, "skipping relationship without a stored computation");
        continue;
      };

      let mut props: PropertyBag = [
        ("uuid", json!(rel.id)),
        ("name", json!(rel.name)),
        ("relation_type", json!(rel.relation_type)),
        ("level", json!(rel.level)),
        ("graph_id", json!(graph.id())),
      ]
      .into_iter()
      .map(|(k, v)| (k.to_string(), v))
      .collect();
      if let Some(spec) = &rel.datasource {
        props.insert("datasource".to_string(), json!(spec.qualified_name()));
      }
      if let Some(spec) = &rel.data_output {
        props.insert("data_output".to_string(), json!(spec.qualified_name()));
      }

      let id = self
        .provider
        .create_relationship(
          source,
          target,
          &rel.relation_type.to_string(),
          props,
          depends_on,
          !depends_on,
        )
        .await?;
      created.push(id);
    }
    Ok(created)
  }

  /// Writes `output_properties` of `node_data` onto the data node with this
  /// uuid. Properties absent from `node_data` are written as `null`.
  pub async fn write_output_properties(
    &self,
    node_uuid: &str,
    node_data: &PropertyBag,
    output_properties: &[String],
  ) -> Result<(), StoreError> {
    let props: PropertyBag = output_properties
      .iter()
      .map(|p| (p.clone(), node_data.get(p).cloned().unwrap_or(PropertyValue::Null)))
      .collect();
    self.provider.set_node_properties(node_uuid, props, true).await
  }

  /// Writes a scenario's headline outputs back to their data nodes.
  pub async fn write_scenario_outputs(&self, result: &ScenarioRunResult) -> Result<(), StoreError> {
    for (uuid, outputs) in &result.outputs_per_node {
      let names: Vec<String> = outputs.keys().cloned().collect();
      self.write_output_properties(uuid, outputs, &names).await?;
    }
    Ok(())
  }
}
