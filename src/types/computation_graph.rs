//! Immutable computation graph: computation nodes plus typed relationships.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{ComputationNode, ComputationRelationship, RelationType};

/// Relationship ids per node id, in insertion order.
pub type AdjacencyIndex = BTreeMap<String, Vec<String>>;

/// Immutable computation graph.
///
/// Built by chaining [`add_computation_node`](Self::add_computation_node) and
/// [`add_computation_relationship`](Self::add_computation_relationship); each call
/// returns a new graph and leaves `self` untouched. Maps that a call does not
/// change are shared between the old and new value.
#[derive(Debug, Clone, Default)]
pub struct ComputationGraph {
  id: String,
  base_graph_id: Option<String>,
  computation_nodes: Arc<BTreeMap<String, ComputationNode>>,
  computation_relationships: Arc<BTreeMap<String, ComputationRelationship>>,
  outgoing: Arc<AdjacencyIndex>,
  incoming: Arc<AdjacencyIndex>,
}

impl ComputationGraph {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      ..Self::default()
    }
  }

  /// Same graph, linked to the business data graph `base_graph_id`.
  pub fn with_base_graph_id(&self, base_graph_id: impl Into<String>) -> Self {
    let mut g = self.clone();
    g.base_graph_id = Some(base_graph_id.into());
    g
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn base_graph_id(&self) -> Option<&str> {
    self.base_graph_id.as_deref()
  }

  pub fn computation_nodes(&self) -> &BTreeMap<String, ComputationNode> {
    &self.computation_nodes
  }

  pub fn computation_relationships(&self) -> &BTreeMap<String, ComputationRelationship> {
    &self.computation_relationships
  }

  pub fn outgoing(&self) -> &AdjacencyIndex {
    &self.outgoing
  }

  pub fn incoming(&self) -> &AdjacencyIndex {
    &self.incoming
  }

  /// Inserts (or overwrites by id) a computation node.
  pub fn add_computation_node(&self, node: ComputationNode) -> Self {
    let mut g = self.clone();
    Arc::make_mut(&mut g.computation_nodes).insert(node.id.clone(), node);
    g
  }

  /// Inserts (or overwrites by id) a relationship and appends its id to the
  /// `outgoing[source_id]` and `incoming[target_id]` indexes.
  pub fn add_computation_relationship(&self, relationship: ComputationRelationship) -> Self {
    let mut g = self.clone();
    Arc::make_mut(&mut g.outgoing)
      .entry(relationship.source_id.clone())
      .or_default()
      .push(relationship.id.clone());
    Arc::make_mut(&mut g.incoming)
      .entry(relationship.target_id.clone())
      .or_default()
      .push(relationship.id.clone());
    Arc::make_mut(&mut g.computation_relationships).insert(relationship.id.clone(), relationship);
    g
  }

  pub fn get_computation_node(&self, node_id: &str) -> Option<&ComputationNode> {
    self.computation_nodes.get(node_id)
  }

  pub fn get_computation_relationship(&self, relationship_id: &str) -> Option<&ComputationRelationship> {
    self.computation_relationships.get(relationship_id)
  }

  pub fn is_computation_node(&self, node_id: &str) -> bool {
    self.computation_nodes.contains_key(node_id)
  }

  fn resolve<'a>(&'a self, index: &'a AdjacencyIndex, node_id: &str) -> Vec<&'a ComputationRelationship> {
    index
      .get(node_id)
      .map(|ids| {
        ids
          .iter()
          .filter_map(|rid| self.computation_relationships.get(rid))
          .collect()
      })
      .unwrap_or_default()
  }

  pub fn get_outgoing_relationships(&self, node_id: &str) -> Vec<&ComputationRelationship> {
    self.resolve(&self.outgoing, node_id)
  }

  pub fn get_incoming_relationships(&self, node_id: &str) -> Vec<&ComputationRelationship> {
    self.resolve(&self.incoming, node_id)
  }

  /// Computation nodes feeding `node_id` directly through `DEPENDS_ON` edges.
  ///
  /// Producers usually write to data nodes rather than to their consumers, so
  /// this is often empty; ordering through shared data properties is inferred
  /// by the executor instead.
  pub fn get_dependencies(&self, node_id: &str) -> Vec<&ComputationNode> {
    self
      .get_incoming_relationships(node_id)
      .into_iter()
      .filter(|r| r.relation_type == RelationType::DependsOn)
      .filter_map(|r| self.computation_nodes.get(&r.source_id))
      .collect()
  }

  /// Computation nodes written directly by `node_id` through `OUTPUT_TO` edges.
  pub fn get_dependents(&self, node_id: &str) -> Vec<&ComputationNode> {
    self
      .get_outgoing_relationships(node_id)
      .into_iter()
      .filter(|r| r.relation_type == RelationType::OutputTo)
      .filter_map(|r| self.computation_nodes.get(&r.target_id))
      .collect()
  }

  /// Ids read by `DEPENDS_ON` or written by `OUTPUT_TO` that are not computation nodes.
  pub fn get_data_node_ids(&self) -> BTreeSet<String> {
    self
      .computation_relationships
      .values()
      .map(|r| match r.relation_type {
        RelationType::DependsOn => &r.source_id,
        RelationType::OutputTo => &r.target_id,
      })
      .filter(|id| !self.computation_nodes.contains_key(*id))
      .cloned()
      .collect()
  }

  /// Property names written on each data node by `OUTPUT_TO` edges.
  pub fn get_output_properties_by_data_node(&self) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for rel in self.computation_relationships.values() {
      if rel.relation_type != RelationType::OutputTo || self.is_computation_node(&rel.target_id) {
        continue;
      }
      let Some(prop) = rel.property_name() else {
        continue;
      };
      out
        .entry(rel.target_id.clone())
        .or_default()
        .push(prop.to_string());
    }
    out
  }
}
