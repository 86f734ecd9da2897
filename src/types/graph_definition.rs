//! Serializable form of a [`ComputationGraph`].

use serde::{Deserialize, Serialize};

use super::{ComputationGraph, ComputationNode, ComputationRelationship};

/// Serializable form of a [`ComputationGraph`]: plain lists instead of maps and indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_graph_id: Option<String>,
  #[serde(default)]
  pub computation_nodes: Vec<ComputationNode>,
  #[serde(default)]
  pub computation_relationships: Vec<ComputationRelationship>,
}

impl GraphDefinition {
  /// Builds the immutable graph by chained additions, in list order.
  pub fn to_graph(&self) -> ComputationGraph {
    let mut graph = ComputationGraph::new(self.id.clone());
    if let Some(base) = &self.base_graph_id {
      graph = graph.with_base_graph_id(base.clone());
    }
    let graph = self
      .computation_nodes
      .iter()
      .cloned()
      .fold(graph, |g, n| g.add_computation_node(n));
    self
      .computation_relationships
      .iter()
      .cloned()
      .fold(graph, |g, r| g.add_computation_relationship(r))
  }
}

impl From<&ComputationGraph> for GraphDefinition {
  fn from(graph: &ComputationGraph) -> Self {
    Self {
      id: graph.id().to_string(),
      base_graph_id: graph.base_graph_id().map(String::from),
      computation_nodes: graph.computation_nodes().values().cloned().collect(),
      computation_relationships: graph.computation_relationships().values().cloned().collect(),
    }
  }
}
