//! A single computation unit of the graph.

use serde::{Deserialize, Serialize};

use super::{ComputationEngine, ComputationLevel, InputSpec, Metadata, OutputSpec};

/// A named computation: a formula over the properties bound by its incoming
/// `DEPENDS_ON` edges, broadcast to every target of its `OUTPUT_TO` edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationNode {
  pub id: String,
  /// Display name, e.g. `calculate_total_price`.
  pub name: String,
  #[serde(default)]
  pub level: ComputationLevel,
  #[serde(default)]
  pub inputs: Vec<InputSpec>,
  #[serde(default)]
  pub outputs: Vec<OutputSpec>,
  /// Formula source, see [`crate::formula`].
  pub code: String,
  #[serde(default)]
  pub engine: ComputationEngine,
  /// Opaque metadata; never interpreted by the executor.
  #[serde(default, skip_serializing_if = "Metadata::is_empty")]
  pub properties: Metadata,
  /// Tie-break among simultaneously eligible nodes: lower runs first.
  #[serde(default)]
  pub priority: i64,
}

impl ComputationNode {
  /// Property-level node evaluated in-process with priority 0.
  pub fn new(
    id: impl Into<String>,
    name: impl Into<String>,
    inputs: Vec<InputSpec>,
    outputs: Vec<OutputSpec>,
    code: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      level: ComputationLevel::Property,
      inputs,
      outputs,
      code: code.into(),
      engine: ComputationEngine::Python,
      properties: Metadata::new(),
      priority: 0,
    }
  }

  /// Same node with `priority` replaced.
  pub fn with_priority(mut self, priority: i64) -> Self {
    self.priority = priority;
    self
  }

  /// Returns a copy whose metadata is `self.properties` merged with `extra` (extra wins).
  pub fn with_properties<I>(&self, extra: I) -> Self
  where
    I: IntoIterator<Item = (String, serde_json::Value)>,
  {
    let mut node = self.clone();
    node.properties.extend(extra);
    node
  }

  pub fn get_property(&self, key: &str) -> Option<&serde_json::Value> {
    self.properties.get(key)
  }
}
