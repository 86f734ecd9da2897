//! A typed, directed edge of the computation graph.

use serde::{Deserialize, Serialize};

use super::{Metadata, OutputSpec, RelationType};

fn default_level() -> String {
  "property".to_string()
}

/// A typed, directed edge of the computation graph.
///
/// `source_id`/`target_id` name either a computation node or a data node; data
/// nodes are not stored in the graph and are known only through these ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationRelationship {
  pub id: String,
  pub source_id: String,
  pub target_id: String,
  #[serde(default)]
  pub name: String,
  pub relation_type: RelationType,
  #[serde(default = "default_level")]
  pub level: String,
  /// Property read from `source_id`. Meaningful for `DEPENDS_ON`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub datasource: Option<OutputSpec>,
  /// Property written on `target_id`. Meaningful for `OUTPUT_TO`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_output: Option<OutputSpec>,
  #[serde(default, skip_serializing_if = "Metadata::is_empty")]
  pub properties: Metadata,
}

impl ComputationRelationship {
  /// `source` is read by computation `target` through `datasource`.
  pub fn depends_on(
    id: impl Into<String>,
    source_id: impl Into<String>,
    target_id: impl Into<String>,
    datasource: OutputSpec,
  ) -> Self {
    Self {
      id: id.into(),
      source_id: source_id.into(),
      target_id: target_id.into(),
      name: String::new(),
      relation_type: RelationType::DependsOn,
      level: default_level(),
      datasource: Some(datasource),
      data_output: None,
      properties: Metadata::new(),
    }
  }

  /// Computation `source` writes its result on `target` through `data_output`.
  pub fn output_to(
    id: impl Into<String>,
    source_id: impl Into<String>,
    target_id: impl Into<String>,
    data_output: OutputSpec,
  ) -> Self {
    Self {
      id: id.into(),
      source_id: source_id.into(),
      target_id: target_id.into(),
      name: String::new(),
      relation_type: RelationType::OutputTo,
      level: default_level(),
      datasource: None,
      data_output: Some(data_output),
      properties: Metadata::new(),
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// The binding that matters for this edge's `relation_type`.
  pub fn binding(&self) -> Option<&OutputSpec> {
    match self.relation_type {
      RelationType::DependsOn => self.datasource.as_ref(),
      RelationType::OutputTo => self.data_output.as_ref(),
    }
  }

  /// Property name read (`DEPENDS_ON`) or written (`OUTPUT_TO`) by this edge.
  pub fn property_name(&self) -> Option<&str> {
    self.binding().and_then(|s| s.property_name.as_deref())
  }

  pub fn is_depends_on(&self) -> bool {
    self.relation_type == RelationType::DependsOn
  }

  pub fn is_output_to(&self) -> bool {
    self.relation_type == RelationType::OutputTo
  }

  /// Returns a copy whose metadata is merged with `extra` (extra wins).
  pub fn with_properties<I>(&self, extra: I) -> Self
  where
    I: IntoIterator<Item = (String, serde_json::Value)>,
  {
    let mut rel = self.clone();
    rel.properties.extend(extra);
    rel
  }

  pub fn get_property(&self, key: &str) -> Option<&serde_json::Value> {
    self.properties.get(key)
  }
}
