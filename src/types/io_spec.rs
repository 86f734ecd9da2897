//! Input/output bindings: which property of which entity a computation reads or writes.

use serde::{Deserialize, Serialize};

/// What kind of value a binding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
  #[default]
  Property,
  Entity,
  Graph,
}

/// Where a computation reads a value from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSpec {
  #[serde(default)]
  pub source_type: SpecKind,
  /// Logical category of the owning node, e.g. `Product`.
  pub entity_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub property_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub graph_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_id: Option<String>,
}

impl InputSpec {
  /// Binding to `entity_type.property_name`.
  pub fn property(entity_type: impl Into<String>, property_name: impl Into<String>) -> Self {
    Self {
      source_type: SpecKind::Property,
      entity_type: entity_type.into(),
      property_name: Some(property_name.into()),
      graph_name: None,
      node_id: None,
    }
  }
}

/// Where a computation writes a value to. Also used as the `datasource` of a
/// `DEPENDS_ON` edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputSpec {
  #[serde(default)]
  pub target_type: SpecKind,
  pub entity_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub property_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub graph_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_id: Option<String>,
}

impl OutputSpec {
  /// Binding to `entity_type.property_name`.
  pub fn property(entity_type: impl Into<String>, property_name: impl Into<String>) -> Self {
    Self {
      target_type: SpecKind::Property,
      entity_type: entity_type.into(),
      property_name: Some(property_name.into()),
      graph_name: None,
      node_id: None,
    }
  }

  /// `Entity.property` label used when a binding is shown or persisted.
  pub fn qualified_name(&self) -> String {
    match &self.property_name {
      Some(p) => format!("{}.{}", self.entity_type, p),
      None => self.entity_type.clone(),
    }
  }
}

impl From<&InputSpec> for OutputSpec {
  fn from(spec: &InputSpec) -> Self {
    Self {
      target_type: spec.source_type,
      entity_type: spec.entity_type.clone(),
      property_name: spec.property_name.clone(),
      graph_name: spec.graph_name.clone(),
      node_id: spec.node_id.clone(),
    }
  }
}
