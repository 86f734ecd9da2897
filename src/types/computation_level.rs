//! Granularity a computation operates at.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Granularity a computation operates at. Only `Property` is evaluated by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationLevel {
  #[default]
  Property,
  Node,
  Graph,
}

impl fmt::Display for ComputationLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ComputationLevel::Property => write!(f, "property"),
      ComputationLevel::Node => write!(f, "node"),
      ComputationLevel::Graph => write!(f, "graph"),
    }
  }
}
