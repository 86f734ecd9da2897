//! Edge kinds of a computation graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Edge kinds of a computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
  /// Source → computation: the computation reads `datasource.property_name` from the source.
  DependsOn,
  /// Computation → target: the computation writes `data_output.property_name` on the target.
  OutputTo,
}

impl fmt::Display for RelationType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RelationType::DependsOn => write!(f, "DEPENDS_ON"),
      RelationType::OutputTo => write!(f, "OUTPUT_TO"),
    }
  }
}
