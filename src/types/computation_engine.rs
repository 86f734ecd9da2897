//! Which engine a computation node's code targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which engine a computation node's code targets.
///
/// Only [`ComputationEngine::Python`] formulas are evaluated in-process; the
/// name is kept for compatibility with stored graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationEngine {
  Neo4j,
  #[default]
  Python,
  External,
}

impl ComputationEngine {
  /// True when the executor can evaluate this engine's code itself.
  pub fn is_in_process(self) -> bool {
    matches!(self, ComputationEngine::Python)
  }
}

impl fmt::Display for ComputationEngine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ComputationEngine::Neo4j => write!(f, "neo4j"),
      ComputationEngine::Python => write!(f, "python"),
      ComputationEngine::External => write!(f, "external"),
    }
  }
}
