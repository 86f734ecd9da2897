//! Record of one executor run: evaluation order and per-node outcomes.

use serde::{Deserialize, Serialize};

use super::{NodeOutcome, OutcomeStatus};

/// Record of one executor run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
  /// Topological order of every vertex, data nodes included.
  pub order: Vec<String>,
  /// One entry per computation node, in evaluation order.
  pub outcomes: Vec<NodeOutcome>,
  /// ISO 8601 timestamp when the run started.
  pub started_at: String,
  /// ISO 8601 timestamp when the run finished.
  pub finished_at: String,
}

impl ExecutionReport {
  /// True when every computation node evaluated successfully.
  pub fn success(&self) -> bool {
    self.outcomes.iter().all(NodeOutcome::is_success)
  }

  pub fn failures(&self) -> impl Iterator<Item = &NodeOutcome> {
    self.outcomes.iter().filter(|o| !o.is_success())
  }

  pub fn outcome(&self, node_id: &str) -> Option<&NodeOutcome> {
    self.outcomes.iter().find(|o| o.node_id == node_id)
  }

  /// Computation node ids in the order they were evaluated.
  pub fn computation_order(&self) -> Vec<&str> {
    self.outcomes.iter().map(|o| o.node_id.as_str()).collect()
  }

  pub fn count(&self, status: OutcomeStatus) -> usize {
    self.outcomes.iter().filter(|o| o.status == status).count()
  }
}
