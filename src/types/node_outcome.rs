//! Result of evaluating a single computation node.

use serde::{Deserialize, Serialize};

use super::{OutcomeStatus, PropertyValue};

/// One `(target node, property)` pair written by a computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyWrite {
  pub node_id: String,
  pub property_name: String,
}

/// Result of evaluating a single computation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
  pub node_id: String,
  pub status: OutcomeStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<PropertyValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure_reason: Option<String>,
  #[serde(default)]
  pub writes: Vec<PropertyWrite>,
}

impl NodeOutcome {
  pub fn success(node_id: impl Into<String>, value: PropertyValue, writes: Vec<PropertyWrite>) -> Self {
    Self {
      node_id: node_id.into(),
      status: OutcomeStatus::Success,
      value: Some(value),
      failure_reason: None,
      writes,
    }
  }

  pub fn failed(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
    Self {
      node_id: node_id.into(),
      status: OutcomeStatus::Failed,
      value: None,
      failure_reason: Some(reason.into()),
      writes: vec![],
    }
  }

  pub fn skipped(node_id: impl Into<String>, upstream: &str) -> Self {
    Self {
      node_id: node_id.into(),
      status: OutcomeStatus::Skipped,
      value: None,
      failure_reason: Some(format!("upstream computation '{upstream}' failed")),
      writes: vec![],
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == OutcomeStatus::Success
  }

  /// `node_id: reason` line used in scenario error lists.
  pub fn describe_failure(&self) -> Option<String> {
    self
      .failure_reason
      .as_ref()
      .map(|r| format!("{}: {}", self.node_id, r))
  }
}
