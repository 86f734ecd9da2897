//! Outcome status for a computation node evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome status for a computation node evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
  /// Formula evaluated and outputs were written.
  Success,
  /// Formula failed; see the outcome's `failure_reason`.
  Failed,
  /// Not evaluated because an upstream node failed under the poison policy.
  Skipped,
}

impl fmt::Display for OutcomeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OutcomeStatus::Success => write!(f, "success"),
      OutcomeStatus::Failed => write!(f, "failed"),
      OutcomeStatus::Skipped => write!(f, "skipped"),
    }
  }
}
