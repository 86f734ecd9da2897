//! Executor configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happens downstream of a computation whose formula fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
  /// Leave the failed node's outputs as they were and keep evaluating every
  /// other node. The run still counts as successful.
  #[default]
  Isolate,
  /// Write `null` to the failed node's outputs, skip every transitive
  /// dependent (nulling its outputs too) and mark the run unsuccessful.
  Poison,
}

impl fmt::Display for FailurePolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailurePolicy::Isolate => write!(f, "isolate"),
      FailurePolicy::Poison => write!(f, "poison"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown failure policy '{0}' (expected 'isolate' or 'poison')")]
pub struct ParseFailurePolicyError(pub String);

impl FromStr for FailurePolicy {
  type Err = ParseFailurePolicyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "isolate" => Ok(FailurePolicy::Isolate),
      "poison" => Ok(FailurePolicy::Poison),
      _ => Err(ParseFailurePolicyError(s.to_string())),
    }
  }
}

/// Executor settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutorConfig {
  #[serde(default)]
  pub failure_policy: FailurePolicy,
}

impl ExecutorConfig {
  pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
    self.failure_policy = failure_policy;
    self
  }
}
