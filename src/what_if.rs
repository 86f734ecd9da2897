//! Isolated "what if" trials on top of an [`Executor`].
//!
//! A trial snapshots the executor's data nodes, applies property overrides,
//! re-runs the graph and diffs the result against the snapshot. The snapshot
//! is always restored before the trial returns, including when it unwinds.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::executor::{Executor, ExecutorError};
use crate::types::{ExecutionReport, NodeDataMap, PropertyBag, PropertyValue};

/// One `node.property = value` override applied for the duration of a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyOverride {
  pub node_id: String,
  pub property_name: String,
  pub value: PropertyValue,
}

impl PropertyOverride {
  pub fn new(node_id: impl Into<String>, property_name: impl Into<String>, value: PropertyValue) -> Self {
    Self {
      node_id: node_id.into(),
      property_name: property_name.into(),
      value,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid override '{0}' (expected node.property=value)")]
pub struct ParseOverrideError(pub String);

/// Parses `node.property=value`. The value is read as JSON when it parses
/// (`200`, `true`, `"x"`, `null`) and as plain text otherwise. The node id
/// ends at the last `.` before the `=`.
impl FromStr for PropertyOverride {
  type Err = ParseOverrideError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = || ParseOverrideError(s.to_string());
    let (target, raw) = s.split_once('=').ok_or_else(err)?;
    let (node_id, property_name) = target.trim().rsplit_once('.').ok_or_else(err)?;
    if node_id.is_empty() || property_name.is_empty() {
      return Err(err());
    }
    let raw = raw.trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| PropertyValue::String(raw.to_string()));
    Ok(Self::new(node_id, property_name, value))
  }
}

impl fmt::Display for PropertyOverride {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}={}", self.node_id, self.property_name, self.value)
  }
}

/// A property whose value differs between baseline and scenario. `None` means
/// the property is absent on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDiff {
  pub node_id: String,
  pub property_name: String,
  pub baseline_value: Option<PropertyValue>,
  pub scenario_value: Option<PropertyValue>,
}

/// Everything a trial produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRunResult {
  pub title: String,
  /// Data nodes before the overrides were applied.
  pub baseline: NodeDataMap,
  /// Data nodes after the overrides and the re-run.
  pub scenario: NodeDataMap,
  /// Changed properties, ordered by node then property.
  pub diff: Vec<PropertyDiff>,
  /// Overrides grouped by node.
  pub overrides: BTreeMap<String, PropertyBag>,
  /// Scenario values of the properties the graph writes, per data node.
  pub outputs_per_node: NodeDataMap,
  /// Sorted, distinct node ids appearing in `diff`.
  pub affected_node_ids: Vec<String>,
  /// False on a cycle, a failed computation or an override on an unknown node.
  pub success: bool,
  pub errors: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub report: Option<ExecutionReport>,
}

impl ScenarioRunResult {
  pub fn diff_for(&self, node_id: &str, property_name: &str) -> Option<&PropertyDiff> {
    self
      .diff
      .iter()
      .find(|d| d.node_id == node_id && d.property_name == property_name)
  }
}

/// Every `(node, property)` whose value differs between `baseline` and
/// `scenario`, including properties present on one side only.
pub fn diff_data_nodes(baseline: &NodeDataMap, scenario: &NodeDataMap) -> Vec<PropertyDiff> {
  let empty = PropertyBag::new();
  let node_ids: BTreeSet<&String> = baseline.keys().chain(scenario.keys()).collect();
  let mut diff = Vec::new();
  for node_id in node_ids {
    let before = baseline.get(node_id).unwrap_or(&empty);
    let after = scenario.get(node_id).unwrap_or(&empty);
    let names: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    for name in names {
      let (b, a) = (before.get(name), after.get(name));
      if b != a {
        diff.push(PropertyDiff {
          node_id: node_id.clone(),
          property_name: name.clone(),
          baseline_value: b.cloned(),
          scenario_value: a.cloned(),
        });
      }
    }
  }
  diff
}

/// Puts the snapshot back when dropped, so the executor is restored on every
/// exit path of a trial.
struct RestoreOnDrop<'e> {
  executor: &'e mut Executor,
  snapshot: NodeDataMap,
}

impl Drop for RestoreOnDrop<'_> {
  fn drop(&mut self) {
    self.executor.restore_data_nodes(&self.snapshot);
  }
}

/// Runs what-if trials against one executor, one at a time.
pub struct WhatIfSimulator<'e> {
  executor: &'e mut Executor,
}

impl<'e> WhatIfSimulator<'e> {
  pub fn new(executor: &'e mut Executor) -> Self {
    Self { executor }
  }

  pub fn executor(&self) -> &Executor {
    &*self.executor
  }

  /// Applies `overrides`, re-runs the graph and reports what changed. The
  /// executor's data nodes are unchanged when this returns.
  pub fn run_scenario(&mut self, overrides: &[PropertyOverride], title: &str) -> ScenarioRunResult {
    let baseline = self.executor.snapshot_data_nodes();
    let mut guard = RestoreOnDrop {
      executor: &mut *self.executor,
      snapshot: baseline.clone(),
    };

    info!(title = %title, overrides = overrides.len(), "running what-if scenario");
    let mut errors = Vec::new();
    let mut grouped: BTreeMap<String, PropertyBag> = BTreeMap::new();
    for o in overrides {
      grouped
        .entry(o.node_id.clone())
        .or_default()
        .insert(o.property_name.clone(), o.value.clone());
      if !guard
        .executor
        .update_node_property(&o.node_id, o.property_name.clone(), o.value.clone())
      {
        warn!(node = %o.node_id, property = %o.property_name, "override targets an unknown data node");
        errors.push(format!("{}: not a data node of this graph", o.node_id));
      }
    }

    let report = match guard.executor.run(false) {
      Ok(report) => {
        errors.extend(report.failures().filter_map(|f| f.describe_failure()));
        Some(report)
      }
      Err(e) => {
        errors.push(e.to_string());
        None
      }
    };

    let scenario = guard.executor.snapshot_data_nodes();
    let outputs_per_node: NodeDataMap = guard
      .executor
      .graph()
      .get_output_properties_by_data_node()
      .into_iter()
      .filter_map(|(node_id, props)| {
        let state = scenario.get(&node_id)?;
        let bag: PropertyBag = props
          .into_iter()
          .filter_map(|p| state.get(&p).map(|v| (p.clone(), v.clone())))
          .collect();
        Some((node_id, bag))
      })
      .collect();
    drop(guard);

    let diff = diff_data_nodes(&baseline, &scenario);
    let affected_node_ids: Vec<String> = diff
      .iter()
      .map(|d| d.node_id.clone())
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();

    ScenarioRunResult {
      title: title.to_string(),
      baseline,
      scenario,
      diff,
      overrides: grouped,
      outputs_per_node,
      affected_node_ids,
      success: report.is_some() && errors.is_empty(),
      errors,
      report,
    }
  }

  /// Changes a single property, re-runs, logs the resulting data nodes and
  /// returns them. The executor is restored afterwards, also when the graph
  /// cannot be ordered. Per-node failures are logged by the run and still
  /// yield the resulting state.
  pub fn simulate_property_change(
    &mut self,
    node_id: &str,
    property_name: &str,
    value: PropertyValue,
    title: &str,
  ) -> Result<NodeDataMap, ExecutorError> {
    let snapshot = self.executor.snapshot_data_nodes();
    let mut guard = RestoreOnDrop {
      executor: &mut *self.executor,
      snapshot,
    };
    let original = guard
      .executor
      .get_node_data(node_id)
      .and_then(|bag| bag.get(property_name))
      .cloned()
      .unwrap_or(PropertyValue::Null);
    info!(
      title = %title,
      node = %node_id,
      property = %property_name,
      from = %original,
      to = %value,
      "what-if property change"
    );
    if !guard.executor.update_node_property(node_id, property_name, value) {
      warn!(node = %node_id, "property change targets an unknown data node");
    }
    let report = guard.executor.run(false)?;
    if !report.success() {
      warn!(title = %title, failures = report.failures().count(), "what-if run had failing computations");
    }
    guard.executor.describe_data_nodes(&format!("Results after {title}"));
    Ok(guard.executor.snapshot_data_nodes())
  }
}
