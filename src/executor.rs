//! Executes a computation graph against live data node properties.
//!
//! The [`Executor`] keeps a private working copy of every data node's property
//! bag. Each run orders the computations topologically (data flow plus the
//! writer-before-reader edges inferred from shared properties), evaluates
//! every formula against the properties bound by its `DEPENDS_ON` edges, and
//! broadcasts the result to every `OUTPUT_TO` target.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::formula::{Bindings, Formula, FormulaError, Value};
use crate::types::{
  ComputationGraph, ExecutionReport, ExecutorConfig, FailurePolicy, NodeDataMap, NodeOutcome,
  PropertyBag, PropertyValue, PropertyWrite,
};

/// Structural errors that abort a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
  #[error("computation graph contains a cycle through: {}", remaining.join(", "))]
  Cycle { remaining: Vec<String> },
}

/// Logs at `info` when `$verbose`, otherwise at `debug`.
macro_rules! progress {
  ($verbose:expr, $($arg:tt)+) => {
    if $verbose {
      info!($($arg)+);
    } else {
      debug!($($arg)+);
    }
  };
}

/// One `(node, property)` end of a data-flow edge.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PropertyRef {
  node_id: String,
  property_name: String,
}

/// A computation node prepared for evaluation.
#[derive(Debug, Clone)]
struct CompiledComputation {
  name: String,
  priority: i64,
  formula: Result<Formula, FormulaError>,
  inputs: Vec<PropertyRef>,
  outputs: Vec<PropertyRef>,
}

/// Vertices and ordering edges used for scheduling.
#[derive(Debug, Default)]
struct DependencyGraph {
  vertices: BTreeSet<String>,
  successors: BTreeMap<String, BTreeSet<String>>,
  predecessors: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
  fn add_edge(&mut self, from: &str, to: &str) {
    self.vertices.insert(from.to_string());
    self.vertices.insert(to.to_string());
    self
      .successors
      .entry(from.to_string())
      .or_default()
      .insert(to.to_string());
    self
      .predecessors
      .entry(to.to_string())
      .or_default()
      .insert(from.to_string());
  }

  fn predecessors_of(&self, id: &str) -> impl Iterator<Item = &String> {
    self.predecessors.get(id).into_iter().flatten()
  }
}

/// Runs a [`ComputationGraph`] over a mutable working copy of its data nodes.
///
/// Calls on one executor must be serialized; independent executors share
/// nothing and may run concurrently.
#[derive(Debug, Clone)]
pub struct Executor {
  graph: ComputationGraph,
  config: ExecutorConfig,
  data: NodeDataMap,
  computations: BTreeMap<String, CompiledComputation>,
  last_report: Option<ExecutionReport>,
}

impl Executor {
  pub fn new(graph: ComputationGraph, node_data: NodeDataMap) -> Self {
    Self::with_config(graph, node_data, ExecutorConfig::default())
  }

  /// Builds the working graph. Every data node in `node_data` becomes a
  /// vertex, as does every non-computation id referenced by a relationship
  /// (with an empty property bag). Formulas are parsed here; a parse error is
  /// reported when the node is evaluated.
  pub fn with_config(graph: ComputationGraph, node_data: NodeDataMap, config: ExecutorConfig) -> Self {
    let mut data = node_data;
    for id in graph.get_data_node_ids() {
      data.entry(id).or_default();
    }

    let mut computations = BTreeMap::new();
    for (id, node) in graph.computation_nodes() {
      // Bound in relationship id order, so the last id wins a shared name.
      let mut reads: Vec<_> = graph
        .get_incoming_relationships(id)
        .into_iter()
        .filter(|rel| rel.is_depends_on())
        .collect();
      reads.sort_by(|a, b| a.id.cmp(&b.id));
      let inputs: Vec<PropertyRef> = reads
        .into_iter()
        .filter_map(|rel| {
          rel.property_name().map(|p| PropertyRef {
            node_id: rel.source_id.clone(),
            property_name: p.to_string(),
          })
        })
        .collect();
      let outputs: Vec<PropertyRef> = graph
        .get_outgoing_relationships(id)
        .into_iter()
        .filter(|rel| rel.is_output_to() && !graph.is_computation_node(&rel.target_id))
        .filter_map(|rel| {
          rel.property_name().map(|p| PropertyRef {
            node_id: rel.target_id.clone(),
            property_name: p.to_string(),
          })
        })
        .collect();

      let formula = Formula::parse(&node.code);
      match &formula {
        Ok(f) => {
          let bound: BTreeSet<&str> = inputs.iter().map(|i| i.property_name.as_str()).collect();
          for name in f.variables() {
            if !bound.contains(name.as_str()) {
              warn!(node = %id, variable = %name, "formula references a name no input binds");
            }
          }
        }
        Err(e) => warn!(node = %id, error = %e, "formula does not parse"),
      }
      if !node.engine.is_in_process() {
        debug!(node = %id, engine = %node.engine, "evaluating formula in-process");
      }

      computations.insert(
        id.clone(),
        CompiledComputation {
          name: node.name.clone(),
          priority: node.priority,
          formula,
          inputs,
          outputs,
        },
      );
    }

    Self {
      graph,
      config,
      data,
      computations,
      last_report: None,
    }
  }

  pub fn graph(&self) -> &ComputationGraph {
    &self.graph
  }

  pub fn config(&self) -> &ExecutorConfig {
    &self.config
  }

  /// Report of the most recent run that got past ordering.
  pub fn last_report(&self) -> Option<&ExecutionReport> {
    self.last_report.as_ref()
  }

  /// `DEPENDS_ON` edges verbatim plus an edge `A -> B` whenever computation A
  /// writes `(D, P)` and computation B reads the same `(D, P)`.
  #[instrument(level = "trace", skip(self))]
  fn dependency_graph(&self) -> DependencyGraph {
    let mut deps = DependencyGraph::default();
    deps.vertices.extend(self.data.keys().cloned());
    deps.vertices.extend(self.computations.keys().cloned());

    let mut writes: Vec<(&str, &str, &str)> = Vec::new();
    let mut reads: Vec<(&str, &str, &str)> = Vec::new();
    for rel in self.graph.computation_relationships().values() {
      if rel.is_depends_on() {
        deps.add_edge(&rel.source_id, &rel.target_id);
        if let Some(p) = rel.property_name() {
          reads.push((rel.source_id.as_str(), rel.target_id.as_str(), p));
        }
      } else if let Some(p) = rel.property_name() {
        writes.push((rel.source_id.as_str(), rel.target_id.as_str(), p));
      }
    }

    for (writer, node, prop) in &writes {
      for (read_node, reader, read_prop) in &reads {
        if node == read_node && prop == read_prop && writer != reader {
          deps.add_edge(writer, reader);
        }
      }
    }
    deps
  }

  fn priority(&self, id: &str) -> i64 {
    self.computations.get(id).map_or(0, |c| c.priority)
  }

  /// Kahn's algorithm; among eligible vertices the lowest `(priority, id)`
  /// goes first. Data nodes have priority 0.
  fn topological_order(&self, deps: &DependencyGraph) -> Result<Vec<String>, ExecutorError> {
    let mut in_degree: BTreeMap<&str, usize> = deps
      .vertices
      .iter()
      .map(|v| (v.as_str(), deps.predecessors_of(v).count()))
      .collect();

    let mut ready: BinaryHeap<Reverse<(i64, &str)>> = in_degree
      .iter()
      .filter(|&(_, &d)| d == 0)
      .map(|(&v, _)| Reverse((self.priority(v), v)))
      .collect();

    let mut order = Vec::with_capacity(deps.vertices.len());
    while let Some(Reverse((_, v))) = ready.pop() {
      order.push(v.to_string());
      for succ in deps.successors.get(v).into_iter().flatten() {
        if let Some(d) = in_degree.get_mut(succ.as_str()) {
          *d -= 1;
          if *d == 0 {
            ready.push(Reverse((self.priority(succ), succ.as_str())));
          }
        }
      }
    }

    if order.len() < deps.vertices.len() {
      let remaining = in_degree
        .into_iter()
        .filter(|&(_, d)| d > 0)
        .map(|(v, _)| v.to_string())
        .collect();
      return Err(ExecutorError::Cycle { remaining });
    }
    Ok(order)
  }

  /// Evaluation order of every vertex, data nodes included.
  pub fn execution_order(&self) -> Result<Vec<String>, ExecutorError> {
    self.topological_order(&self.dependency_graph())
  }

  /// Runs every computation once. Returns `false` on a cycle, and under
  /// [`FailurePolicy::Poison`] also when any computation failed.
  pub fn execute(&mut self, verbose: bool) -> bool {
    match self.run(verbose) {
      Ok(report) => match self.config.failure_policy {
        FailurePolicy::Isolate => true,
        FailurePolicy::Poison => report.success(),
      },
      Err(_) => false,
    }
  }

  /// Runs every computation once and returns the per-node outcomes.
  ///
  /// A cycle aborts the run before anything is evaluated. Formula failures are
  /// recorded in the report and handled per [`FailurePolicy`].
  pub fn run(&mut self, verbose: bool) -> Result<ExecutionReport, ExecutorError> {
    let started_at = Utc::now().to_rfc3339();
    let deps = self.dependency_graph();
    let order = match self.topological_order(&deps) {
      Ok(order) => order,
      Err(e) => {
        error!(error = %e, "cannot order computation graph");
        self.last_report = None;
        return Err(e);
      }
    };
    let order_text = order.join(" -> ");
    progress!(verbose, order = %order_text, "execution order");

    let poison = self.config.failure_policy == FailurePolicy::Poison;
    // Failed computation id -> the failure it descends from.
    let mut failed_roots: BTreeMap<String, String> = BTreeMap::new();
    let mut outcomes = Vec::new();

    for id in &order {
      let Some(comp) = self.computations.get(id) else {
        continue;
      };

      if poison {
        let upstream = deps
          .predecessors_of(id)
          .find_map(|p| failed_roots.get(p).cloned());
        if let Some(root) = upstream {
          warn!(node = %id, upstream = %root, "skipping computation downstream of a failure");
          let outputs = comp.outputs.clone();
          self.write_outputs(&outputs, &PropertyValue::Null);
          outcomes.push(NodeOutcome::skipped(id.clone(), &root));
          failed_roots.insert(id.clone(), root);
          continue;
        }
      }

      progress!(verbose, node = %id, name = %comp.name, "executing computation");
      match self.evaluate(id) {
        Ok(value) => {
          progress!(verbose, node = %id, result = %value, "computation result");
          let outputs = comp.outputs.clone();
          for out in &outputs {
            progress!(
              verbose,
              node = %out.node_id,
              property = %out.property_name,
              value = %value,
              "updated property"
            );
          }
          let writes = self.write_outputs(&outputs, &value);
          outcomes.push(NodeOutcome::success(id.clone(), value, writes));
        }
        Err(e) => {
          warn!(node = %id, error = %e, "computation failed");
          if poison {
            let outputs = comp.outputs.clone();
            self.write_outputs(&outputs, &PropertyValue::Null);
            failed_roots.insert(id.clone(), id.clone());
          }
          outcomes.push(NodeOutcome::failed(id.clone(), e.to_string()));
        }
      }
    }

    let report = ExecutionReport {
      order,
      outcomes,
      started_at,
      finished_at: Utc::now().to_rfc3339(),
    };
    self.last_report = Some(report.clone());
    Ok(report)
  }

  /// Binds the node's inputs and evaluates its formula.
  #[instrument(level = "trace", skip(self))]
  fn evaluate(&self, id: &str) -> Result<PropertyValue, FormulaError> {
    let Some(comp) = self.computations.get(id) else {
      return Ok(PropertyValue::Null);
    };
    let formula = comp.formula.as_ref().map_err(Clone::clone)?;
    let bindings: Bindings = comp
      .inputs
      .iter()
      .map(|input| {
        let value = self
          .data
          .get(&input.node_id)
          .and_then(|bag| bag.get(&input.property_name))
          .map_or(Value::Null, Value::from_property);
        (input.property_name.clone(), value)
      })
      .collect();
    formula.evaluate(&bindings)?.into_property()
  }

  fn write_outputs(&mut self, outputs: &[PropertyRef], value: &PropertyValue) -> Vec<PropertyWrite> {
    let mut writes = Vec::with_capacity(outputs.len());
    for out in outputs {
      if let Some(bag) = self.data.get_mut(&out.node_id) {
        bag.insert(out.property_name.clone(), value.clone());
        writes.push(PropertyWrite {
          node_id: out.node_id.clone(),
          property_name: out.property_name.clone(),
        });
      }
    }
    writes
  }

  /// Sets one property on a data node. Returns `false` (and changes nothing)
  /// when `node_id` is not a data node of this executor.
  pub fn update_node_property(
    &mut self,
    node_id: &str,
    property_name: impl Into<String>,
    value: PropertyValue,
  ) -> bool {
    match self.data.get_mut(node_id) {
      Some(bag) => {
        bag.insert(property_name.into(), value);
        true
      }
      None => {
        debug!(node = %node_id, "ignoring update for unknown data node");
        false
      }
    }
  }

  /// Deep copy of every data node's property bag.
  pub fn snapshot_data_nodes(&self) -> NodeDataMap {
    self.data.clone()
  }

  /// Overwrites data node bags from a snapshot. Ids this executor does not know
  /// are ignored.
  pub fn restore_data_nodes(&mut self, snapshot: &NodeDataMap) {
    for (id, bag) in snapshot {
      if let Some(current) = self.data.get_mut(id) {
        current.clone_from(bag);
      }
    }
  }

  pub fn get_node_data(&self, node_id: &str) -> Option<&PropertyBag> {
    self.data.get(node_id)
  }

  pub fn get_all_data_nodes(&self) -> &NodeDataMap {
    &self.data
  }

  /// Logs every data node's properties at `info`.
  pub fn describe_data_nodes(&self, title: &str) {
    info!("{title}");
    for (id, bag) in &self.data {
      info!(node = %id, "[{id}]");
      for (key, value) in bag {
        info!(node = %id, property = %key, "  {key}: {value}");
      }
    }
  }
}
