//! # propgraph
//!
//! Property-level computation graphs with isolated what-if scenarios.
//!
//! A [`ComputationGraph`] connects *data nodes* (entities known only by id,
//! each holding a bag of named properties) to *computation nodes* (small
//! formulas) through `DEPENDS_ON` (read) and `OUTPUT_TO` (write) edges.
//!
//! ## Architecture
//!
//! - [`types`]: the immutable graph model and run records.
//! - [`formula`]: the expression language computation nodes are written in.
//! - [`executor`]: orders computations (including writer-before-reader edges
//!   inferred from shared properties) and evaluates them over a working copy
//!   of the data nodes.
//! - [`what_if`]: snapshot, override, re-run, diff, restore.
//! - [`store`]: the property-graph store the data comes from and results go to.
//! - [`graph_io`]: JSON files for graph definitions and node data.
//!
//! ```
//! use propgraph::{ComputationGraph, ComputationNode, ComputationRelationship, Executor, InputSpec, OutputSpec};
//! use propgraph::types::NodeDataMap;
//! use serde_json::json;
//!
//! let node = ComputationNode::new(
//!   "calc_subtotal",
//!   "calculate_subtotal",
//!   vec![InputSpec::property("Order", "price"), InputSpec::property("Order", "quantity")],
//!   vec![OutputSpec::property("Invoice", "subtotal")],
//!   "price * quantity",
//! );
//! let graph = ComputationGraph::new("invoice")
//!   .add_computation_node(node)
//!   .add_computation_relationship(ComputationRelationship::depends_on(
//!     "r1", "order_001", "calc_subtotal", OutputSpec::property("Order", "price"),
//!   ))
//!   .add_computation_relationship(ComputationRelationship::depends_on(
//!     "r2", "order_001", "calc_subtotal", OutputSpec::property("Order", "quantity"),
//!   ))
//!   .add_computation_relationship(ComputationRelationship::output_to(
//!     "r3", "calc_subtotal", "invoice_001", OutputSpec::property("Invoice", "subtotal"),
//!   ));
//!
//! let mut data = NodeDataMap::new();
//! data.insert(
//!   "order_001".into(),
//!   [("price".to_string(), json!(100.0)), ("quantity".to_string(), json!(5))].into(),
//! );
//!
//! let mut executor = Executor::new(graph, data);
//! assert!(executor.execute(false));
//! assert_eq!(executor.get_node_data("invoice_001").unwrap()["subtotal"], json!(500.0));
//! ```

pub mod executor;
#[cfg(test)]
mod executor_test;
#[cfg(test)]
mod fixtures;
pub mod formula;
pub mod graph_io;
pub mod store;
pub mod types;
pub mod what_if;

pub use executor::{Executor, ExecutorError};
pub use formula::{Formula, FormulaError};
pub use types::{
  ComputationGraph, ComputationNode, ComputationRelationship, ExecutionReport, ExecutorConfig,
  FailurePolicy, GraphDefinition, InputSpec, NodeOutcome, OutcomeStatus, OutputSpec,
  RelationType,
};
pub use what_if::{PropertyDiff, PropertyOverride, ScenarioRunResult, WhatIfSimulator};
