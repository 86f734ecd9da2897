//! Computation graph model: bindings, nodes, relationships, the immutable graph,
//! and the records produced when it is executed.

use std::collections::BTreeMap;

mod computation_engine;
mod computation_graph;
mod computation_level;
mod computation_node;
mod computation_relationship;
mod execution_report;
mod executor_config;
mod graph_definition;
mod io_spec;
mod node_outcome;
mod outcome_status;
mod relation_type;

pub use computation_engine::ComputationEngine;
pub use computation_graph::{AdjacencyIndex, ComputationGraph};
pub use computation_level::ComputationLevel;
pub use computation_node::ComputationNode;
pub use computation_relationship::ComputationRelationship;
pub use execution_report::ExecutionReport;
pub use executor_config::{ExecutorConfig, FailurePolicy, ParseFailurePolicyError};
pub use graph_definition::GraphDefinition;
pub use io_spec::{InputSpec, OutputSpec, SpecKind};
pub use node_outcome::{NodeOutcome, PropertyWrite};
pub use outcome_status::OutcomeStatus;
pub use relation_type::RelationType;

/// Value stored under a data node property.
pub type PropertyValue = serde_json::Value;

/// Named properties of one data node.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

/// Property bags keyed by data node id.
pub type NodeDataMap = BTreeMap<String, PropertyBag>;

/// Opaque metadata attached to nodes and relationships.
pub type Metadata = BTreeMap<String, serde_json::Value>;
