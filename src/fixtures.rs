//! Shared graphs and data used across unit tests.

use serde_json::json;

use crate::types::{
  ComputationGraph, ComputationNode, ComputationRelationship, InputSpec, NodeDataMap, OutputSpec,
  PropertyBag,
};

pub(crate) fn bag(pairs: &[(&str, serde_json::Value)]) -> PropertyBag {
  pairs
    .iter()
    .map(|(k, v)| ((*k).to_string(), v.clone()))
    .collect()
}

/// Adds a computation node with one `DEPENDS_ON` edge per `(source, entity, property)`
/// read and one `OUTPUT_TO` edge per `(target, entity, property)` write.
pub(crate) fn with_computation(
  graph: ComputationGraph,
  id: &str,
  code: &str,
  priority: i64,
  reads: &[(&str, &str, &str)],
  writes: &[(&str, &str, &str)],
) -> ComputationGraph {
  let node = ComputationNode::new(
    id,
    id,
    reads
      .iter()
      .map(|(_, e, p)| InputSpec::property(*e, *p))
      .collect(),
    writes
      .iter()
      .map(|(_, e, p)| OutputSpec::property(*e, *p))
      .collect(),
    code,
  )
  .with_priority(priority);
  let mut g = graph.add_computation_node(node);
  for (source, entity, prop) in reads {
    g = g.add_computation_relationship(ComputationRelationship::depends_on(
      format!("{source}.{prop}->{id}"),
      *source,
      id,
      OutputSpec::property(*entity, *prop),
    ));
  }
  for (target, entity, prop) in writes {
    g = g.add_computation_relationship(ComputationRelationship::output_to(
      format!("{id}->{target}.{prop}"),
      id,
      *target,
      OutputSpec::property(*entity, *prop),
    ));
  }
  g
}

/// `order_001 -> calc_subtotal -> invoice_001.subtotal -> calc_tax -> invoice_001.tax`.
pub(crate) fn invoice_graph() -> ComputationGraph {
  let g = with_computation(
    ComputationGraph::new("invoice"),
    "calc_subtotal",
    "price * quantity",
    0,
    &[("order_001", "Order", "price"), ("order_001", "Order", "quantity")],
    &[("invoice_001", "Invoice", "subtotal")],
  );
  with_computation(
    g,
    "calc_tax",
    "subtotal * tax_rate",
    0,
    &[
      ("invoice_001", "Invoice", "subtotal"),
      ("invoice_001", "Invoice", "tax_rate"),
    ],
    &[("invoice_001", "Invoice", "tax")],
  )
}

pub(crate) fn invoice_data() -> NodeDataMap {
  let mut data = NodeDataMap::new();
  data.insert(
    "order_001".to_string(),
    bag(&[("price", json!(100.0)), ("quantity", json!(5))]),
  );
  data.insert("invoice_001".to_string(), bag(&[("tax_rate", json!(0.1))]));
  data
}

/// Three chained computations over a single data node.
pub(crate) fn multi_relation_graph() -> ComputationGraph {
  let p = "product_001";
  let g = with_computation(
    ComputationGraph::new("multi_relation"),
    "calc_total",
    "price * quantity",
    0,
    &[(p, "Product", "price"), (p, "Product", "quantity")],
    &[(p, "Product", "total_output")],
  );
  let g = with_computation(
    g,
    "calc_discount",
    "total_output * (1 - discount_rate)",
    0,
    &[(p, "Product", "total_output"), (p, "Product", "discount_rate")],
    &[(p, "Product", "price_after_discount")],
  );
  with_computation(
    g,
    "calc_final",
    "price_after_discount * (1 + tax_rate)",
    0,
    &[(p, "Product", "price_after_discount"), (p, "Product", "tax_rate")],
    &[(p, "Product", "final_price")],
  )
}

pub(crate) fn multi_relation_data() -> NodeDataMap {
  let mut data = NodeDataMap::new();
  data.insert(
    "product_001".to_string(),
    bag(&[
      ("price", json!(100.0)),
      ("quantity", json!(2)),
      ("discount_rate", json!(0.1)),
      ("tax_rate", json!(0.08)),
    ]),
  );
  data
}

/// Shipment delay feeding a production plan and then a product.
///
/// Node ids are chosen so that plain id order would evaluate the reader
/// (`a_calc_production_ready_days`) before its writer (`z_calc_actual_start_days`).
pub(crate) fn supply_chain_graph() -> ComputationGraph {
  let g = with_computation(
    ComputationGraph::new("supply_chain"),
    "calc_delay_days",
    "actual_delivery_days - planned_delivery_days",
    0,
    &[
      ("shipment_001", "Shipment", "actual_delivery_days"),
      ("shipment_001", "Shipment", "planned_delivery_days"),
    ],
    &[("shipment_001", "Shipment", "delay_days")],
  );
  let g = with_computation(
    g,
    "z_calc_actual_start_days",
    "planned_start_days + delay_days",
    0,
    &[
      ("plan_001", "ProductionPlan", "planned_start_days"),
      ("shipment_001", "Shipment", "delay_days"),
    ],
    &[("plan_001", "ProductionPlan", "actual_start_days")],
  );
  with_computation(
    g,
    "a_calc_production_ready_days",
    "actual_start_days + production_duration_days",
    0,
    &[
      ("plan_001", "ProductionPlan", "actual_start_days"),
      ("plan_001", "ProductionPlan", "production_duration_days"),
    ],
    &[("product_001", "Product", "production_ready_days")],
  )
}

pub(crate) fn supply_chain_data() -> NodeDataMap {
  let mut data = NodeDataMap::new();
  data.insert(
    "shipment_001".to_string(),
    bag(&[
      ("actual_delivery_days", json!(15)),
      ("planned_delivery_days", json!(10)),
    ]),
  );
  data.insert(
    "plan_001".to_string(),
    bag(&[
      ("planned_start_days", json!(12)),
      ("production_duration_days", json!(20)),
    ]),
  );
  data.insert("product_001".to_string(), PropertyBag::new());
  data
}
