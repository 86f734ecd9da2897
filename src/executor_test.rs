//! Tests for `Executor`.

use proptest::prelude::*;
use serde_json::json;

use crate::executor::{Executor, ExecutorError};
use crate::fixtures::{
  bag, invoice_data, invoice_graph, multi_relation_data, multi_relation_graph, supply_chain_data,
  supply_chain_graph, with_computation,
};
use crate::types::{
  ComputationGraph, ComputationNode, ComputationRelationship, ExecutorConfig, FailurePolicy,
  InputSpec, NodeDataMap, OutcomeStatus, OutputSpec, PropertyBag,
};

fn prop(exec: &Executor, node: &str, name: &str) -> Option<f64> {
  exec
    .get_node_data(node)
    .and_then(|b| b.get(name))
    .and_then(|v| v.as_f64())
}

fn position(order: &[String], id: &str) -> usize {
  order.iter().position(|v| v == id).unwrap()
}

/// Two siblings reading the same data node, nothing ordering them but priority.
fn siblings_graph(first_priority: i64, second_priority: i64) -> ComputationGraph {
  let g = with_computation(
    ComputationGraph::new("siblings"),
    "a_flag",
    "x > 1",
    first_priority,
    &[("source_001", "Source", "x")],
    &[("sink_001", "Sink", "a")],
  );
  with_computation(
    g,
    "b_flag",
    "x > 2",
    second_priority,
    &[("source_001", "Source", "x")],
    &[("sink_001", "Sink", "b")],
  )
}

fn siblings_data() -> NodeDataMap {
  let mut data = NodeDataMap::new();
  data.insert("source_001".to_string(), bag(&[("x", json!(3))]));
  data.insert("sink_001".to_string(), PropertyBag::new());
  data
}

/// `calc_subtotal` divides by zero; `calc_tax` reads what it would have written.
fn failing_invoice_graph() -> ComputationGraph {
  let g = with_computation(
    ComputationGraph::new("failing_invoice"),
    "calc_subtotal",
    "price / 0",
    0,
    &[("order_001", "Order", "price")],
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

fn failing_invoice_data() -> NodeDataMap {
  let mut data = invoice_data();
  data
    .get_mut("invoice_001")
    .unwrap()
    .insert("subtotal".to_string(), json!(10.0));
  data
}

#[test]
fn test_linear_chain_computes_subtotal_and_tax() {
  let mut exec = Executor::new(invoice_graph(), invoice_data());
  assert!(exec.execute(false));
  assert_eq!(prop(&exec, "invoice_001", "subtotal"), Some(500.0));
  assert_eq!(prop(&exec, "invoice_001", "tax"), Some(50.0));
  assert_eq!(prop(&exec, "order_001", "price"), Some(100.0));
}

#[test]
fn test_multi_relation_chain_on_one_node() {
  let mut exec = Executor::new(multi_relation_graph(), multi_relation_data());
  assert!(exec.execute(true));
  assert_eq!(prop(&exec, "product_001", "total_output"), Some(200.0));
  assert_eq!(prop(&exec, "product_001", "price_after_discount"), Some(180.0));
  let final_price = prop(&exec, "product_001", "final_price").unwrap();
  assert!((final_price - 194.4).abs() < 1e-9);
}

#[test]
fn test_writer_runs_before_reader_of_shared_property() {
  let exec = Executor::new(supply_chain_graph(), supply_chain_data());
  let order = exec.execution_order().unwrap();
  assert!(
    position(&order, "z_calc_actual_start_days") < position(&order, "a_calc_production_ready_days")
  );
  assert!(position(&order, "calc_delay_days") < position(&order, "z_calc_actual_start_days"));
}

#[test]
fn test_supply_chain_values_propagate() {
  let mut exec = Executor::new(supply_chain_graph(), supply_chain_data());
  let report = exec.run(false).unwrap();
  assert!(report.success());
  assert_eq!(prop(&exec, "shipment_001", "delay_days"), Some(5.0));
  assert_eq!(prop(&exec, "plan_001", "actual_start_days"), Some(17.0));
  assert_eq!(prop(&exec, "product_001", "production_ready_days"), Some(37.0));
}

#[test]
fn test_lower_priority_sibling_runs_first() {
  let exec = Executor::new(siblings_graph(3, 1), siblings_data());
  let order = exec.execution_order().unwrap();
  assert!(position(&order, "b_flag") < position(&order, "a_flag"));

  let exec = Executor::new(siblings_graph(1, 3), siblings_data());
  let order = exec.execution_order().unwrap();
  assert!(position(&order, "a_flag") < position(&order, "b_flag"));
}

#[test]
fn test_equal_priority_breaks_ties_by_id() {
  let exec = Executor::new(siblings_graph(0, 0), siblings_data());
  let order = exec.execution_order().unwrap();
  assert_eq!(order, vec!["sink_001", "source_001", "a_flag", "b_flag"]);
}

#[test]
fn test_report_lists_computations_in_evaluation_order() {
  let mut exec = Executor::new(invoice_graph(), invoice_data());
  let report = exec.run(false).unwrap();
  assert_eq!(report.order, vec!["invoice_001", "order_001", "calc_subtotal", "calc_tax"]);
  assert_eq!(report.computation_order(), vec!["calc_subtotal", "calc_tax"]);
  let subtotal = report.outcome("calc_subtotal").unwrap();
  assert_eq!(subtotal.value, Some(json!(500.0)));
  assert_eq!(subtotal.writes[0].node_id, "invoice_001");
  assert_eq!(subtotal.writes[0].property_name, "subtotal");
  assert_eq!(exec.last_report(), Some(&report));
}

#[test]
fn test_cycle_through_inferred_edges_is_rejected() {
  let g = with_computation(
    ComputationGraph::new("cyclic"),
    "calc_x",
    "y + 1",
    0,
    &[("node_001", "Thing", "y")],
    &[("node_001", "Thing", "x")],
  );
  let g = with_computation(
    g,
    "calc_y",
    "x + 1",
    0,
    &[("node_001", "Thing", "x")],
    &[("node_001", "Thing", "y")],
  );
  let mut data = NodeDataMap::new();
  data.insert("node_001".to_string(), bag(&[("x", json!(1)), ("y", json!(1))]));

  let mut exec = Executor::new(g, data.clone());
  assert_eq!(
    exec.execution_order(),
    Err(ExecutorError::Cycle {
      remaining: vec!["calc_x".to_string(), "calc_y".to_string()],
    })
  );
  assert!(!exec.execute(false));
  assert!(exec.last_report().is_none());
  // Nothing is evaluated when the order cannot be built.
  assert_eq!(exec.get_all_data_nodes(), &data);
}

#[test]
fn test_direct_dependency_cycle_is_rejected() {
  let g = with_computation(
    ComputationGraph::new("direct_cycle"),
    "calc_a",
    "b",
    0,
    &[("calc_b", "Computation", "b")],
    &[],
  );
  let g = with_computation(
    g,
    "calc_b",
    "a",
    0,
    &[("calc_a", "Computation", "a")],
    &[],
  );
  let mut exec = Executor::new(g, NodeDataMap::new());
  let err = exec.run(false).unwrap_err();
  assert!(err.to_string().contains("calc_a, calc_b"));
}

#[test]
fn test_missing_input_binds_none() {
  let g = with_computation(
    ComputationGraph::new("defaulting"),
    "calc_flag",
    "approved or False",
    0,
    &[("doc_001", "Document", "approved")],
    &[("doc_001", "Document", "flag")],
  );
  let mut data = NodeDataMap::new();
  data.insert("doc_001".to_string(), PropertyBag::new());
  let mut exec = Executor::new(g, data);
  assert!(exec.execute(false));
  assert_eq!(
    exec.get_node_data("doc_001").unwrap().get("flag"),
    Some(&json!(false))
  );
}

#[test]
fn test_referenced_data_node_without_initial_data_gets_empty_bag() {
  let mut data = invoice_data();
  data.remove("invoice_001");
  let mut exec = Executor::new(invoice_graph(), data);
  assert!(exec.get_node_data("invoice_001").unwrap().is_empty());
  let report = exec.run(false).unwrap();
  // tax_rate is missing, so the tax formula multiplies by None.
  assert_eq!(prop(&exec, "invoice_001", "subtotal"), Some(500.0));
  assert_eq!(
    report.outcome("calc_tax").unwrap().status,
    OutcomeStatus::Failed
  );
}

#[test]
fn test_isolate_policy_keeps_outputs_and_continues() {
  let mut exec = Executor::new(failing_invoice_graph(), failing_invoice_data());
  assert!(exec.execute(false));
  let report = exec.last_report().unwrap().clone();
  assert!(!report.success());
  let failure = report.outcome("calc_subtotal").unwrap();
  assert_eq!(failure.status, OutcomeStatus::Failed);
  assert_eq!(failure.failure_reason.as_deref(), Some("division by zero"));
  // Subtotal keeps its previous value and the downstream node still runs on it.
  assert_eq!(prop(&exec, "invoice_001", "subtotal"), Some(10.0));
  assert_eq!(prop(&exec, "invoice_001", "tax"), Some(1.0));
}

#[test]
fn test_poison_policy_nulls_outputs_and_skips_dependents() {
  let config = ExecutorConfig::default().with_failure_policy(FailurePolicy::Poison);
  let mut exec = Executor::with_config(failing_invoice_graph(), failing_invoice_data(), config);
  assert!(!exec.execute(false));
  let report = exec.last_report().unwrap();
  assert_eq!(report.count(OutcomeStatus::Failed), 1);
  let skipped = report.outcome("calc_tax").unwrap();
  assert_eq!(skipped.status, OutcomeStatus::Skipped);
  assert_eq!(
    skipped.describe_failure().as_deref(),
    Some("calc_tax: upstream computation 'calc_subtotal' failed")
  );
  let invoice = exec.get_node_data("invoice_001").unwrap();
  assert_eq!(invoice.get("subtotal"), Some(&json!(null)));
  assert_eq!(invoice.get("tax"), Some(&json!(null)));
}

#[test]
fn test_unparsable_formula_fails_only_its_node() {
  let g = with_computation(
    invoice_graph(),
    "calc_broken",
    "price *",
    0,
    &[("order_001", "Order", "price")],
    &[("order_001", "Order", "broken")],
  );
  let mut exec = Executor::new(g, invoice_data());
  let report = exec.run(false).unwrap();
  let broken = report.outcome("calc_broken").unwrap();
  assert_eq!(broken.status, OutcomeStatus::Failed);
  assert!(broken.failure_reason.as_ref().unwrap().contains("expected expression"));
  assert_eq!(prop(&exec, "invoice_001", "tax"), Some(50.0));
}

#[test]
fn test_overlong_formula_fails_only_its_node() {
  let g = with_computation(
    invoice_graph(),
    "calc_runaway",
    &vec!["price"; 20_000].join(" + "),
    0,
    &[("order_001", "Order", "price")],
    &[("order_001", "Order", "runaway")],
  );
  let mut exec = Executor::new(g, invoice_data());
  let report = exec.run(false).unwrap();
  let runaway = report.outcome("calc_runaway").unwrap();
  assert_eq!(runaway.status, OutcomeStatus::Failed);
  assert!(runaway.failure_reason.as_ref().unwrap().contains("nested too deeply"));
  assert_eq!(prop(&exec, "invoice_001", "tax"), Some(50.0));
  assert!(exec.get_node_data("order_001").unwrap().get("runaway").is_none());
}

#[test]
fn test_shared_input_name_binds_from_last_relationship_id() {
  let node = ComputationNode::new(
    "calc_pick",
    "pick_level",
    vec![InputSpec::property("Tank", "level")],
    vec![OutputSpec::property("Gauge", "reading")],
    "level",
  );
  // Inserted out of id order: "z_primary" first, "a_backup" second.
  let g = ComputationGraph::new("shadowed")
    .add_computation_node(node)
    .add_computation_relationship(ComputationRelationship::depends_on(
      "z_primary",
      "tank_primary",
      "calc_pick",
      OutputSpec::property("Tank", "level"),
    ))
    .add_computation_relationship(ComputationRelationship::depends_on(
      "a_backup",
      "tank_backup",
      "calc_pick",
      OutputSpec::property("Tank", "level"),
    ))
    .add_computation_relationship(ComputationRelationship::output_to(
      "reading_out",
      "calc_pick",
      "gauge_001",
      OutputSpec::property("Gauge", "reading"),
    ));
  let mut data = NodeDataMap::new();
  data.insert("tank_primary".to_string(), bag(&[("level", json!(1.0))]));
  data.insert("tank_backup".to_string(), bag(&[("level", json!(2.0))]));
  let mut exec = Executor::new(g, data);
  assert!(exec.execute(false));
  assert_eq!(prop(&exec, "gauge_001", "reading"), Some(1.0));
}

#[test]
fn test_date_outputs_are_iso_strings() {
  let g = with_computation(
    ComputationGraph::new("dates"),
    "calc_due",
    "date_from_iso(issued) + days(net_days)",
    0,
    &[
      ("invoice_001", "Invoice", "issued"),
      ("invoice_001", "Invoice", "net_days"),
    ],
    &[("invoice_001", "Invoice", "due")],
  );
  let mut data = NodeDataMap::new();
  data.insert(
    "invoice_001".to_string(),
    bag(&[("issued", json!("2025-12-20T09:30:00+01:00")), ("net_days", json!(14))]),
  );
  let mut exec = Executor::new(g, data);
  assert!(exec.execute(false));
  assert_eq!(
    exec.get_node_data("invoice_001").unwrap().get("due"),
    Some(&json!("2026-01-03T09:30:00+01:00"))
  );
}

#[test]
fn test_update_node_property_only_touches_known_data_nodes() {
  let mut exec = Executor::new(invoice_graph(), invoice_data());
  assert!(exec.update_node_property("order_001", "price", json!(200.0)));
  assert!(!exec.update_node_property("nowhere", "price", json!(1)));
  assert!(!exec.update_node_property("calc_tax", "price", json!(1)));
  assert!(exec.get_node_data("nowhere").is_none());
  assert!(exec.execute(false));
  assert_eq!(prop(&exec, "invoice_001", "subtotal"), Some(1000.0));
}

#[test]
fn test_snapshot_restore_undoes_execution() {
  let mut exec = Executor::new(invoice_graph(), invoice_data());
  let before = exec.snapshot_data_nodes();
  exec.update_node_property("order_001", "quantity", json!(9));
  exec.execute(false);
  assert_ne!(exec.get_all_data_nodes(), &before);
  exec.restore_data_nodes(&before);
  assert_eq!(exec.get_all_data_nodes(), &before);
}

#[test]
fn test_repeated_runs_are_identical() {
  let mut exec = Executor::new(supply_chain_graph(), supply_chain_data());
  let first = exec.run(false).unwrap();
  let state = exec.snapshot_data_nodes();
  let second = exec.run(false).unwrap();
  assert_eq!(first.order, second.order);
  assert_eq!(first.outcomes, second.outcomes);
  assert_eq!(exec.get_all_data_nodes(), &state);
}

proptest! {
  #[test]
  fn prop_priority_decides_between_siblings(p1 in -5i64..5, p2 in -5i64..5) {
    let exec = Executor::new(siblings_graph(p1, p2), siblings_data());
    let order = exec.execution_order().unwrap();
    let (a, b) = (position(&order, "a_flag"), position(&order, "b_flag"));
    if p1 <= p2 {
      prop_assert!(a < b);
    } else {
      prop_assert!(b < a);
    }
    prop_assert_eq!(order, exec.execution_order().unwrap());
  }

  #[test]
  fn prop_dependencies_precede_dependents(
    prices in proptest::collection::vec(0.0f64..1000.0, 1..5),
    priorities in proptest::collection::vec(-3i64..3, 2),
  ) {
    let g = with_computation(
      invoice_graph(),
      "calc_total",
      "subtotal + tax",
      priorities[0],
      &[("invoice_001", "Invoice", "subtotal"), ("invoice_001", "Invoice", "tax")],
      &[("invoice_001", "Invoice", "total")],
    );
    let g = with_computation(
      g,
      "calc_label",
      "'big' if total > 1000 else 'small'",
      priorities[1],
      &[("invoice_001", "Invoice", "total")],
      &[("order_001", "Order", "label")],
    );
    let mut exec = Executor::new(g, invoice_data());
    let order = exec.execution_order().unwrap();
    prop_assert!(position(&order, "calc_subtotal") < position(&order, "calc_tax"));
    prop_assert!(position(&order, "calc_tax") < position(&order, "calc_total"));
    prop_assert!(position(&order, "calc_total") < position(&order, "calc_label"));
    for price in prices {
      exec.update_node_property("order_001", "price", json!(price));
      let report = exec.run(false).unwrap();
      prop_assert!(report.success());
    }
  }

  #[test]
  fn prop_snapshot_restore_round_trips(
    updates in proptest::collection::vec((0usize..3, -100.0f64..100.0), 0..8),
    run in any::<bool>(),
  ) {
    let nodes = ["order_001", "invoice_001", "order_001"];
    let props = ["price", "tax_rate", "quantity"];
    let mut exec = Executor::new(invoice_graph(), invoice_data());
    for (i, value) in updates {
      exec.update_node_property(nodes[i], props[i], json!(value));
    }
    if run {
      exec.execute(false);
    }
    let before = exec.get_all_data_nodes().clone();
    let snapshot = exec.snapshot_data_nodes();
    exec.restore_data_nodes(&snapshot);
    prop_assert_eq!(exec.get_all_data_nodes(), &before);
  }
}
