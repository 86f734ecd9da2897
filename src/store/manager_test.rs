//! Tests for `GraphStore`.

use std::collections::BTreeMap;

use serde_json::json;

use crate::executor::Executor;
use crate::fixtures::{bag, invoice_graph};
use crate::store::{
  COMPUTATION_NODE_LABEL, DATA_NODE_LABEL, DataProvider, GraphStore, InMemoryDataProvider,
  StoreError,
};
use crate::types::PropertyBag;
use crate::what_if::{PropertyOverride, WhatIfSimulator};

fn invoice_specs() -> BTreeMap<String, PropertyBag> {
  let mut specs = BTreeMap::new();
  specs.insert(
    "order_001".to_string(),
    bag(&[
      ("label", json!("Order")),
      ("price", json!(100.0)),
      ("quantity", json!(5)),
    ]),
  );
  specs.insert(
    "invoice_001".to_string(),
    bag(&[("label", json!("Invoice")), ("tax_rate", json!(0.1))]),
  );
  specs
}

async fn seeded_store() -> GraphStore<InMemoryDataProvider> {
  let store = GraphStore::new(InMemoryDataProvider::new());
  store.create_business_nodes(&invoice_specs()).await.unwrap();
  store
}

#[tokio::test]
async fn business_nodes_get_label_and_uuid() {
  let store = GraphStore::new(InMemoryDataProvider::new());
  let ids = store.create_business_nodes(&invoice_specs()).await.unwrap();
  assert_eq!(ids.len(), 2);
  let contents = store.provider().contents().await;
  let order = &contents.nodes[&ids["order_001"]];
  assert_eq!(order.label, "Order");
  assert_eq!(order.properties["uuid"], json!("order_001"));
  assert!(!order.properties.contains_key("label"));
}

#[tokio::test]
async fn business_node_without_label_is_rejected() {
  let store = GraphStore::new(InMemoryDataProvider::new());
  let mut specs = BTreeMap::new();
  specs.insert("thing_001".to_string(), bag(&[("x", json!(1))]));
  let err = store.create_business_nodes(&specs).await.unwrap_err();
  assert!(matches!(err, StoreError::MissingLabel(uuid) if uuid == "thing_001"));
}

#[tokio::test]
async fn load_graph_data_materializes_data_nodes() {
  let store = seeded_store().await;
  let data = store.load_graph_data(&invoice_graph()).await.unwrap();
  assert_eq!(data["order_001"]["price"], json!(100.0));
  assert_eq!(data["invoice_001"]["tax_rate"], json!(0.1));

  let contents = store.provider().contents().await;
  assert_eq!(contents.nodes_with_label(DATA_NODE_LABEL).count(), 2);
}

#[tokio::test]
async fn load_graph_data_fails_fast_listing_missing_ids() {
  let store = GraphStore::new(InMemoryDataProvider::new());
  let err = store.load_graph_data(&invoice_graph()).await.unwrap_err();
  match err {
    StoreError::MissingDataNodes { missing } => {
      assert_eq!(missing, vec!["invoice_001", "order_001"]);
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn graph_structure_is_mirrored() {
  let mut store = seeded_store().await;
  let graph = invoice_graph();
  store.load_graph_data(&graph).await.unwrap();
  let ids = store.create_computation_nodes(&graph).await.unwrap();
  assert_eq!(ids.len(), 2);
  let rels = store.create_relationships(&graph).await.unwrap();
  assert_eq!(rels.len(), graph.computation_relationships().len());

  let contents = store.provider().contents().await;
  assert_eq!(contents.nodes_with_label(COMPUTATION_NODE_LABEL).count(), 2);
  let subtotal = &contents.nodes[&ids["calc_subtotal"]];
  assert_eq!(subtotal.properties["code"], json!("price * quantity"));
  assert_eq!(subtotal.properties["graph_id"], json!("invoice"));
  let outputs: Vec<_> = contents
    .relationships
    .values()
    .filter(|r| r.rel_type == "OUTPUT_TO")
    .collect();
  assert_eq!(outputs.len(), 2);
  assert!(outputs.iter().all(|r| r.target_id == "datanode_invoice_001"));
}

#[tokio::test]
async fn relationships_without_stored_computations_are_skipped() {
  let store = seeded_store().await;
  let graph = invoice_graph();
  store.load_graph_data(&graph).await.unwrap();
  assert!(store.create_relationships(&graph).await.unwrap().is_empty());
}

#[test]
fn scenario_outputs_are_written_back() {
  tokio_test::block_on(async {
    let store = seeded_store().await;
    let graph = invoice_graph();
    let data = store.load_graph_data(&graph).await.unwrap();
    let mut exec = Executor::new(graph, data);
    exec.execute(false);
    let result = WhatIfSimulator::new(&mut exec).run_scenario(
      &[PropertyOverride::new("order_001", "price", json!(200.0))],
      "write back",
    );
    store.write_scenario_outputs(&result).await.unwrap();

    let invoice = store
      .provider()
      .get_node_data("datanode_invoice_001")
      .await
      .unwrap()
      .unwrap();
    assert_eq!(invoice["subtotal"], json!(1000.0));
    assert_eq!(invoice["tax"], json!(100.0));
  });
}

#[tokio::test]
async fn missing_output_properties_are_written_as_null() {
  let store = seeded_store().await;
  store.load_graph_data(&invoice_graph()).await.unwrap();
  store
    .write_output_properties(
      "invoice_001",
      &bag(&[("subtotal", json!(500.0))]),
      &["subtotal".to_string(), "tax".to_string()],
    )
    .await
    .unwrap();
  let invoice = store
    .provider()
    .get_node_data("datanode_invoice_001")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(invoice["subtotal"], json!(500.0));
  assert_eq!(invoice["tax"], json!(null));
}
