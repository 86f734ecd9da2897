//! CLI: run a computation graph, or a what-if scenario on it, from JSON files.
//!
//! Usage: `run_graph --graph <graph.json> (--data <data.json> | --store <store.json>) [--set node.prop=value]...`
//!
//! Without `--set` the graph is executed once and the resulting data nodes are
//! printed. With one or more `--set` overrides a what-if scenario is run and
//! its diff is printed; the data itself is left as loaded.
//!
//! Set RUST_LOG=propgraph=debug to see every formula evaluation.

use clap::{Parser, ValueEnum};
use std::env;
use std::path::PathBuf;
use std::process;

use propgraph::graph_io::{load_graph, load_node_data};
use propgraph::store::{GraphStore, InMemoryDataProvider};
use propgraph::types::NodeDataMap;
use propgraph::{
  Executor, ExecutorConfig, FailurePolicy, PropertyOverride, ScenarioRunResult, WhatIfSimulator,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
  Text,
  Json,
}

/// Run a computation graph or a what-if scenario.
#[derive(Parser, Debug)]
#[command(name = "run_graph")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  PROPGRAPH_FAILURE_POLICY   isolate | poison
  PROPGRAPH_OUTPUT           text | json

Examples:
  run_graph --graph invoice.json --data invoice_data.json
  run_graph --graph invoice.json --data invoice_data.json --set order_001.price=200
  run_graph --graph invoice.json --store store.json --set order_001.price=200 --write-back"#
)]
struct Args {
  /// Graph definition (JSON).
  #[arg(long, value_name = "FILE")]
  graph: PathBuf,

  /// Initial data node values (JSON object of node id -> properties).
  #[arg(long, value_name = "FILE", required_unless_present = "store", conflicts_with = "store")]
  data: Option<PathBuf>,

  /// Saved in-memory store to load data nodes from, by uuid.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  /// With --store: write computed outputs back and save the store.
  #[arg(long, requires = "store")]
  write_back: bool,

  /// Property override `node.property=value`; repeat for several.
  #[arg(long = "set", value_name = "NODE.PROP=VALUE")]
  overrides: Vec<PropertyOverride>,

  /// Scenario title.
  #[arg(long, default_value = "What-if scenario")]
  title: String,

  /// What happens downstream of a failing formula. Overridden by PROPGRAPH_FAILURE_POLICY.
  #[arg(long, value_name = "POLICY", default_value_t = FailurePolicy::Isolate)]
  failure_policy: FailurePolicy,

  /// Output format. Overridden by PROPGRAPH_OUTPUT.
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

fn fail(message: impl std::fmt::Display) -> ! {
  eprintln!("Error: {message}");
  process::exit(1);
}

fn print_data_nodes(title: &str, data: &NodeDataMap) {
  println!("{title}");
  for (id, bag) in data {
    println!("  [{id}]");
    for (key, value) in bag {
      println!("    {key}: {value}");
    }
  }
}

fn print_scenario(result: &ScenarioRunResult) {
  println!("What-if: {}", result.title);
  for (node, props) in &result.overrides {
    for (prop, value) in props {
      println!("  set {node}.{prop} = {value}");
    }
  }
  println!("Changes:");
  for d in &result.diff {
    let show = |v: &Option<serde_json::Value>| v.as_ref().map_or("<absent>".to_string(), |v| v.to_string());
    println!(
      "  {}.{}: {} -> {}",
      d.node_id,
      d.property_name,
      show(&d.baseline_value),
      show(&d.scenario_value)
    );
  }
  println!("Affected nodes: {}", result.affected_node_ids.join(", "));
  for e in &result.errors {
    println!("  error: {e}");
  }
  println!("Success: {}", result.success);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Env vars override flags.
  let failure_policy = match env::var("PROPGRAPH_FAILURE_POLICY") {
    Ok(v) => v.parse::<FailurePolicy>().unwrap_or_else(|e| fail(e)),
    Err(_) => args.failure_policy,
  };
  let output = match env::var("PROPGRAPH_OUTPUT") {
    Ok(v) => OutputFormat::from_str(&v, true).unwrap_or_else(|e| fail(e)),
    Err(_) => args.output,
  };
  info!(graph = %args.graph.display(), %failure_policy, ?output, "run_graph starting");

  let graph = load_graph(&args.graph).unwrap_or_else(|e| fail(e));

  let store = match &args.store {
    Some(path) => Some(GraphStore::new(
      InMemoryDataProvider::load(path).await.unwrap_or_else(|e| fail(e)),
    )),
    None => None,
  };
  let data = match (&store, &args.data) {
    (Some(store), _) => store.load_graph_data(&graph).await.unwrap_or_else(|e| fail(e)),
    (None, Some(path)) => load_node_data(path).unwrap_or_else(|e| fail(e)),
    (None, None) => fail("either --data or --store is required"),
  };

  let config = ExecutorConfig::default().with_failure_policy(failure_policy);
  let mut executor = Executor::with_config(graph, data, config);

  let ok = if args.overrides.is_empty() {
    let report = executor.run(false).unwrap_or_else(|e| fail(e));
    match output {
      OutputFormat::Json => {
        let json = serde_json::json!({
          "report": report,
          "data": executor.get_all_data_nodes(),
        });
        println!("{json:#}");
      }
      OutputFormat::Text => {
        println!("Execution order: {}", report.computation_order().join(" -> "));
        for f in report.failures().filter_map(|f| f.describe_failure()) {
          println!("  failed: {f}");
        }
        print_data_nodes("Data nodes:", executor.get_all_data_nodes());
      }
    }
    if let Some(store) = &store
      && args.write_back
    {
      for (uuid, props) in executor.graph().get_output_properties_by_data_node() {
        if let Some(bag) = executor.get_node_data(&uuid) {
          store
            .write_output_properties(&uuid, bag, &props)
            .await
            .unwrap_or_else(|e| fail(e));
        }
      }
    }
    failure_policy == FailurePolicy::Isolate || report.success()
  } else {
    let result = WhatIfSimulator::new(&mut executor).run_scenario(&args.overrides, &args.title);
    match output {
      OutputFormat::Json => match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(e),
      },
      OutputFormat::Text => print_scenario(&result),
    }
    if let Some(store) = &store
      && args.write_back
    {
      store
        .write_scenario_outputs(&result)
        .await
        .unwrap_or_else(|e| fail(e));
    }
    result.success
  };

  if let (Some(store), Some(path)) = (&store, &args.store)
    && args.write_back
  {
    store.provider().save(path).await.unwrap_or_else(|e| fail(e));
  }

  if !ok {
    process::exit(1);
  }
}
