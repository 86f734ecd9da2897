//! Graph definition and node data files (JSON).

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::types::{ComputationGraph, GraphDefinition, NodeDataMap};

#[derive(Debug, Error)]
pub enum GraphIoError {
  #[error("cannot access {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("invalid JSON in {}: {source}", path.display())]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, GraphIoError> {
  let bytes = std::fs::read(path).map_err(|source| GraphIoError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_slice(&bytes).map_err(|source| GraphIoError::Json {
    path: path.to_path_buf(),
    source,
  })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GraphIoError> {
  let io = |source| GraphIoError::Io {
    path: path.to_path_buf(),
    source,
  };
  let json = serde_json::to_string_pretty(value).map_err(|source| GraphIoError::Json {
    path: path.to_path_buf(),
    source,
  })?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).map_err(io)?;
  }
  std::fs::write(path, json).map_err(io)
}

/// Loads a [`GraphDefinition`] from `path`.
#[instrument(level = "trace", skip(path))]
pub fn load_graph_definition(path: &Path) -> Result<GraphDefinition, GraphIoError> {
  read_json(path)
}

/// Loads a graph definition and builds the graph.
pub fn load_graph(path: &Path) -> Result<ComputationGraph, GraphIoError> {
  Ok(load_graph_definition(path)?.to_graph())
}

#[instrument(level = "trace", skip(path, graph))]
pub fn save_graph_definition(path: &Path, graph: &GraphDefinition) -> Result<(), GraphIoError> {
  write_json(path, graph)
}

/// Loads initial data node values: `{ "node_id": { "property": value, ... }, ... }`.
#[instrument(level = "trace", skip(path))]
pub fn load_node_data(path: &Path) -> Result<NodeDataMap, GraphIoError> {
  read_json(path)
}

#[instrument(level = "trace", skip(path, data))]
pub fn save_node_data(path: &Path, data: &NodeDataMap) -> Result<(), GraphIoError> {
  write_json(path, data)
}
