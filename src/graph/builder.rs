//! Graph construction module

use crate::error::{require_positive_weight, Result};
use crate::graph::Graph;
use std::collections::HashMap;

/// Builder for incrementally constructing a graph over string labels.
///
/// Labels are interned into dense `u32` ids so the resulting graph has a
/// cheap `Copy` vertex type.
pub struct GraphBuilder {
    /// Mapping from string labels to node ids
    id_to_index: HashMap<String, u32>,

    /// Node labels, indexed by id
    labels: Vec<String>,

    /// The graph under construction
    graph: Graph<u32>,

    /// Number of duplicate edges ignored so far
    duplicates: usize,
}

impl GraphBuilder {
    /// Create a new graph builder with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_index: HashMap::with_capacity(capacity),
            labels: Vec::with_capacity(capacity),
            graph: Graph::with_capacity(capacity, capacity),
            duplicates: 0,
        }
    }

    /// Get or create a node id for the given label
    pub fn get_or_create_node(&mut self, label: &str) -> u32 {
        if let Some(&idx) = self.id_to_index.get(label) {
            return idx;
        }

        let idx = self.labels.len() as u32;
        self.id_to_index.insert(label.to_string(), idx);
        self.labels.push(label.to_string());
        self.graph.add_node(idx);

        idx
    }

    /// Add a weighted undirected edge.
    ///
    /// Self loops are skipped. The first weight seen for a vertex pair wins;
    /// later duplicates are counted and ignored.
    pub fn add_edge(&mut self, src: &str, dst: &str, weight: f64) -> Result<()> {
        let weight = require_positive_weight(weight)?;
        let src_idx = self.get_or_create_node(src);
        let dst_idx = self.get_or_create_node(dst);

        if src_idx == dst_idx {
            return Ok(());
        }

        if self.graph.contains_edge(src_idx, dst_idx) {
            self.duplicates += 1;
        } else {
            self.graph.add_edge(src_idx, dst_idx, weight);
        }

        Ok(())
    }

    /// Build the labeled graph
    pub fn build(self) -> LabeledGraph {
        if self.duplicates > 0 {
            log::warn!("Ignored {} duplicate edges", self.duplicates);
        }

        LabeledGraph {
            graph: self.graph,
            labels: self.labels,
            id_to_index: self.id_to_index,
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

/// A graph over interned ids together with the label table.
#[derive(Debug, Clone)]
pub struct LabeledGraph {
    /// Graph over node ids
    pub graph: Graph<u32>,

    labels: Vec<String>,
    id_to_index: HashMap<String, u32>,
}

impl LabeledGraph {
    /// Label of a node id
    pub fn label(&self, id: u32) -> &str {
        &self.labels[id as usize]
    }

    /// Node id of a label, if present
    pub fn id(&self, label: &str) -> Option<u32> {
        self.id_to_index.get(label).copied()
    }
}
