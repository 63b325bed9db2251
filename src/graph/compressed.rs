//! Index-based snapshot of a weighted graph

use crate::graph::{Graph, Node};
use std::collections::HashMap;

/// Compressed sparse row view of an undirected weighted graph.
///
/// Every undirected edge is stored twice, once per endpoint. Self loops are
/// dropped. Node indices follow the iteration order of the source graph, so
/// two snapshots of the same graph are identical.
#[derive(Debug, Clone)]
pub struct CompressedGraph<N> {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// Offset array: index where each node's edges begin
    /// offsets[i] to offsets[i+1] defines the edge range for node i
    pub offsets: Vec<u32>,

    /// Edge array: concatenated, sorted lists of target nodes
    pub edges: Vec<u32>,

    /// Weight of each entry in `edges`
    pub weights: Vec<f64>,

    /// Mapping from internal indices back to the original vertices
    pub node_ids: Vec<N>,

    index: HashMap<N, u32>,
}

impl<N: Node> CompressedGraph<N> {
    /// Take a snapshot of `graph`.
    pub fn from_graph(graph: &Graph<N>) -> Self {
        let node_ids: Vec<N> = graph.nodes().collect();
        let index: HashMap<N, u32> = node_ids
            .iter()
            .enumerate()
            .map(|(i, &node)| (node, i as u32))
            .collect();

        let mut offsets = Vec::with_capacity(node_ids.len() + 1);
        let mut edges = Vec::with_capacity(graph.edge_count() * 2);
        let mut weights = Vec::with_capacity(graph.edge_count() * 2);
        offsets.push(0);

        let mut adjacency: Vec<(u32, f64)> = Vec::new();
        for (src, &node) in node_ids.iter().enumerate() {
            adjacency.clear();
            for (_, neighbor, &weight) in graph.edges(node) {
                let dst = index[&neighbor];
                if dst as usize != src {
                    adjacency.push((dst, weight));
                }
            }

            // Neighbors in index order
            adjacency.sort_unstable_by_key(|&(dst, _)| dst);
            for &(dst, weight) in &adjacency {
                edges.push(dst);
                weights.push(weight);
            }
            offsets.push(edges.len() as u32);
        }

        Self {
            node_count: node_ids.len(),
            offsets,
            edges,
            weights,
            node_ids,
            index,
        }
    }

    fn range(&self, node: usize) -> std::ops::Range<usize> {
        self.offsets[node] as usize..self.offsets[node + 1] as usize
    }

    /// Get the neighbors of a node
    pub fn outgoing_edges(&self, node: usize) -> &[u32] {
        &self.edges[self.range(node)]
    }

    /// Get the weights aligned with [`Self::outgoing_edges`]
    pub fn edge_weights(&self, node: usize) -> &[f64] {
        &self.weights[self.range(node)]
    }

    /// Iterate over `(neighbor, weight)` pairs of a node
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.outgoing_edges(node)
            .iter()
            .zip(self.edge_weights(node))
            .map(|(&dst, &weight)| (dst as usize, weight))
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.edges.len() / 2
    }

    /// Internal index of a vertex
    pub fn index_of(&self, node: &N) -> Option<usize> {
        self.index.get(node).map(|&i| i as usize)
    }

    /// Original vertex behind an internal index
    pub fn node(&self, index: usize) -> N {
        self.node_ids[index]
    }
}
