//! Cluster statistics and metrics

use crate::cluster::Clustering;
use crate::graph::algorithms::neighbor_weights;
use crate::graph::{Graph, Node};
use serde::Serialize;
use std::collections::BTreeSet;

/// Calculate density (actual edges / potential edges)
pub fn density<N: Node>(graph: &Graph<N>, members: &BTreeSet<N>) -> f64 {
    let n = members.len();
    if n <= 1 {
        return 1.0; // By convention, singleton clusters have density 1
    }

    let potential = n * (n - 1) / 2;
    let actual = internal_edges(graph, members).count();

    actual as f64 / potential as f64
}

/// Sum of the weights of edges inside a cluster divided by the number of
/// vertex pairs
pub fn weighted_density<N: Node>(graph: &Graph<N>, members: &BTreeSet<N>) -> f64 {
    let n = members.len();
    if n <= 1 {
        return 0.0;
    }

    let potential = (n * (n - 1) / 2) as f64;
    internal_edges(graph, members).map(|(_, _, w)| w).sum::<f64>() / potential
}

fn internal_edges<'a, N: Node>(
    graph: &'a Graph<N>,
    members: &'a BTreeSet<N>,
) -> impl Iterator<Item = (N, N, f64)> + 'a {
    members.iter().flat_map(move |&src| {
        graph
            .edges(src)
            .filter(move |&(_, dst, _)| src < dst && members.contains(&dst))
            .map(|(a, b, &w)| (a, b, w))
    })
}

/// Members with the highest weighted degree inside the cluster, best first
pub fn central_nodes<N: Node>(graph: &Graph<N>, members: &BTreeSet<N>, top_n: usize) -> Vec<N> {
    let mut degrees: Vec<(N, f64)> = members
        .iter()
        .map(|&node| {
            let degree = neighbor_weights(graph, node)
                .into_iter()
                .filter(|(neighbor, _)| members.contains(neighbor))
                .map(|(_, weight)| weight)
                .sum();
            (node, degree)
        })
        .collect();

    degrees.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    degrees.into_iter().take(top_n).map(|(node, _)| node).collect()
}

/// Aggregate statistics of a clustering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub cluster_count: usize,
    pub covered_nodes: usize,
    pub largest: usize,
    pub smallest: usize,
    pub average_size: f64,
    pub average_density: f64,
    pub average_weighted_density: f64,
}

/// Summarize `clustering` over `graph`
pub fn summarize<N: Node>(graph: &Graph<N>, clustering: &Clustering<N>) -> ClusteringSummary {
    let sizes: Vec<usize> = clustering.iter().map(BTreeSet::len).collect();
    let count = sizes.len();

    let (average_size, average_density, average_weighted_density) = if count == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let total_density: f64 = clustering.iter().map(|c| density(graph, c)).sum();
        let total_weighted: f64 = clustering.iter().map(|c| weighted_density(graph, c)).sum();
        (
            sizes.iter().sum::<usize>() as f64 / count as f64,
            total_density / count as f64,
            total_weighted / count as f64,
        )
    };

    ClusteringSummary {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        cluster_count: count,
        covered_nodes: clustering.covered_nodes().len(),
        largest: sizes.iter().copied().max().unwrap_or(0),
        smallest: sizes.iter().copied().min().unwrap_or(0),
        average_size,
        average_density,
        average_weighted_density,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> Graph<u32> {
        let mut graph = Graph::new();
        graph.add_edge(0, 1, 2.0);
        graph.add_edge(1, 2, 1.0);
        graph.add_edge(0, 2, 3.0);
        graph.add_edge(2, 3, 1.0);
        graph
    }

    #[test]
    fn densities() {
        let graph = graph();
        let triangle = BTreeSet::from([0, 1, 2]);
        assert_eq!(density(&graph, &triangle), 1.0);
        assert_eq!(weighted_density(&graph, &triangle), 2.0);

        let path = BTreeSet::from([1, 2, 3]);
        assert!((density(&graph, &path) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(density(&graph, &BTreeSet::from([3])), 1.0);
    }

    #[test]
    fn central_nodes_by_internal_degree() {
        let graph = graph();
        let members = BTreeSet::from([0, 1, 2, 3]);
        assert_eq!(central_nodes(&graph, &members, 2), vec![0, 2]);
    }

    #[test]
    fn summary() {
        let graph = graph();
        let clustering = Clustering::new(vec![BTreeSet::from([0, 1, 2]), BTreeSet::from([3])]);
        let summary = summarize(&graph, &clustering);

        assert_eq!(summary.cluster_count, 2);
        assert_eq!(summary.covered_nodes, 4);
        assert_eq!(summary.largest, 3);
        assert_eq!(summary.smallest, 1);
        assert_eq!(summary.average_size, 2.0);
        assert_eq!(summary.average_density, 1.0);
        // (6 / 3 + 0) / 2
        assert_eq!(summary.average_weighted_density, 1.0);
    }

    #[test]
    fn empty_summary() {
        let summary = summarize(&graph(), &Clustering::default());
        assert_eq!(summary.cluster_count, 0);
        assert_eq!(summary.average_weighted_density, 0.0);
    }
}
