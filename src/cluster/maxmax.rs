//! MaxMax soft clustering
//!
//! A vertex `v` is maximal for `u` when the edge `u-v` has the largest weight
//! among the edges of `u`. MaxMax turns the graph into a digraph with an arc
//! `v -> u` whenever `v` is maximal for `u`, then starts one cluster at a
//! representative of every strongly connected component that no arc enters
//! from outside. A cluster holds its root and everything reachable from it,
//! so clusters may overlap. Isolated vertices are roots of their own
//! singleton clusters.

use crate::cluster::{Clustering, ClusteringAlgorithm, ClusteringBuilder};
use crate::error::{require_positive_weight, Result};
use crate::graph::{CompressedGraph, Graph, Node};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// MaxMax has no parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaxMax;

/// Everything MaxMax computes, not only the clusters
#[derive(Debug, Clone)]
pub struct MaxMaxClustering<N: Node> {
    /// Clusters, one per root, in root order
    pub clustering: Clustering<N>,
    /// Arcs point from a maximal vertex to the vertex it is maximal for
    pub digraph: DiGraphMap<N, ()>,
    /// Cluster roots
    pub roots: BTreeSet<N>,
    /// Maximal neighbors of each vertex
    pub maximals: BTreeMap<N, BTreeSet<N>>,
}

impl<N: Node> ClusteringBuilder<N> for MaxMax {
    type Algorithm<'g> = MaxMaxRun<'g, N>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        MaxMaxRun {
            graph,
            result: None,
        }
    }
}

/// MaxMax bound to a graph
pub struct MaxMaxRun<'g, N: Node> {
    graph: &'g Graph<N>,
    result: Option<MaxMaxClustering<N>>,
}

impl<'g, N: Node> MaxMaxRun<'g, N> {
    /// Compute (once) and return the clusters with the digraph, roots and maximals
    pub fn result(&mut self) -> Result<&MaxMaxClustering<N>> {
        let result = match self.result.take() {
            Some(result) => result,
            None => compute(self.graph)?,
        };
        Ok(self.result.insert(result))
    }
}

impl<'g, N: Node> ClusteringAlgorithm<N> for MaxMaxRun<'g, N> {
    fn clustering(&mut self) -> Result<&Clustering<N>> {
        Ok(&self.result()?.clustering)
    }
}

fn compute<N: Node>(graph: &Graph<N>) -> Result<MaxMaxClustering<N>> {
    let compressed = CompressedGraph::from_graph(graph);

    let mut maximals: BTreeMap<N, BTreeSet<N>> = BTreeMap::new();
    let mut digraph: DiGraphMap<N, ()> = DiGraphMap::with_capacity(compressed.node_count, 0);

    for index in 0..compressed.node_count {
        let node = compressed.node(index);
        digraph.add_node(node);

        let mut best = f64::NEG_INFINITY;
        for (_, weight) in compressed.neighbors(index) {
            best = best.max(require_positive_weight(weight)?);
        }

        let selected: BTreeSet<N> = compressed
            .neighbors(index)
            .filter(|&(_, weight)| weight == best)
            .map(|(neighbor, _)| compressed.node(neighbor))
            .collect();
        maximals.insert(node, selected);
    }

    for (&node, selected) in &maximals {
        for &maximal in selected {
            digraph.add_edge(maximal, node, ());
        }
    }

    // Source components: no arc enters them from outside
    let components = tarjan_scc(&digraph);
    let membership: HashMap<N, usize> = components
        .iter()
        .enumerate()
        .flat_map(|(id, members)| members.iter().map(move |&node| (node, id)))
        .collect();

    let mut roots: Vec<usize> = components
        .iter()
        .enumerate()
        .filter(|&(id, members)| {
            members.iter().all(|&node| {
                digraph
                    .neighbors_directed(node, Direction::Incoming)
                    .all(|source| membership[&source] == id)
            })
        })
        .filter_map(|(_, members)| {
            members
                .iter()
                .filter_map(|node| compressed.index_of(node))
                .min()
        })
        .collect();
    roots.sort_unstable();

    let mut clusters = Vec::with_capacity(roots.len());
    for &root in &roots {
        let mut cluster = BTreeSet::new();
        let mut dfs = Dfs::new(&digraph, compressed.node(root));
        while let Some(node) = dfs.next(&digraph) {
            cluster.insert(node);
        }
        clusters.push(cluster);
    }

    log::info!(
        "MaxMax found {} clusters over {} arcs",
        clusters.len(),
        digraph.edge_count()
    );

    Ok(MaxMaxClustering {
        clustering: Clustering::new(clusters),
        digraph,
        roots: roots.into_iter().map(|root| compressed.node(root)).collect(),
        maximals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn set(members: &[&'static str]) -> BTreeSet<&'static str> {
        members.iter().copied().collect()
    }

    fn weighted(edges: &[(&'static str, &'static str, f64)]) -> Graph<&'static str> {
        let mut graph = Graph::new();
        for &(a, b, w) in edges {
            graph.add_edge(a, b, w);
        }
        graph
    }

    #[test]
    fn overlapping_clusters() {
        let graph = weighted(&[
            ("r", "s", 3.0),
            ("r", "v", 1.0),
            ("r", "t", 2.0),
            ("r", "x", 2.0),
            ("r", "w", 2.0),
            ("r", "u", 1.0),
            ("x", "t", 1.0),
            ("x", "w", 4.0),
            ("w", "t", 2.0),
            ("w", "v", 1.0),
            ("w", "s", 2.0),
            ("v", "s", 2.0),
            ("v", "t", 1.0),
            ("s", "t", 1.0),
            ("s", "u", 2.0),
            ("u", "v", 1.0),
        ]);

        let maxmax = MaxMax;
        let mut run = maxmax.apply(&graph);
        let result = run.result().unwrap();

        assert_eq!(result.roots.len(), 2);
        assert_eq!(result.clustering.len(), 2);
        assert!(result.clustering.iter().any(|c| *c == set(&["r", "s", "t", "u", "v"])));
        assert!(result.clustering.iter().any(|c| *c == set(&["w", "t", "x"])));
        assert_eq!(result.maximals["x"], set(&["w"]));
        assert!(result.digraph.contains_edge("w", "x"));
    }

    #[test]
    fn shared_vertex() {
        let graph = weighted(&[
            ("a", "b", 3.0),
            ("b", "c", 1.0),
            ("c", "a", 1.0),
            ("a", "d", 2.0),
            ("c", "d", 1.0),
            ("b", "e", 2.0),
            ("c", "e", 1.0),
            ("d", "e", 3.0),
        ]);

        let clustering = MaxMax.cluster(&graph).unwrap();
        assert_eq!(clustering.len(), 2);
        assert!(clustering.iter().any(|c| *c == set(&["a", "b", "c"])));
        assert!(clustering.iter().any(|c| *c == set(&["c", "d", "e"])));
    }

    #[test]
    fn star_is_one_cluster() {
        let graph = weighted(&[("c", "a", 1.0), ("c", "b", 1.0), ("c", "d", 1.0)]);
        let clustering = MaxMax.cluster(&graph).unwrap();
        assert_eq!(clustering.len(), 1);
        assert_eq!(clustering.clusters()[0], set(&["a", "b", "c", "d"]));
    }

    #[test]
    fn isolated_vertices_are_singleton_roots() {
        let mut graph = weighted(&[("a", "b", 1.0)]);
        graph.add_node("z");

        let maxmax = MaxMax;
        let mut run = maxmax.apply(&graph);
        let result = run.result().unwrap();
        assert!(result.roots.contains("z"));
        assert!(result.clustering.iter().any(|c| *c == set(&["z"])));
        assert!(result.maximals["z"].is_empty());
    }

    #[test]
    fn rejects_invalid_weights() {
        let graph = weighted(&[("a", "b", -1.0)]);
        assert!(matches!(
            MaxMax.cluster(&graph),
            Err(Error::InvalidWeight { .. })
        ));
    }
}
