//! Clustering algorithms over weighted graphs
//!
//! Every algorithm follows the same two-step contract:
//!
//! 1. A validated, immutable builder (for example [`ChineseWhispers`]) is
//!    created from a `*Params` record. Invalid parameters are rejected here,
//!    before any graph is seen.
//! 2. [`ClusteringBuilder::apply`] binds the builder to a graph and returns a
//!    run. [`ClusteringAlgorithm::clustering`] computes the result on the first
//!    call and returns the cached value afterwards.
//!
//! ```rust
//! use watset::cluster::{ChineseWhispers, ClusteringAlgorithm, ClusteringBuilder};
//! use watset::graph::Graph;
//!
//! let mut graph = Graph::new();
//! graph.add_edge("a", "b", 1.0);
//! graph.add_edge("c", "d", 1.0);
//!
//! let cw = ChineseWhispers::default();
//! let mut run = cw.apply(&graph);
//! let clustering = run.clustering().unwrap();
//! assert_eq!(clustering.len(), 2);
//! ```

pub mod algorithm;
pub mod chinese_whispers;
pub mod markov;
pub mod markov_external;
pub mod maxmax;
pub mod metrics;
pub mod spectral;
pub mod trivial;
pub mod weighting;

use crate::error::Result;
use crate::graph::{Graph, Node};
use std::collections::BTreeSet;

pub use algorithm::{Algorithm, AlgorithmRun};
pub use chinese_whispers::{ChineseWhispers, ChineseWhispersParams, ChineseWhispersRun};
pub use markov::{MarkovClustering, MarkovClusteringParams, MarkovClusteringRun};
pub use markov_external::{
    Invocation, MarkovClusteringExternal, MarkovClusteringExternalParams,
    MarkovClusteringExternalRun, ProcessOutput, ProcessRunner, SystemProcessRunner,
};
pub use maxmax::{MaxMax, MaxMaxClustering, MaxMaxRun};
pub use spectral::{SpectralClustering, SpectralClusteringParams, SpectralClusteringRun};
pub use trivial::{Trivial, TrivialRun};
pub use weighting::NodeWeighting;

/// An ordered sequence of vertex sets.
///
/// Clusters produced by the partitioning algorithms are disjoint and cover
/// the graph; MaxMax clusters may overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clustering<N> {
    clusters: Vec<BTreeSet<N>>,
}

impl<N> Default for Clustering<N> {
    fn default() -> Self {
        Self {
            clusters: Vec::new(),
        }
    }
}

impl<N: Node> Clustering<N> {
    /// Wrap a list of clusters, dropping empty ones
    pub fn new(clusters: Vec<BTreeSet<N>>) -> Self {
        Self {
            clusters: clusters.into_iter().filter(|c| !c.is_empty()).collect(),
        }
    }

    /// Number of clusters
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether there are no clusters
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Iterate over clusters in order
    pub fn iter(&self) -> std::slice::Iter<'_, BTreeSet<N>> {
        self.clusters.iter()
    }

    /// Clusters as a slice
    pub fn clusters(&self) -> &[BTreeSet<N>] {
        &self.clusters
    }

    /// Consume into the underlying clusters
    pub fn into_inner(self) -> Vec<BTreeSet<N>> {
        self.clusters
    }

    /// Union of all clusters
    pub fn covered_nodes(&self) -> BTreeSet<N> {
        self.clusters.iter().flatten().copied().collect()
    }

    /// Whether every vertex of `graph` is in exactly one cluster and nothing else is
    pub fn is_partition_of(&self, graph: &Graph<N>) -> bool {
        let total: usize = self.clusters.iter().map(BTreeSet::len).sum();
        let covered = self.covered_nodes();
        total == covered.len()
            && covered.len() == graph.node_count()
            && graph.nodes().all(|node| covered.contains(&node))
    }

    /// Clusters ordered by size, largest first; ties keep their original order
    pub fn sorted_by_size(&self) -> Vec<&BTreeSet<N>> {
        let mut sorted: Vec<&BTreeSet<N>> = self.clusters.iter().collect();
        sorted.sort_by(|a, b| b.len().cmp(&a.len()));
        sorted
    }

    /// Map every member through `f`, merging duplicates within a cluster
    pub fn map<M: Node>(&self, f: impl Fn(N) -> M) -> Clustering<M> {
        Clustering::new(
            self.clusters
                .iter()
                .map(|cluster| cluster.iter().map(|&node| f(node)).collect())
                .collect(),
        )
    }
}

impl<N: Node> FromIterator<BTreeSet<N>> for Clustering<N> {
    fn from_iter<I: IntoIterator<Item = BTreeSet<N>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, N> IntoIterator for &'a Clustering<N> {
    type Item = &'a BTreeSet<N>;
    type IntoIter = std::slice::Iter<'a, BTreeSet<N>>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}

/// A clustering run bound to one graph.
///
/// Runs are stateful and not reentrant: the first call to
/// [`clustering`](Self::clustering) does the work, later calls return the
/// cached result. A failed computation caches nothing.
pub trait ClusteringAlgorithm<N: Node> {
    /// Compute (once) and return the clustering.
    fn clustering(&mut self) -> Result<&Clustering<N>>;
}

/// A validated algorithm configuration that can be applied to graphs.
pub trait ClusteringBuilder<N: Node> {
    /// The run type produced by [`apply`](Self::apply).
    type Algorithm<'g>: ClusteringAlgorithm<N>
    where
        Self: 'g,
        N: 'g;

    /// Bind the algorithm to a graph. No computation happens yet.
    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g>;

    /// Apply to `graph` and return an owned copy of the clustering.
    fn cluster<'g>(&'g self, graph: &'g Graph<N>) -> Result<Clustering<N>> {
        let mut algorithm = self.apply(graph);
        algorithm.clustering().cloned()
    }
}

/// Group node indices by label, in order of first appearance.
pub(crate) fn group_by_label<N: Node>(labels: &[usize], node_ids: &[N]) -> Vec<BTreeSet<N>> {
    let mut slot: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    let mut clusters: Vec<BTreeSet<N>> = Vec::new();

    for (index, &label) in labels.iter().enumerate() {
        let idx = *slot.entry(label).or_insert_with(|| {
            clusters.push(BTreeSet::new());
            clusters.len() - 1
        });
        clusters[idx].insert(node_ids[index]);
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(members: &[&'static str]) -> BTreeSet<&'static str> {
        members.iter().copied().collect()
    }

    #[test]
    fn drops_empty_clusters() {
        let clustering = Clustering::new(vec![set(&["a"]), BTreeSet::new(), set(&["b", "c"])]);
        assert_eq!(clustering.len(), 2);
    }

    #[test]
    fn partition_check() {
        let mut graph = Graph::new();
        graph.add_edge("a", "b", 1.0);
        graph.add_node("c");

        let full = Clustering::new(vec![set(&["a", "b"]), set(&["c"])]);
        assert!(full.is_partition_of(&graph));

        let missing = Clustering::new(vec![set(&["a", "b"])]);
        assert!(!missing.is_partition_of(&graph));

        let overlapping = Clustering::new(vec![set(&["a", "b"]), set(&["b", "c"])]);
        assert!(!overlapping.is_partition_of(&graph));
    }

    #[test]
    fn map_merges_duplicates() {
        let clustering: Clustering<(char, usize)> =
            Clustering::new(vec![[('a', 1), ('a', 2), ('b', 1)].into_iter().collect()]);
        let projected = clustering.map(|(node, _)| node);
        assert_eq!(projected.clusters()[0].len(), 2);
    }

    #[test]
    fn sorted_by_size_is_stable() {
        let clustering = Clustering::new(vec![set(&["a"]), set(&["b", "c"]), set(&["d"])]);
        let sorted = clustering.sorted_by_size();
        assert_eq!(sorted[0], &set(&["b", "c"]));
        assert_eq!(sorted[1], &set(&["a"]));
        assert_eq!(sorted[2], &set(&["d"]));
    }

    #[test]
    fn groups_labels_by_first_appearance() {
        let groups = group_by_label(&[2, 0, 2, 1], &["w", "x", "y", "z"]);
        assert_eq!(groups, vec![set(&["w", "y"]), set(&["x"]), set(&["z"])]);
    }
}
