//! Spectral clustering
//!
//! Vertices are embedded with the eigenvectors belonging to the `k` smallest
//! eigenvalues of the symmetric normalized Laplacian
//! `L = I - D^-1/2 A D^-1/2`. Each embedding row is scaled to unit length and
//! the rows are grouped with k-means, initialized with k-means++ from a
//! seeded generator. Asking for more clusters than there are vertices is
//! the same as asking for one cluster per vertex.

use crate::cluster::{group_by_label, Clustering, ClusteringAlgorithm, ClusteringBuilder};
use crate::error::{Error, Result};
use crate::graph::algorithms::weighted_degree;
use crate::graph::{CompressedGraph, Graph, Node};
use nalgebra::{DMatrix, SymmetricEigen};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default k-means iteration limit
pub const ITERATIONS: usize = 100;

/// k-means stops once no centroid moves further than this
const TOLERANCE: f64 = 1e-6;

/// Spectral clustering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralClusteringParams {
    /// Number of clusters (default 2)
    pub k: usize,

    /// k-means iteration limit (default 100)
    pub max_iterations: usize,

    /// Seed of the k-means++ initialization
    pub seed: u64,
}

impl Default for SpectralClusteringParams {
    fn default() -> Self {
        Self {
            k: 2,
            max_iterations: ITERATIONS,
            seed: crate::cluster::chinese_whispers::SEED,
        }
    }
}

/// Validated spectral clustering configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectralClustering {
    params: SpectralClusteringParams,
}

impl SpectralClustering {
    /// Validate the parameters: `k` and the iteration limit must be at least 1.
    pub fn new(params: SpectralClusteringParams) -> Result<Self> {
        if params.k == 0 {
            return Err(Error::invalid_configuration("k", "must be at least 1"));
        }
        if params.max_iterations == 0 {
            return Err(Error::invalid_configuration(
                "max_iterations",
                "must be at least 1",
            ));
        }
        Ok(Self { params })
    }

    /// Parameters this configuration was built from
    pub fn params(&self) -> &SpectralClusteringParams {
        &self.params
    }
}

impl<N: Node> ClusteringBuilder<N> for SpectralClustering {
    type Algorithm<'g> = SpectralClusteringRun<'g, N>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        SpectralClusteringRun {
            params: &self.params,
            graph,
            clustering: None,
        }
    }
}

/// Spectral clustering bound to a graph
pub struct SpectralClusteringRun<'g, N: Node> {
    params: &'g SpectralClusteringParams,
    graph: &'g Graph<N>,
    clustering: Option<Clustering<N>>,
}

impl<'g, N: Node> SpectralClusteringRun<'g, N> {
    fn compute(&self) -> Result<Clustering<N>> {
        let compressed = CompressedGraph::from_graph(self.graph);
        if compressed.node_count == 0 {
            return Ok(Clustering::default());
        }

        let k = self.params.k.min(compressed.node_count);
        log::debug!(
            "Spectral clustering on {} nodes and {} edges (k={})",
            compressed.node_count,
            compressed.edge_count(),
            k
        );

        let points = embed(self.graph, &compressed, k);
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let labels = k_means(&points, k, self.params.max_iterations, &mut rng);

        let clusters = group_by_label(&labels, &compressed.node_ids);
        log::info!("Spectral clustering found {} clusters", clusters.len());
        Ok(Clustering::new(clusters))
    }
}

impl<'g, N: Node> ClusteringAlgorithm<N> for SpectralClusteringRun<'g, N> {
    fn clustering(&mut self) -> Result<&Clustering<N>> {
        let clustering = match self.clustering.take() {
            Some(clustering) => clustering,
            None => self.compute()?,
        };
        Ok(self.clustering.insert(clustering))
    }
}

/// Unit-length rows of the `k` leading Laplacian eigenvectors, one per vertex
fn embed<N: Node>(graph: &Graph<N>, compressed: &CompressedGraph<N>, k: usize) -> Vec<Vec<f64>> {
    let n = compressed.node_count;

    // isolated vertices contribute nothing off the diagonal
    let inv_sqrt: Vec<f64> = compressed
        .node_ids
        .iter()
        .map(|&node| {
            let degree = weighted_degree(graph, node);
            if degree > 0.0 {
                degree.sqrt().recip()
            } else {
                0.0
            }
        })
        .collect();

    let mut laplacian = DMatrix::<f64>::identity(n, n);
    for i in 0..n {
        for (j, weight) in compressed.neighbors(i) {
            laplacian[(i, j)] = -weight * inv_sqrt[i] * inv_sqrt[j];
        }
    }

    let eigen = SymmetricEigen::new(laplacian);

    // eigenvalues come back unordered
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[a]
            .total_cmp(&eigen.eigenvalues[b])
            .then(a.cmp(&b))
    });
    order.truncate(k);

    (0..n)
        .map(|row| {
            let mut point: Vec<f64> = order
                .iter()
                .map(|&column| eigen.eigenvectors[(row, column)])
                .collect();
            let norm = point.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm > f64::EPSILON {
                point.iter_mut().for_each(|x| *x /= norm);
            }
            point
        })
        .collect()
}

/// Lloyd's k-means over `points`; returns the centroid index of every point
fn k_means(points: &[Vec<f64>], k: usize, max_iterations: usize, rng: &mut StdRng) -> Vec<usize> {
    let dimension = points.first().map_or(0, Vec::len);
    let mut centroids = initial_centroids(points, k, rng);
    let mut labels = vec![0; points.len()];

    for iteration in 1..=max_iterations {
        for (label, point) in labels.iter_mut().zip(points) {
            *label = nearest(point, &centroids);
        }

        let mut sums = vec![vec![0.0; dimension]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (&label, point) in labels.iter().zip(points) {
            counts[label] += 1;
            for (sum, x) in sums[label].iter_mut().zip(point) {
                *sum += x;
            }
        }

        let mut shift = 0.0_f64;
        for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
            // an empty cluster keeps its centroid
            if count == 0 {
                continue;
            }
            let updated: Vec<f64> = sum.into_iter().map(|x| x / count as f64).collect();
            shift = shift.max(squared_distance(centroid, &updated).sqrt());
            *centroid = updated;
        }

        if shift <= TOLERANCE {
            log::debug!("k-means converged after {} iterations", iteration);
            break;
        }
    }

    labels
}

/// k-means++: each next centroid is drawn with probability proportional to
/// its squared distance from the closest centroid chosen so far
fn initial_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    let mut distances: Vec<f64> = points
        .iter()
        .map(|point| squared_distance(point, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        let next = if total > 0.0 {
            let threshold = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            distances
                .iter()
                .position(|&distance| {
                    cumulative += distance;
                    cumulative > threshold
                })
                .unwrap_or(points.len() - 1)
        } else {
            rng.gen_range(0..points.len())
        };

        let chosen = points[next].clone();
        for (distance, point) in distances.iter_mut().zip(points) {
            *distance = distance.min(squared_distance(point, &chosen));
        }
        centroids.push(chosen);
    }

    centroids
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn spectral(k: usize) -> SpectralClustering {
        SpectralClustering::new(SpectralClusteringParams {
            k,
            ..Default::default()
        })
        .unwrap()
    }

    fn triangles() -> Graph<u32> {
        let mut graph = Graph::new();
        for (a, b) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            graph.add_edge(a, b, 1.0);
        }
        graph
    }

    fn as_sets(clustering: &Clustering<u32>) -> BTreeSet<BTreeSet<u32>> {
        clustering.iter().cloned().collect()
    }

    #[test]
    fn validation() {
        for params in [
            SpectralClusteringParams {
                k: 0,
                ..Default::default()
            },
            SpectralClusteringParams {
                max_iterations: 0,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                SpectralClustering::new(params),
                Err(Error::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn empty_graph() {
        let graph: Graph<u32> = Graph::new();
        assert!(spectral(2).cluster(&graph).unwrap().is_empty());
    }

    #[test]
    fn separates_disconnected_triangles() {
        let graph = triangles();
        let clustering = spectral(2).cluster(&graph).unwrap();
        assert_eq!(
            as_sets(&clustering),
            BTreeSet::from([BTreeSet::from([0, 1, 2]), BTreeSet::from([3, 4, 5])])
        );
    }

    #[test]
    fn one_cluster_takes_everything() {
        let mut graph = triangles();
        graph.add_node(6);

        let clustering = spectral(1).cluster(&graph).unwrap();
        assert_eq!(clustering.len(), 1);
        assert!(clustering.is_partition_of(&graph));
    }

    #[test]
    fn more_clusters_than_vertices() {
        let mut graph = Graph::new();
        graph.add_edge("a", "b", 1.0);
        graph.add_edge("b", "c", 2.0);
        graph.add_edge("a", "c", 1.0);

        let clustering = spectral(5).cluster(&graph).unwrap();
        assert_eq!(clustering.len(), 3);
        assert!(clustering.is_partition_of(&graph));
    }

    #[test]
    fn deterministic_for_a_seed() {
        let mut graph = triangles();
        graph.add_edge(2, 3, 0.5);

        let builder = spectral(3);
        assert_eq!(builder.cluster(&graph).unwrap(), builder.cluster(&graph).unwrap());
    }

    #[test]
    fn k_means_plus_plus_spreads_the_seeds() {
        let points = vec![vec![0.0, 0.0], vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let mut rng = StdRng::seed_from_u64(3);
        let centroids = initial_centroids(&points, 3, &mut rng);

        let distinct: BTreeSet<Vec<u64>> = centroids
            .iter()
            .map(|c| c.iter().map(|x| x.to_bits()).collect())
            .collect();
        assert_eq!(distinct.len(), 3);
    }
}
