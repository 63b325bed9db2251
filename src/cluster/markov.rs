//! Markov Clustering (MCL)
//!
//! The graph is split into connected components and each component is
//! clustered independently with a dense column-stochastic matrix. Every
//! vertex gets a self loop of weight 1. An iteration raises the matrix to the
//! `expansion` power, raises every entry to the `inflation` power and
//! renormalises the columns. Iteration stops once no entry moves by more than
//! `tolerance`, or after `max_iterations`.
//!
//! Clusters are read off the attractor rows: the columns with non-zero mass
//! in the same row belong together. Overlapping rows are merged, so the
//! result is always a partition.

use crate::cluster::{Clustering, ClusteringAlgorithm, ClusteringBuilder};
use crate::error::{Error, Result};
use crate::graph::algorithms::{components, DisjointSets};
use crate::graph::{CompressedGraph, Graph, Node};
use ndarray::Array2;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Entries at or below this value are treated as zero when reading clusters
const NONZERO: f64 = 1e-9;

/// MCL parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovClusteringParams {
    /// Matrix power used in the expansion step (default 2)
    pub expansion: usize,

    /// Entry-wise exponent used in the inflation step (default 2.0)
    pub inflation: f64,

    /// Iteration limit (default 20)
    pub max_iterations: usize,

    /// Convergence threshold on the largest entry change
    pub tolerance: f64,
}

impl Default for MarkovClusteringParams {
    fn default() -> Self {
        Self {
            expansion: 2,
            inflation: 2.0,
            max_iterations: 20,
            tolerance: 1e-9,
        }
    }
}

/// Validated MCL configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkovClustering {
    params: MarkovClusteringParams,
}

impl MarkovClustering {
    /// Validate the parameters.
    ///
    /// Expansion and the iteration limit must be at least 1, inflation must
    /// be finite and greater than 1, tolerance finite and non-negative.
    pub fn new(params: MarkovClusteringParams) -> Result<Self> {
        if params.expansion == 0 {
            return Err(Error::invalid_configuration("expansion", "must be at least 1"));
        }
        if !(params.inflation.is_finite() && params.inflation > 1.0) {
            return Err(Error::invalid_configuration(
                "inflation",
                format!("must be finite and greater than 1, got {}", params.inflation),
            ));
        }
        if params.max_iterations == 0 {
            return Err(Error::invalid_configuration(
                "max_iterations",
                "must be at least 1",
            ));
        }
        if !(params.tolerance.is_finite() && params.tolerance >= 0.0) {
            return Err(Error::invalid_configuration(
                "tolerance",
                format!("must be finite and non-negative, got {}", params.tolerance),
            ));
        }
        Ok(Self { params })
    }

    /// Parameters this configuration was built from
    pub fn params(&self) -> &MarkovClusteringParams {
        &self.params
    }
}

impl<N: Node> ClusteringBuilder<N> for MarkovClustering {
    type Algorithm<'g> = MarkovClusteringRun<'g, N>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        MarkovClusteringRun {
            params: &self.params,
            graph,
            clustering: None,
        }
    }
}

/// MCL bound to a graph
pub struct MarkovClusteringRun<'g, N: Node> {
    params: &'g MarkovClusteringParams,
    graph: &'g Graph<N>,
    clustering: Option<Clustering<N>>,
}

impl<'g, N: Node> MarkovClusteringRun<'g, N> {
    fn compute(&self) -> Result<Clustering<N>> {
        let compressed = CompressedGraph::from_graph(self.graph);
        let components = components(&compressed);

        log::debug!(
            "MCL on {} nodes in {} components (e={}, r={})",
            compressed.node_count,
            components.len(),
            self.params.expansion,
            self.params.inflation
        );

        let partitions: Vec<Vec<Vec<usize>>> = components
            .par_iter()
            .map(|component| {
                if component.len() == 1 {
                    Ok(vec![component.clone()])
                } else {
                    cluster_component(self.params, &compressed, component)
                }
            })
            .collect::<Result<_>>()?;

        let clusters: Vec<BTreeSet<N>> = partitions
            .into_iter()
            .flatten()
            .map(|members| members.into_iter().map(|i| compressed.node(i)).collect())
            .collect();

        log::info!("MCL found {} clusters", clusters.len());
        Ok(Clustering::new(clusters))
    }
}

impl<'g, N: Node> ClusteringAlgorithm<N> for MarkovClusteringRun<'g, N> {
    fn clustering(&mut self) -> Result<&Clustering<N>> {
        let clustering = match self.clustering.take() {
            Some(clustering) => clustering,
            None => self.compute()?,
        };
        Ok(self.clustering.insert(clustering))
    }
}

/// Run MCL on one connected component; returns clusters of snapshot indices
fn cluster_component<N: Node>(
    params: &MarkovClusteringParams,
    graph: &CompressedGraph<N>,
    component: &[usize],
) -> Result<Vec<Vec<usize>>> {
    let size = component.len();
    let local: HashMap<usize, usize> = component
        .iter()
        .enumerate()
        .map(|(position, &node)| (node, position))
        .collect();

    let mut matrix = Array2::<f64>::eye(size);
    for (column, &node) in component.iter().enumerate() {
        for (neighbor, weight) in graph.neighbors(node) {
            matrix[[local[&neighbor], column]] = weight;
        }
    }
    normalize_columns(&mut matrix, 0)?;

    let mut iterations = 0;
    for iteration in 1..=params.max_iterations {
        iterations = iteration;
        let previous = matrix.clone();

        let mut expanded = matrix.clone();
        for _ in 1..params.expansion {
            expanded = expanded.dot(&matrix);
        }

        expanded.mapv_inplace(|value| value.powf(params.inflation));
        normalize_columns(&mut expanded, iteration)?;
        matrix = expanded;

        let delta = matrix
            .iter()
            .zip(previous.iter())
            .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()));
        if delta <= params.tolerance {
            break;
        }
    }
    log::debug!("Component of {} nodes settled after {} iterations", size, iterations);

    let mut sets = DisjointSets::new(size);
    for row in matrix.rows() {
        let mut attracted = row
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value > NONZERO)
            .map(|(column, _)| column);
        if let Some(first) = attracted.next() {
            for column in attracted {
                sets.union(first, column);
            }
        }
    }

    Ok(sets
        .groups()
        .into_iter()
        .map(|group| group.into_iter().map(|position| component[position]).collect())
        .collect())
}

fn normalize_columns(matrix: &mut Array2<f64>, iteration: usize) -> Result<()> {
    for (column, mut values) in matrix.columns_mut().into_iter().enumerate() {
        let sum = values.sum();
        if !(sum.is_finite() && sum > 0.0) {
            return Err(Error::NumericDivergence { column, iteration });
        }
        values /= sum;
    }
    Ok(())
}
