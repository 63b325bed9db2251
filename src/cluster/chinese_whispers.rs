//! Chinese Whispers label propagation
//!
//! Every vertex starts with its own label. In each iteration the vertices are
//! visited in a freshly shuffled order and each one adopts the label with the
//! highest score among its neighbors, where the score of a label is the sum
//! of [`NodeWeighting`] votes of the neighbors carrying it. Ties are broken
//! uniformly at random. The process stops when an iteration changes nothing
//! or the iteration limit is reached.

use crate::cluster::{group_by_label, Clustering, ClusteringAlgorithm, ClusteringBuilder, NodeWeighting};
use crate::error::{Error, Result};
use crate::graph::{CompressedGraph, Graph, Node};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};

/// Default iteration limit
pub const ITERATIONS: usize = 20;

/// Default random seed
pub const SEED: u64 = 1337;

/// Chinese Whispers parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ChineseWhispersParams {
    /// Vote weighting scheme
    pub weighting: NodeWeighting,

    /// Maximum number of iterations (default 20)
    pub max_iterations: usize,

    /// Seed of the random generator used for shuffling and tie breaking
    pub seed: u64,
}

impl Default for ChineseWhispersParams {
    fn default() -> Self {
        Self {
            weighting: NodeWeighting::Top,
            max_iterations: ITERATIONS,
            seed: SEED,
        }
    }
}

/// Validated Chinese Whispers configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChineseWhispers {
    params: ChineseWhispersParams,
}

impl ChineseWhispers {
    /// Create a configuration, rejecting a zero iteration limit.
    pub fn new(params: ChineseWhispersParams) -> Result<Self> {
        if params.max_iterations == 0 {
            return Err(Error::invalid_configuration(
                "max_iterations",
                "must be at least 1",
            ));
        }
        Ok(Self { params })
    }

    /// Parameters this configuration was built from
    pub fn params(&self) -> &ChineseWhispersParams {
        &self.params
    }

    /// Bind to a graph with a caller-provided random generator instead of
    /// one seeded from the parameters.
    pub fn apply_with_rng<'g, N: Node>(
        &'g self,
        graph: &'g Graph<N>,
        rng: StdRng,
    ) -> ChineseWhispersRun<'g, N> {
        ChineseWhispersRun {
            params: &self.params,
            graph,
            rng,
            steps: 0,
            clustering: None,
        }
    }
}

impl<N: Node> ClusteringBuilder<N> for ChineseWhispers {
    type Algorithm<'g> = ChineseWhispersRun<'g, N>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        self.apply_with_rng(graph, StdRng::seed_from_u64(self.params.seed))
    }
}

/// Chinese Whispers bound to a graph
pub struct ChineseWhispersRun<'g, N: Node> {
    params: &'g ChineseWhispersParams,
    graph: &'g Graph<N>,
    rng: StdRng,
    steps: usize,
    clustering: Option<Clustering<N>>,
}

impl<'g, N: Node> ChineseWhispersRun<'g, N> {
    /// Number of iterations executed so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Configured iteration limit
    pub fn max_iterations(&self) -> usize {
        self.params.max_iterations
    }

    fn compute(&mut self) -> Result<Clustering<N>> {
        let compressed = CompressedGraph::from_graph(self.graph);
        let node_count = compressed.node_count;
        self.steps = 0;

        if node_count == 0 {
            return Ok(Clustering::default());
        }

        log::debug!(
            "Chinese Whispers on {} nodes and {} edges ({} weighting)",
            node_count,
            compressed.edge_count(),
            self.params.weighting
        );

        let mut labels: Vec<usize> = (0..node_count).collect();
        let mut order: Vec<usize> = (0..node_count).collect();
        let mut votes: HashMap<usize, usize> = HashMap::new();
        let mut scores: BTreeMap<usize, f64> = BTreeMap::new();
        let mut candidates: Vec<usize> = Vec::new();

        for step in 1..=self.params.max_iterations {
            order.shuffle(&mut self.rng);
            let mut changed = 0;

            for &node in &order {
                votes.clear();
                for (neighbor, _) in compressed.neighbors(node) {
                    *votes.entry(labels[neighbor]).or_insert(0) += 1;
                }

                if votes.is_empty() {
                    continue;
                }

                scores.clear();
                for (neighbor, weight) in compressed.neighbors(node) {
                    let label = labels[neighbor];
                    let score = self.params.weighting.weight(weight, votes[&label])?;
                    *scores.entry(label).or_insert(0.0) += score;
                }

                let best = scores.values().copied().fold(f64::NEG_INFINITY, f64::max);
                candidates.clear();
                candidates.extend(
                    scores
                        .iter()
                        .filter(|&(_, &score)| score == best)
                        .map(|(&label, _)| label),
                );

                let label = match candidates.len() {
                    1 => candidates[0],
                    n => candidates[self.rng.gen_range(0..n)],
                };

                if labels[node] != label {
                    labels[node] = label;
                    changed += 1;
                }
            }

            self.steps = step;
            log::debug!("Iteration {}: {} labels changed", step, changed);

            if changed == 0 {
                break;
            }
        }

        let clusters = group_by_label(&labels, &compressed.node_ids);
        log::info!(
            "Chinese Whispers found {} clusters in {} iterations",
            clusters.len(),
            self.steps
        );

        Ok(Clustering::new(clusters))
    }
}

impl<'g, N: Node> ClusteringAlgorithm<N> for ChineseWhispersRun<'g, N> {
    fn clustering(&mut self) -> Result<&Clustering<N>> {
        let clustering = match self.clustering.take() {
            Some(clustering) => clustering,
            None => self.compute()?,
        };
        Ok(self.clustering.insert(clustering))
    }
}
