//! Watset: local-global fuzzy graph clustering
//!
//! 1. Every vertex is split into senses by clustering its ego network with
//!    the local algorithm ([`SenseInduction`]).
//! 2. Every edge `u-v` is rewired to connect one sense of `u` with one sense
//!    of `v`, giving the sense graph.
//! 3. The global algorithm clusters the sense graph.
//! 4. Senses are mapped back to their vertices. A vertex whose senses land
//!    in different clusters appears in each of them.
//!
//! [`SimplifiedWatset`] picks the sense of `u` whose context contains `v`.
//! [`Watset`] instead picks the sense of `u` whose context is most similar
//! to the neighborhood of `v`, by a [`ContextSimilarity`].

use crate::cluster::{Clustering, ClusteringAlgorithm, ClusteringBuilder};
use crate::error::Result;
use crate::graph::algorithms::neighbor_weights;
use crate::graph::{Graph, Node};
use crate::sense::{Context, ContextSimilarity, Inventory, Sense, SenseInduction};
use std::collections::{BTreeMap, HashMap};

/// Watset parameters
#[derive(Debug, Clone, Default)]
pub struct WatsetParams<L, G> {
    /// Algorithm for ego networks
    pub local: L,
    /// Algorithm for the sense graph
    pub global: G,
    /// Scores candidate senses against the other endpoint of an edge
    pub similarity: ContextSimilarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disambiguation {
    Membership,
    Similarity(ContextSimilarity),
}

/// Watset with similarity-based disambiguation
#[derive(Debug, Clone)]
pub struct Watset<L, G> {
    induction: SenseInduction<L>,
    global: G,
    similarity: ContextSimilarity,
}

impl<L, G> Watset<L, G> {
    pub fn new(params: WatsetParams<L, G>) -> Self {
        Self {
            induction: SenseInduction::new(params.local),
            global: params.global,
            similarity: params.similarity,
        }
    }

    /// Sense induction used in the local step
    pub fn induction(&self) -> &SenseInduction<L> {
        &self.induction
    }

    /// Algorithm used in the global step
    pub fn global(&self) -> &G {
        &self.global
    }
}

/// Watset with membership-based disambiguation
#[derive(Debug, Clone)]
pub struct SimplifiedWatset<L, G> {
    induction: SenseInduction<L>,
    global: G,
}

impl<L, G> SimplifiedWatset<L, G> {
    pub fn new(local: L, global: G) -> Self {
        Self {
            induction: SenseInduction::new(local),
            global,
        }
    }

    /// Sense induction used in the local step
    pub fn induction(&self) -> &SenseInduction<L> {
        &self.induction
    }

    /// Algorithm used in the global step
    pub fn global(&self) -> &G {
        &self.global
    }
}

impl<N, L, G> ClusteringBuilder<N> for Watset<L, G>
where
    N: Node,
    L: ClusteringBuilder<N>,
    G: ClusteringBuilder<Sense<N>>,
{
    type Algorithm<'g> = WatsetRun<'g, N, L, G>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        WatsetRun {
            induction: &self.induction,
            global: &self.global,
            disambiguation: Disambiguation::Similarity(self.similarity),
            graph,
            result: None,
        }
    }
}

impl<N, L, G> ClusteringBuilder<N> for SimplifiedWatset<L, G>
where
    N: Node,
    L: ClusteringBuilder<N>,
    G: ClusteringBuilder<Sense<N>>,
{
    type Algorithm<'g> = WatsetRun<'g, N, L, G>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        WatsetRun {
            induction: &self.induction,
            global: &self.global,
            disambiguation: Disambiguation::Membership,
            graph,
            result: None,
        }
    }
}

/// Everything a Watset run produces
#[derive(Debug, Clone)]
pub struct WatsetClustering<N: Node> {
    /// Clusters over the original vertices
    pub clustering: Clustering<N>,
    /// Clusters over senses, before projection
    pub sense_clustering: Clustering<Sense<N>>,
    /// Senses of every vertex
    pub inventory: Inventory<N>,
    /// The disambiguated graph the global algorithm ran on
    pub sense_graph: Graph<Sense<N>>,
}

impl<N: Node> WatsetClustering<N> {
    /// Disambiguated context of every sense: its neighbors in the sense graph
    pub fn contexts(&self) -> BTreeMap<Sense<N>, Context<Sense<N>>> {
        self.sense_graph
            .nodes()
            .map(|sense| (sense, neighbor_weights(&self.sense_graph, sense)))
            .collect()
    }
}

/// Watset bound to a graph
pub struct WatsetRun<'g, N: Node, L, G> {
    induction: &'g SenseInduction<L>,
    global: &'g G,
    disambiguation: Disambiguation,
    graph: &'g Graph<N>,
    result: Option<WatsetClustering<N>>,
}

impl<'g, N, L, G> WatsetRun<'g, N, L, G>
where
    N: Node,
    L: ClusteringBuilder<N>,
    G: ClusteringBuilder<Sense<N>>,
{
    /// Compute (once) and return the clustering with the inventory and sense graph
    pub fn result(&mut self) -> Result<&WatsetClustering<N>> {
        let result = match self.result.take() {
            Some(result) => result,
            None => self.compute()?,
        };
        Ok(self.result.insert(result))
    }

    fn compute(&self) -> Result<WatsetClustering<N>> {
        let inventory = self.induction.inventory(self.graph)?;
        let sense_graph = sense_graph(self.graph, &inventory, self.disambiguation);
        log::info!(
            "Sense graph has {} nodes and {} edges",
            sense_graph.node_count(),
            sense_graph.edge_count()
        );

        let sense_clustering = self.global.cluster(&sense_graph)?;
        let clustering = sense_clustering.map(|sense| sense.node);
        log::info!("Watset found {} clusters", clustering.len());

        Ok(WatsetClustering {
            clustering,
            sense_clustering,
            inventory,
            sense_graph,
        })
    }
}

impl<'g, N, L, G> ClusteringAlgorithm<N> for WatsetRun<'g, N, L, G>
where
    N: Node,
    L: ClusteringBuilder<N>,
    G: ClusteringBuilder<Sense<N>>,
{
    fn clustering(&mut self) -> Result<&Clustering<N>> {
        Ok(&self.result()?.clustering)
    }
}

/// Rewire every edge between the best-matching senses of its endpoints.
///
/// Each sense becomes a vertex, including senses that end up without edges.
/// Weights landing on an existing sense pair are summed.
fn sense_graph<N: Node>(
    graph: &Graph<N>,
    inventory: &Inventory<N>,
    disambiguation: Disambiguation,
) -> Graph<Sense<N>> {
    let mut senses = Graph::with_capacity(inventory.sense_count(), graph.edge_count());
    for (_, induced) in inventory.iter() {
        for sense in induced {
            senses.add_node(sense.sense);
        }
    }

    let vectors: HashMap<N, Context<N>> = match disambiguation {
        Disambiguation::Membership => HashMap::new(),
        Disambiguation::Similarity(_) => graph
            .nodes()
            .map(|node| (node, neighbor_weights(graph, node)))
            .collect(),
    };

    for (u, v, &weight) in graph.all_edges() {
        if u == v {
            continue;
        }

        let source = disambiguate(inventory, &vectors, disambiguation, u, v, weight);
        let target = disambiguate(inventory, &vectors, disambiguation, v, u, weight);

        match senses.edge_weight_mut(source, target) {
            Some(existing) => *existing += weight,
            None => {
                senses.add_edge(source, target, weight);
            }
        }
    }

    senses
}

/// Sense of `node` to use for its edge to `other`
fn disambiguate<N: Node>(
    inventory: &Inventory<N>,
    vectors: &HashMap<N, Context<N>>,
    disambiguation: Disambiguation,
    node: N,
    other: N,
    weight: f64,
) -> Sense<N> {
    let candidates = inventory.senses(node);
    let first = candidates
        .first()
        .map(|induced| induced.sense)
        .unwrap_or_else(|| Sense::new(node, 1));

    if candidates.len() <= 1 {
        return first;
    }

    match disambiguation {
        Disambiguation::Membership => inventory.sense_containing(node, other).unwrap_or_else(|| {
            log::debug!("No sense of {:?} contains {:?}, using the first", node, other);
            first
        }),
        Disambiguation::Similarity(similarity) => {
            let mut vector = vectors.get(&other).cloned().unwrap_or_default();
            vector.insert(other, weight);

            let mut best = first;
            let mut best_score = f64::NEG_INFINITY;
            for induced in candidates {
                let score = similarity.similarity(&induced.context, &vector);
                if score > best_score {
                    best = induced.sense;
                    best_score = score;
                }
            }
            best
        }
    }
}
