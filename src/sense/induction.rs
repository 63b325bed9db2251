//! Sense induction on ego networks

use crate::cluster::ClusteringBuilder;
use crate::error::Result;
use crate::graph::algorithms::{ego_network, neighbor_weights};
use crate::graph::{Graph, Node};
use crate::sense::{Context, InducedSense, Inventory, Sense};

/// Splits vertices into senses with a local clustering algorithm.
///
/// The ego network of a vertex (its neighbors and the edges among them, the
/// vertex itself excluded) is clustered; each cluster becomes one sense whose
/// context holds the cluster members weighted by their edge to the vertex.
/// When there is nothing to cluster, or the local algorithm returns no
/// clusters, the vertex keeps a single sense holding all its neighbors.
#[derive(Debug, Clone, Default)]
pub struct SenseInduction<L> {
    local: L,
}

impl<L> SenseInduction<L> {
    pub fn new(local: L) -> Self {
        Self { local }
    }

    /// The local clustering algorithm
    pub fn local(&self) -> &L {
        &self.local
    }

    /// Senses of one vertex, numbered from 1
    pub fn senses<N>(&self, graph: &Graph<N>, node: N) -> Result<Vec<InducedSense<N>>>
    where
        N: Node,
        L: ClusteringBuilder<N>,
    {
        let neighbors = neighbor_weights(graph, node);
        let ego = ego_network(graph, node);

        let clustering = if ego.edge_count() == 0 {
            None
        } else {
            Some(self.local.cluster(&ego)?).filter(|clustering| !clustering.is_empty())
        };

        let Some(clustering) = clustering else {
            return Ok(vec![InducedSense {
                sense: Sense::new(node, 1),
                context: neighbors,
            }]);
        };

        Ok(clustering
            .iter()
            .enumerate()
            .map(|(position, cluster)| InducedSense {
                sense: Sense::new(node, position + 1),
                context: cluster
                    .iter()
                    .filter_map(|member| neighbors.get(member).map(|&w| (*member, w)))
                    .collect::<Context<N>>(),
            })
            .collect())
    }

    /// Senses of every vertex of the graph
    pub fn inventory<N>(&self, graph: &Graph<N>) -> Result<Inventory<N>>
    where
        N: Node,
        L: ClusteringBuilder<N>,
    {
        let mut inventory = Inventory::default();
        for node in graph.nodes() {
            let senses = self.senses(graph, node)?;
            if senses.len() > 1 {
                log::debug!("{:?} has {} senses", node, senses.len());
            }
            inventory.insert(node, senses);
        }

        log::info!(
            "Induced {} senses for {} nodes",
            inventory.sense_count(),
            inventory.len()
        );
        Ok(inventory)
    }
}
