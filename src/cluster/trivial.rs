//! Baseline algorithms that need no parameters

use crate::cluster::{Clustering, ClusteringAlgorithm, ClusteringBuilder};
use crate::error::Result;
use crate::graph::algorithms::connected_components;
use crate::graph::{Graph, Node};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Parameter-free clustering strategies.
///
/// Useful as baselines and as local algorithms for sense induction, where
/// `Components` splits an ego network into its connected parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trivial {
    /// No clusters at all
    Empty,
    /// One cluster per vertex
    Singleton,
    /// All vertices in one cluster
    Together,
    /// One cluster per connected component
    Components,
}

impl Trivial {
    fn compute<N: Node>(self, graph: &Graph<N>) -> Vec<BTreeSet<N>> {
        match self {
            Trivial::Empty => Vec::new(),
            Trivial::Singleton => graph.nodes().map(|node| BTreeSet::from([node])).collect(),
            Trivial::Together => vec![graph.nodes().collect()],
            Trivial::Components => connected_components(graph)
                .into_iter()
                .map(|component| component.into_iter().collect())
                .collect(),
        }
    }
}

impl fmt::Display for Trivial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trivial::Empty => "empty",
            Trivial::Singleton => "singleton",
            Trivial::Together => "together",
            Trivial::Components => "components",
        };
        f.write_str(name)
    }
}

impl FromStr for Trivial {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "empty" => Ok(Trivial::Empty),
            "singleton" => Ok(Trivial::Singleton),
            "together" => Ok(Trivial::Together),
            "components" => Ok(Trivial::Components),
            other => Err(crate::error::Error::invalid_configuration(
                "algorithm",
                format!("unknown trivial algorithm '{}'", other),
            )),
        }
    }
}

/// A [`Trivial`] strategy bound to a graph
pub struct TrivialRun<'g, N: Node> {
    kind: Trivial,
    graph: &'g Graph<N>,
    clustering: Option<Clustering<N>>,
}

impl<N: Node> ClusteringBuilder<N> for Trivial {
    type Algorithm<'g> = TrivialRun<'g, N>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        TrivialRun {
            kind: *self,
            graph,
            clustering: None,
        }
    }
}

impl<'g, N: Node> ClusteringAlgorithm<N> for TrivialRun<'g, N> {
    fn clustering(&mut self) -> Result<&Clustering<N>> {
        let clustering = match self.clustering.take() {
            Some(clustering) => clustering,
            None => {
                let clusters = self.kind.compute(self.graph);
                log::debug!("{} produced {} clusters", self.kind, clusters.len());
                Clustering::new(clusters)
            }
        };
        Ok(self.clustering.insert(clustering))
    }
}
