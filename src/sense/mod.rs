//! Word senses induced from ego networks
//!
//! A vertex with neighbors from unrelated groups is split into several
//! [`Sense`]s, one per local cluster of its ego network. Every sense keeps the
//! neighbors of its cluster, with their edge weights, as its [`Context`].

pub mod induction;
pub mod similarity;
pub mod watset;

use crate::graph::Node;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub use induction::SenseInduction;
pub use similarity::ContextSimilarity;
pub use watset::{SimplifiedWatset, Watset, WatsetClustering, WatsetParams, WatsetRun};

/// One meaning of a vertex.
///
/// Senses of the same vertex are numbered from 1 in discovery order, so
/// equality and hashing come down to `(node, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Sense<N> {
    /// The vertex this sense belongs to
    pub node: N,
    /// Position among the senses of `node`, starting at 1
    pub index: usize,
}

impl<N> Sense<N> {
    pub fn new(node: N, index: usize) -> Self {
        Self { node, index }
    }
}

impl<N: fmt::Display> fmt::Display for Sense<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.node, self.index)
    }
}

/// Neighbor weights attached to a sense
pub type Context<N> = BTreeMap<N, f64>;

/// A sense together with its context
#[derive(Debug, Clone, PartialEq)]
pub struct InducedSense<N> {
    pub sense: Sense<N>,
    pub context: Context<N>,
}

/// Every vertex mapped to its senses, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory<N: Node> {
    senses: BTreeMap<N, Vec<InducedSense<N>>>,
}

impl<N: Node> Default for Inventory<N> {
    fn default() -> Self {
        Self {
            senses: BTreeMap::new(),
        }
    }
}

impl<N: Node> Inventory<N> {
    pub(crate) fn insert(&mut self, node: N, senses: Vec<InducedSense<N>>) {
        self.senses.insert(node, senses);
    }

    /// Senses of `node`; empty if the vertex is unknown
    pub fn senses(&self, node: N) -> &[InducedSense<N>] {
        self.senses.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a sense by identity
    pub fn get(&self, sense: Sense<N>) -> Option<&InducedSense<N>> {
        sense
            .index
            .checked_sub(1)
            .and_then(|position| self.senses(sense.node).get(position))
    }

    /// First sense of `node` whose context contains `neighbor`
    pub fn sense_containing(&self, node: N, neighbor: N) -> Option<Sense<N>> {
        self.senses(node)
            .iter()
            .find(|induced| induced.context.contains_key(&neighbor))
            .map(|induced| induced.sense)
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.senses.len()
    }

    /// Whether the inventory covers no vertices
    pub fn is_empty(&self) -> bool {
        self.senses.is_empty()
    }

    /// Total number of senses over all vertices
    pub fn sense_count(&self) -> usize {
        self.senses.values().map(Vec::len).sum()
    }

    /// Iterate over vertices and their senses
    pub fn iter(&self) -> impl Iterator<Item = (N, &[InducedSense<N>])> + '_ {
        self.senses
            .iter()
            .map(|(&node, senses)| (node, senses.as_slice()))
    }
}
