//! Graph representation and algorithms module
//!
//! The mutable graph itself is `petgraph`'s [`UnGraphMap`]: vertices are any
//! small copyable value, edges carry an `f64` weight. The algorithms in this
//! crate never mutate the graph they are given; iterative methods take a
//! [`CompressedGraph`] snapshot instead.

pub mod algorithms;
pub mod builder;
pub mod compressed;

use petgraph::graphmap::{NodeTrait, UnGraphMap};
use std::fmt::Debug;

pub use builder::{GraphBuilder, LabeledGraph};
pub use compressed::CompressedGraph;

/// Undirected weighted graph consumed by every clustering algorithm.
pub type Graph<N> = UnGraphMap<N, f64>;

/// Vertex type accepted by the algorithms.
///
/// Any `Copy + Ord + Hash + Debug` value that can cross threads qualifies:
/// interned ids, tuples, string slices and [`crate::sense::Sense`] all work.
pub trait Node: NodeTrait + Debug + Send + Sync {}

impl<T: NodeTrait + Debug + Send + Sync> Node for T {}
