//! Word sense induction and fuzzy graph clustering
//!
//! The crate provides a family of graph clustering algorithms sharing one
//! builder/run contract ([`cluster`]), and Watset, a local-global
//! meta-algorithm that splits ambiguous vertices into senses before
//! clustering ([`sense`]).

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod sense;
pub mod storage;

pub use cluster::{Algorithm, Clustering, ClusteringAlgorithm, ClusteringBuilder};
pub use error::{Error, Result};
pub use graph::{Graph, GraphBuilder, LabeledGraph, Node};
pub use sense::{Sense, SimplifiedWatset, Watset, WatsetParams};
