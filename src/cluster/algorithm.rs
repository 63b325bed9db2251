//! Run-time selection among the built-in algorithms

use crate::cluster::{
    ChineseWhispers, ChineseWhispersRun, Clustering, ClusteringAlgorithm, ClusteringBuilder,
    MarkovClustering, MarkovClusteringExternal, MarkovClusteringExternalRun, MarkovClusteringRun,
    MaxMax, MaxMaxRun, SpectralClustering, SpectralClusteringRun, Trivial, TrivialRun,
};
use crate::error::Result;
use crate::graph::{Graph, Node};
use std::fmt;

/// Any non-composite clustering algorithm.
///
/// Implements [`ClusteringBuilder`] for every node type, so one value can
/// serve as the local algorithm on ego networks and as the global algorithm
/// on a sense graph.
#[derive(Debug, Clone)]
pub enum Algorithm {
    /// Empty, Singleton, Together or Components
    Trivial(Trivial),
    /// Chinese Whispers
    ChineseWhispers(ChineseWhispers),
    /// Native Markov Clustering
    MarkovClustering(MarkovClustering),
    /// Markov Clustering through the `mcl` executable
    MarkovClusteringExternal(MarkovClusteringExternal),
    /// MaxMax
    MaxMax(MaxMax),
    /// Spectral clustering into `k` clusters
    Spectral(SpectralClustering),
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Trivial(trivial) => write!(f, "{}", trivial),
            Algorithm::ChineseWhispers(cw) => write!(f, "cw ({})", cw.params().weighting),
            Algorithm::MarkovClustering(mcl) => {
                write!(f, "mcl (e={}, r={})", mcl.params().expansion, mcl.params().inflation)
            }
            Algorithm::MarkovClusteringExternal(mcl) => {
                write!(f, "mcl-bin ({})", mcl.params().path.display())
            }
            Algorithm::MaxMax(_) => f.write_str("maxmax"),
            Algorithm::Spectral(spectral) => write!(f, "spectral (k={})", spectral.params().k),
        }
    }
}

impl From<Trivial> for Algorithm {
    fn from(algorithm: Trivial) -> Self {
        Algorithm::Trivial(algorithm)
    }
}

impl From<ChineseWhispers> for Algorithm {
    fn from(algorithm: ChineseWhispers) -> Self {
        Algorithm::ChineseWhispers(algorithm)
    }
}

impl From<MarkovClustering> for Algorithm {
    fn from(algorithm: MarkovClustering) -> Self {
        Algorithm::MarkovClustering(algorithm)
    }
}

impl From<MarkovClusteringExternal> for Algorithm {
    fn from(algorithm: MarkovClusteringExternal) -> Self {
        Algorithm::MarkovClusteringExternal(algorithm)
    }
}

impl From<MaxMax> for Algorithm {
    fn from(algorithm: MaxMax) -> Self {
        Algorithm::MaxMax(algorithm)
    }
}

impl From<SpectralClustering> for Algorithm {
    fn from(algorithm: SpectralClustering) -> Self {
        Algorithm::Spectral(algorithm)
    }
}

/// An [`Algorithm`] bound to a graph
pub enum AlgorithmRun<'g, N: Node> {
    /// See [`Algorithm::Trivial`]
    Trivial(TrivialRun<'g, N>),
    /// See [`Algorithm::ChineseWhispers`]
    ChineseWhispers(ChineseWhispersRun<'g, N>),
    /// See [`Algorithm::MarkovClustering`]
    MarkovClustering(MarkovClusteringRun<'g, N>),
    /// See [`Algorithm::MarkovClusteringExternal`]
    MarkovClusteringExternal(MarkovClusteringExternalRun<'g, N>),
    /// See [`Algorithm::MaxMax`]
    MaxMax(MaxMaxRun<'g, N>),
    /// See [`Algorithm::Spectral`]
    Spectral(SpectralClusteringRun<'g, N>),
}

impl<N: Node> ClusteringBuilder<N> for Algorithm {
    type Algorithm<'g> = AlgorithmRun<'g, N>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        match self {
            Algorithm::Trivial(a) => AlgorithmRun::Trivial(a.apply(graph)),
            Algorithm::ChineseWhispers(a) => AlgorithmRun::ChineseWhispers(a.apply(graph)),
            Algorithm::MarkovClustering(a) => AlgorithmRun::MarkovClustering(a.apply(graph)),
            Algorithm::MarkovClusteringExternal(a) => {
                AlgorithmRun::MarkovClusteringExternal(a.apply(graph))
            }
            Algorithm::MaxMax(a) => AlgorithmRun::MaxMax(a.apply(graph)),
            Algorithm::Spectral(a) => AlgorithmRun::Spectral(a.apply(graph)),
        }
    }
}

impl<'g, N: Node> ClusteringAlgorithm<N> for AlgorithmRun<'g, N> {
    fn clustering(&mut self) -> Result<&Clustering<N>> {
        match self {
            AlgorithmRun::Trivial(run) => run.clustering(),
            AlgorithmRun::ChineseWhispers(run) => run.clustering(),
            AlgorithmRun::MarkovClustering(run) => run.clustering(),
            AlgorithmRun::MarkovClusteringExternal(run) => run.clustering(),
            AlgorithmRun::MaxMax(run) => run.clustering(),
            AlgorithmRun::Spectral(run) => run.clustering(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MarkovClusteringParams;

    #[test]
    fn dispatches_to_the_wrapped_algorithm() {
        let mut graph = Graph::new();
        graph.add_edge(0u32, 1, 1.0);
        graph.add_edge(2, 3, 1.0);

        let algorithms: Vec<Algorithm> = vec![
            Trivial::Components.into(),
            ChineseWhispers::default().into(),
            MarkovClustering::new(MarkovClusteringParams::default()).unwrap().into(),
            MaxMax.into(),
            SpectralClustering::default().into(),
        ];

        for algorithm in &algorithms {
            let clustering = algorithm.cluster(&graph).unwrap();
            assert_eq!(clustering.len(), 2, "{}", algorithm);
            assert!(clustering.is_partition_of(&graph));
        }

        let together: Algorithm = Trivial::Together.into();
        assert_eq!(together.cluster(&graph).unwrap().len(), 1);
    }

    #[test]
    fn display_names() {
        assert_eq!(Algorithm::from(MaxMax).to_string(), "maxmax");
        assert_eq!(Algorithm::from(ChineseWhispers::default()).to_string(), "cw (top)");
        assert_eq!(Algorithm::from(Trivial::Singleton).to_string(), "singleton");
    }
}
