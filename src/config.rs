//! Run-level configuration shared by the command line tool
//!
//! Algorithms are selected by name. Per-algorithm options are given as
//! `key=value` pairs that override the run-level defaults:
//!
//! | algorithm | options |
//! |---|---|
//! | `empty`, `singleton`, `together`, `components` | none |
//! | `cw` | `weighting`, `iterations`, `seed` |
//! | `mcl` | `expansion`, `inflation`, `iterations` |
//! | `mcl-bin` | `bin`, `inflation`, `threads`, `timeout` (seconds), `scratch` |
//! | `maxmax` | none |
//! | `spectral` | `k`, `iterations`, `seed` |

use crate::cluster::{
    Algorithm, ChineseWhispers, ChineseWhispersParams, MarkovClustering,
    MarkovClusteringExternal, MarkovClusteringExternalParams, MarkovClusteringParams, MaxMax,
    NodeWeighting, SpectralClustering, SpectralClusteringParams, Trivial,
};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Default configuration for a clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Seed for randomized algorithms
    pub seed: u64,

    /// Number of worker threads (0 = use all available cores)
    pub threads: usize,

    /// Iteration limit for iterative algorithms
    pub max_iterations: usize,

    /// MCL expansion power
    pub expansion: usize,

    /// MCL inflation exponent
    pub inflation: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: crate::cluster::chinese_whispers::SEED,
            threads: 0,
            max_iterations: crate::cluster::chinese_whispers::ITERATIONS,
            expansion: 2,
            inflation: 2.0,
        }
    }
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(seed: u64, threads: usize, max_iterations: usize) -> Self {
        Self {
            seed,
            threads,
            max_iterations,
            ..Default::default()
        }
    }

    /// Worker thread count with 0 resolved to the number of cores
    pub fn thread_count(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            num_cpus::get()
        }
    }

    /// Build an algorithm from its name and `key=value` options
    pub fn algorithm(&self, name: &str, options: &[String]) -> Result<Algorithm> {
        let options = Options::parse(options)?;

        let algorithm: Algorithm = match name {
            "empty" | "singleton" | "together" | "components" => Trivial::from_str(name)?.into(),
            "cw" => ChineseWhispers::new(ChineseWhispersParams {
                weighting: options.get("weighting")?.unwrap_or(NodeWeighting::Top),
                max_iterations: options.get("iterations")?.unwrap_or(self.max_iterations),
                seed: options.get("seed")?.unwrap_or(self.seed),
            })?
            .into(),
            "mcl" => MarkovClustering::new(MarkovClusteringParams {
                expansion: options.get("expansion")?.unwrap_or(self.expansion),
                inflation: options.get("inflation")?.unwrap_or(self.inflation),
                max_iterations: options.get("iterations")?.unwrap_or(self.max_iterations),
                ..Default::default()
            })?
            .into(),
            "mcl-bin" => {
                let defaults = MarkovClusteringExternalParams::default();
                MarkovClusteringExternal::new(MarkovClusteringExternalParams {
                    path: options.get("bin")?.unwrap_or(defaults.path),
                    scratch_dir: options.get("scratch")?.unwrap_or(defaults.scratch_dir),
                    inflation: options.get("inflation")?.unwrap_or(self.inflation),
                    threads: options.get("threads")?.unwrap_or_else(|| self.thread_count()),
                    timeout: options.get::<u64>("timeout")?.map(Duration::from_secs),
                })?
                .into()
            }
            "maxmax" => MaxMax.into(),
            "spectral" => SpectralClustering::new(SpectralClusteringParams {
                k: options.get("k")?.unwrap_or(2),
                max_iterations: options.get("iterations")?.unwrap_or(self.max_iterations),
                seed: options.get("seed")?.unwrap_or(self.seed),
            })?
            .into(),
            other => {
                return Err(Error::invalid_configuration(
                    "algorithm",
                    format!("unknown algorithm '{}'", other),
                ))
            }
        };

        options.finish(name)?;
        Ok(algorithm)
    }
}

/// `key=value` options, tracking which ones were consumed
struct Options<'a> {
    values: HashMap<&'a str, &'a str>,
    used: std::cell::RefCell<Vec<&'a str>>,
}

impl<'a> Options<'a> {
    fn parse(options: &'a [String]) -> Result<Self> {
        let mut values = HashMap::new();
        for option in options {
            let (key, value) = option.split_once('=').ok_or_else(|| {
                Error::invalid_configuration("options", format!("expected key=value, got '{}'", option))
            })?;
            values.insert(key.trim(), value.trim());
        }
        Ok(Self {
            values,
            used: Default::default(),
        })
    }

    fn get<T: FromStr>(&self, key: &'a str) -> Result<Option<T>> {
        self.used.borrow_mut().push(key);
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                Error::invalid_configuration("options", format!("invalid value for {}: '{}'", key, value))
            }),
        }
    }

    fn finish(&self, algorithm: &str) -> Result<()> {
        let used = self.used.borrow();
        match self.values.keys().find(|key| !used.contains(*key)) {
            Some(key) => Err(Error::invalid_configuration(
                "options",
                format!("{} does not take option '{}'", algorithm, key),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_algorithms_by_name() {
        let config = Config::default();

        assert!(matches!(
            config.algorithm("components", &[]).unwrap(),
            Algorithm::Trivial(Trivial::Components)
        ));
        assert!(matches!(config.algorithm("maxmax", &[]).unwrap(), Algorithm::MaxMax(_)));

        match config.algorithm("cw", &options(&["weighting=log", "iterations=5"])).unwrap() {
            Algorithm::ChineseWhispers(cw) => {
                assert_eq!(cw.params().weighting, NodeWeighting::Log);
                assert_eq!(cw.params().max_iterations, 5);
                assert_eq!(cw.params().seed, config.seed);
            }
            other => panic!("unexpected {}", other),
        }

        match config.algorithm("mcl", &options(&["inflation=1.5"])).unwrap() {
            Algorithm::MarkovClustering(mcl) => {
                assert_eq!(mcl.params().inflation, 1.5);
                assert_eq!(mcl.params().expansion, 2);
            }
            other => panic!("unexpected {}", other),
        }

        match config.algorithm("spectral", &options(&["k=3"])).unwrap() {
            Algorithm::Spectral(spectral) => {
                assert_eq!(spectral.params().k, 3);
                assert_eq!(spectral.params().seed, config.seed);
                assert_eq!(spectral.params().max_iterations, config.max_iterations);
            }
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn rejects_bad_input() {
        let config = Config::default();
        assert!(config.algorithm("louvain", &[]).is_err());
        assert!(config.algorithm("cw", &options(&["weighting"])).is_err());
        assert!(config.algorithm("cw", &options(&["weighting=nolog"])).is_err());
        assert!(config.algorithm("cw", &options(&["inflation=2"])).is_err());
        assert!(config.algorithm("mcl", &options(&["inflation=0.5"])).is_err());
        assert!(config.algorithm("spectral", &options(&["k=0"])).is_err());
        assert!(config
            .algorithm("mcl-bin", &options(&["bin=/no/such/mcl"]))
            .is_err());
    }

    #[test]
    fn thread_count_resolves_zero() {
        assert_eq!(Config::new(1, 3, 20).thread_count(), 3);
        assert!(Config::default().thread_count() >= 1);
    }
}
