//! Markov Clustering through the external `mcl` executable
//!
//! Each connected component with more than one vertex is written to a
//! scratch ABC file, handed to `mcl` and read back. Components run in
//! parallel on a dedicated pool of `threads` workers; any failure fails the
//! whole call. Scratch files are removed when they go out of scope, whatever
//! the outcome.
//!
//! Process launching goes through the [`ProcessRunner`] trait so the
//! orchestration can be exercised without the real binary. The system
//! runner captures output in anonymous scratch files rather than pipes, so a
//! deadline holds even when the process leaves descendants behind.

use crate::cluster::{Clustering, ClusteringAlgorithm, ClusteringBuilder};
use crate::data::{parse_clusters, write_indexed_edges};
use crate::error::{Error, Result};
use crate::graph::algorithms::components;
use crate::graph::{CompressedGraph, Graph, Node};
use crossbeam::channel::{after, tick};
use crossbeam::select;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One process launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable to run
    pub program: PathBuf,
    /// Command line arguments
    pub args: Vec<OsString>,
    /// Deadline for the process, if any
    pub timeout: Option<Duration>,
    /// Directory for files the runner needs while the process is alive
    pub scratch_dir: PathBuf,
}

impl Invocation {
    /// Value following `flag` in the argument list
    pub fn arg_after(&self, flag: &str) -> Option<&Path> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(Path::new)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What a finished process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Whether the process exited with status zero
    pub success: bool,
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ProcessOutput {
    /// Standard output and standard error in one string
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stdout.is_empty() && !self.stderr.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&self.stderr);
        combined
    }
}

/// Launches external processes.
pub trait ProcessRunner: Send + Sync + fmt::Debug {
    /// Check that `program` can be launched at all
    fn check(&self, _program: &Path) -> Result<()> {
        Ok(())
    }

    /// Run the process to completion, honoring its timeout
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// [`ProcessRunner`] backed by [`std::process::Command`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn check(&self, program: &Path) -> Result<()> {
        match resolve(program) {
            Some(path) => {
                log::debug!("Using {}", path.display());
                Ok(())
            }
            None => Err(Error::invalid_configuration(
                "path",
                format!("{} is not an executable file or a program on PATH", program.display()),
            )),
        }
    }

    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let mut stdout = tempfile::tempfile_in(&invocation.scratch_dir)?;
        let mut stderr = tempfile::tempfile_in(&invocation.scratch_dir)?;

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?))
            .spawn()
            .map_err(|error| Error::ExternalToolFailure {
                message: format!("cannot launch {}: {}", invocation.program.display(), error),
                output: String::new(),
            })?;

        match wait(&mut child, invocation.timeout)? {
            Some(status) => Ok(ProcessOutput {
                success: status.success(),
                code: status.code(),
                stdout: read_captured(&mut stdout)?,
                stderr: read_captured(&mut stderr)?,
            }),
            None => Err(Error::Timeout {
                limit: invocation.timeout.unwrap_or_default(),
            }),
        }
    }
}

/// `program` itself when it has a directory part, otherwise its first match on `PATH`
fn resolve(program: &Path) -> Option<PathBuf> {
    if program.is_absolute() || program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Everything written to a capture file, with invalid UTF-8 replaced
fn read_captured(file: &mut File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Wait for the child; `None` means it was killed at the deadline
fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<Option<ExitStatus>> {
    let Some(limit) = timeout else {
        return Ok(Some(child.wait()?));
    };

    let ticker = tick(POLL_INTERVAL);
    let deadline = after(limit);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        select! {
            recv(ticker) -> _ => {}
            recv(deadline) -> _ => {
                if let Some(status) = child.try_wait()? {
                    return Ok(Some(status));
                }
                log::warn!("Killing process {} after {:?}", child.id(), limit);
                if let Err(error) = child.kill() {
                    log::debug!("kill failed: {}", error);
                }
                child.wait()?;
                return Ok(None);
            }
        }
    }
}

/// External MCL parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovClusteringExternalParams {
    /// The `mcl` executable: a path, or a bare name looked up on `PATH`
    pub path: PathBuf,

    /// Directory for scratch files (default: the system temp directory)
    pub scratch_dir: PathBuf,

    /// Inflation passed as `-I` (default 2.0)
    pub inflation: f64,

    /// Worker budget (default 1). Components run concurrently on up to this
    /// many workers; each process gets the budget divided by the number of
    /// concurrent processes as `-te`, and at least one.
    pub threads: usize,

    /// Deadline for each process launch
    pub timeout: Option<Duration>,
}

impl Default for MarkovClusteringExternalParams {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mcl"),
            scratch_dir: std::env::temp_dir(),
            inflation: 2.0,
            threads: 1,
            timeout: None,
        }
    }
}

/// Validated external MCL configuration
#[derive(Debug, Clone)]
pub struct MarkovClusteringExternal {
    params: MarkovClusteringExternalParams,
    runner: Arc<dyn ProcessRunner>,
}

impl MarkovClusteringExternal {
    /// Configuration that launches real processes
    pub fn new(params: MarkovClusteringExternalParams) -> Result<Self> {
        Self::with_runner(params, Arc::new(SystemProcessRunner))
    }

    /// Configuration that launches processes through `runner`
    pub fn with_runner(
        params: MarkovClusteringExternalParams,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self> {
        if params.path.as_os_str().is_empty() {
            return Err(Error::invalid_configuration("path", "must not be empty"));
        }
        if !(params.inflation.is_finite() && params.inflation > 1.0) {
            return Err(Error::invalid_configuration(
                "inflation",
                format!("must be finite and greater than 1, got {}", params.inflation),
            ));
        }
        if params.threads == 0 {
            return Err(Error::invalid_configuration("threads", "must be at least 1"));
        }
        if params.timeout == Some(Duration::ZERO) {
            return Err(Error::invalid_configuration("timeout", "must be positive"));
        }
        if !params.scratch_dir.is_dir() {
            return Err(Error::invalid_configuration(
                "scratch_dir",
                format!("{} is not a directory", params.scratch_dir.display()),
            ));
        }
        runner.check(&params.path)?;

        Ok(Self { params, runner })
    }

    /// Parameters this configuration was built from
    pub fn params(&self) -> &MarkovClusteringExternalParams {
        &self.params
    }

    /// Cluster one component; returns clusters of snapshot indices
    fn cluster_component<N: Node>(
        &self,
        graph: &CompressedGraph<N>,
        component: &[usize],
        threads: usize,
    ) -> Result<Vec<Vec<usize>>> {
        let local: HashMap<usize, usize> = component
            .iter()
            .enumerate()
            .map(|(position, &node)| (node, position))
            .collect();

        let input = tempfile::Builder::new()
            .prefix("mcl-input-")
            .suffix(".abc")
            .tempfile_in(&self.params.scratch_dir)?;
        let output = tempfile::Builder::new()
            .prefix("mcl-output-")
            .suffix(".txt")
            .tempfile_in(&self.params.scratch_dir)?;

        let edges = component.iter().enumerate().flat_map(|(position, &node)| {
            graph
                .neighbors(node)
                .map(|(neighbor, weight)| (position, local[&neighbor], weight))
                .filter(|&(source, target, _)| source < target)
                .collect::<Vec<_>>()
        });
        write_indexed_edges(BufWriter::new(input.as_file()), edges)?;

        let invocation = Invocation {
            program: self.params.path.clone(),
            args: vec![
                input.path().into(),
                "-I".into(),
                self.params.inflation.to_string().into(),
                "-te".into(),
                threads.to_string().into(),
                "--abc".into(),
                "-o".into(),
                output.path().into(),
            ],
            timeout: self.params.timeout,
            scratch_dir: self.params.scratch_dir.clone(),
        };
        log::debug!("Running {}", invocation);

        let result = self.runner.run(&invocation)?;
        if !result.success {
            return Err(Error::ExternalToolFailure {
                message: match result.code {
                    Some(code) => format!("{} exited with status {}", invocation.program.display(), code),
                    None => format!("{} was terminated by a signal", invocation.program.display()),
                },
                output: result.combined(),
            });
        }

        let file = std::fs::File::open(output.path())?;
        let clusters = parse_clusters(BufReader::new(file)).map_err(|error| {
            Error::ExternalToolFailure {
                message: format!("malformed output: {}", error),
                output: result.combined(),
            }
        })?;

        let mut seen = vec![false; component.len()];
        for &member in clusters.iter().flatten() {
            if member >= component.len() || seen[member] {
                return Err(Error::ExternalToolFailure {
                    message: format!("unexpected or repeated vertex {} in output", member),
                    output: result.combined(),
                });
            }
            seen[member] = true;
        }
        if let Some(missing) = seen.iter().position(|&covered| !covered) {
            return Err(Error::ExternalToolFailure {
                message: format!("vertex {} missing from output", missing),
                output: result.combined(),
            });
        }

        Ok(clusters
            .into_iter()
            .map(|cluster| cluster.into_iter().map(|position| component[position]).collect())
            .collect())
    }
}

impl<N: Node> ClusteringBuilder<N> for MarkovClusteringExternal {
    type Algorithm<'g> = MarkovClusteringExternalRun<'g, N>
    where
        Self: 'g,
        N: 'g;

    fn apply<'g>(&'g self, graph: &'g Graph<N>) -> Self::Algorithm<'g> {
        MarkovClusteringExternalRun {
            builder: self,
            graph,
            clustering: None,
        }
    }
}

/// External MCL bound to a graph
pub struct MarkovClusteringExternalRun<'g, N: Node> {
    builder: &'g MarkovClusteringExternal,
    graph: &'g Graph<N>,
    clustering: Option<Clustering<N>>,
}

impl<'g, N: Node> MarkovClusteringExternalRun<'g, N> {
    fn compute(&self) -> Result<Clustering<N>> {
        let compressed = CompressedGraph::from_graph(self.graph);
        let components = components(&compressed);
        let jobs = components.iter().filter(|c| c.len() > 1).count();
        let threads = self.builder.params.threads;
        let per_process = (threads / jobs.clamp(1, threads)).max(1);

        log::info!(
            "Running {} on {} components with {} workers, {} threads each",
            self.builder.params.path.display(),
            jobs,
            threads.min(jobs.max(1)),
            per_process
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|error| Error::ExternalToolFailure {
                message: format!("cannot start worker pool: {}", error),
                output: String::new(),
            })?;

        let partitions: Vec<Vec<Vec<usize>>> = pool.install(|| {
            components
                .par_iter()
                .map(|component| {
                    if component.len() == 1 {
                        Ok(vec![component.clone()])
                    } else {
                        self.builder.cluster_component(&compressed, component, per_process)
                    }
                })
                .collect::<Result<_>>()
        })?;

        let clusters: Vec<BTreeSet<N>> = partitions
            .into_iter()
            .flatten()
            .map(|members| members.into_iter().map(|i| compressed.node(i)).collect())
            .collect();

        log::info!("External MCL found {} clusters", clusters.len());
        Ok(Clustering::new(clusters))
    }
}

impl<'g, N: Node> ClusteringAlgorithm<N> for MarkovClusteringExternalRun<'g, N> {
    fn clustering(&mut self) -> Result<&Clustering<N>> {
        let clustering = match self.clustering.take() {
            Some(clustering) => clustering,
            None => self.compute()?,
        };
        Ok(self.clustering.insert(clustering))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Unreachable;

    impl ProcessRunner for Unreachable {
        fn run(&self, _invocation: &Invocation) -> Result<ProcessOutput> {
            panic!("no process should be launched");
        }
    }

    fn params() -> MarkovClusteringExternalParams {
        MarkovClusteringExternalParams {
            path: PathBuf::from("/opt/mcl/bin/mcl"),
            ..Default::default()
        }
    }

    #[test]
    fn validation() {
        let runner: Arc<dyn ProcessRunner> = Arc::new(Unreachable);
        let bad = [
            MarkovClusteringExternalParams {
                path: PathBuf::new(),
                ..params()
            },
            MarkovClusteringExternalParams {
                inflation: 0.5,
                ..params()
            },
            MarkovClusteringExternalParams {
                threads: 0,
                ..params()
            },
            MarkovClusteringExternalParams {
                timeout: Some(Duration::ZERO),
                ..params()
            },
            MarkovClusteringExternalParams {
                scratch_dir: PathBuf::from("/definitely/not/a/directory"),
                ..params()
            },
        ];
        for params in bad {
            assert!(matches!(
                MarkovClusteringExternal::with_runner(params, runner.clone()),
                Err(Error::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn system_runner_requires_existing_executable() {
        assert!(matches!(
            MarkovClusteringExternal::new(params()),
            Err(Error::InvalidConfiguration { name: "path", .. })
        ));
    }

    #[test]
    fn bare_names_are_looked_up_on_path() {
        #[cfg(unix)]
        assert!(SystemProcessRunner.check(Path::new("sh")).is_ok());
        assert!(SystemProcessRunner
            .check(Path::new("watset-test-no-such-program"))
            .is_err());
        assert!(resolve(Path::new("./watset-test-no-such-program")).is_none());
    }

    #[test]
    fn isolated_vertices_need_no_process() {
        let mut graph: Graph<u32> = Graph::new();
        graph.add_node(1);
        graph.add_node(2);

        let mcl = MarkovClusteringExternal::with_runner(params(), Arc::new(Unreachable)).unwrap();
        let clustering = mcl.cluster(&graph).unwrap();
        assert_eq!(clustering.len(), 2);
    }

    #[test]
    fn invocation_display_and_lookup() {
        let invocation = Invocation {
            program: PathBuf::from("mcl"),
            args: vec!["in.abc".into(), "-o".into(), "out.txt".into()],
            timeout: None,
            scratch_dir: std::env::temp_dir(),
        };
        assert_eq!(invocation.to_string(), "mcl in.abc -o out.txt");
        assert_eq!(invocation.arg_after("-o"), Some(Path::new("out.txt")));
        assert_eq!(invocation.arg_after("-I"), None);
    }
}
