use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use watset::cluster::{
    Invocation, MarkovClusteringExternal, MarkovClusteringExternalParams, ProcessOutput,
    ProcessRunner,
};
use watset::{ClusteringBuilder, Error, Graph, Result};

#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Report every component as a single cluster
    Lump,
    /// Exit with a non-zero status
    Fail,
    /// Write something that is not a cluster list
    Garbage,
    /// Leave one vertex out of the output
    Incomplete,
}

/// Stands in for the `mcl` executable
#[derive(Debug)]
struct FakeMcl {
    behavior: Behavior,
    invocations: Mutex<Vec<Invocation>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeMcl {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            invocations: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Most launches in flight at the same time
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn respond(&self, invocation: &Invocation) -> Result<ProcessOutput> {

        let input = fs::read_to_string(Path::new(&invocation.args[0]))?;
        let ids: BTreeSet<&str> = input
            .lines()
            .flat_map(|line| line.split('\t').take(2))
            .collect();
        let output = invocation.arg_after("-o").unwrap();

        let success = ProcessOutput {
            success: true,
            code: Some(0),
            ..Default::default()
        };

        match self.behavior {
            Behavior::Lump => {
                let line = ids.into_iter().collect::<Vec<_>>().join("\t");
                fs::write(output, format!("{}\n", line))?;
                Ok(success)
            }
            Behavior::Fail => Ok(ProcessOutput {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr: "boom".to_string(),
            }),
            Behavior::Garbage => {
                fs::write(output, "[mcl] jury pruning marks\n")?;
                Ok(success)
            }
            Behavior::Incomplete => {
                let first = ids.into_iter().next().unwrap_or("0");
                fs::write(output, format!("{}\n", first))?;
                Ok(success)
            }
        }
    }
}

impl ProcessRunner for FakeMcl {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.invocations.lock().unwrap().push(invocation.clone());

        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        let result = self.respond(invocation);
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn threads_flag(invocation: &Invocation) -> String {
    invocation.arg_after("-te").unwrap().to_string_lossy().into_owned()
}

/// Two triangles and an isolated vertex
fn graph() -> Graph<&'static str> {
    let mut graph = Graph::new();
    for (a, b) in [("a", "b"), ("b", "c"), ("a", "c"), ("x", "y"), ("y", "z"), ("x", "z")] {
        graph.add_edge(a, b, 1.0);
    }
    graph.add_node("lonely");
    graph
}

fn params(scratch: &Path) -> MarkovClusteringExternalParams {
    MarkovClusteringExternalParams {
        path: PathBuf::from("/usr/local/bin/mcl"),
        scratch_dir: scratch.to_path_buf(),
        threads: 2,
        ..Default::default()
    }
}

fn is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn one_launch_per_component() {
    let scratch = tempfile::tempdir().unwrap();
    let runner = FakeMcl::new(Behavior::Lump);
    let mcl = MarkovClusteringExternal::with_runner(params(scratch.path()), runner.clone()).unwrap();

    let clustering = mcl.cluster(&graph()).unwrap();
    let clusters: BTreeSet<BTreeSet<&str>> = clustering.into_inner().into_iter().collect();
    assert_eq!(
        clusters,
        BTreeSet::from([
            BTreeSet::from(["a", "b", "c"]),
            BTreeSet::from(["x", "y", "z"]),
            BTreeSet::from(["lonely"]),
        ])
    );

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 2);
    for invocation in &invocations {
        let args: Vec<String> = invocation
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        // two components share the two workers
        assert_eq!(&args[1..6], ["-I", "2", "-te", "1", "--abc"]);
        assert_eq!(args[6], "-o");
        assert_eq!(invocation.timeout, None);
    }

    assert!(is_empty(scratch.path()));
}

#[test]
fn concurrent_launches_respect_the_worker_budget() {
    let mut graph = Graph::new();
    for pair in 0..6u32 {
        graph.add_edge(2 * pair, 2 * pair + 1, 1.0);
    }

    let scratch = tempfile::tempdir().unwrap();
    let runner = FakeMcl::new(Behavior::Lump);
    let mcl = MarkovClusteringExternal::with_runner(params(scratch.path()), runner.clone()).unwrap();

    let clustering = mcl.cluster(&graph).unwrap();
    assert_eq!(clustering.len(), 6);
    assert!(clustering.is_partition_of(&graph));

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 6);
    assert!(runner.peak() <= 2, "{} launches overlapped", runner.peak());
    for invocation in &invocations {
        assert_eq!(threads_flag(invocation), "1");
    }
}

#[test]
fn a_single_component_gets_every_thread() {
    let mut graph = Graph::new();
    for (a, b) in [(0u32, 1u32), (1, 2), (2, 3)] {
        graph.add_edge(a, b, 1.0);
    }

    let scratch = tempfile::tempdir().unwrap();
    let runner = FakeMcl::new(Behavior::Lump);
    let mcl = MarkovClusteringExternal::with_runner(
        MarkovClusteringExternalParams {
            threads: 4,
            ..params(scratch.path())
        },
        runner.clone(),
    )
    .unwrap();

    assert_eq!(mcl.cluster(&graph).unwrap().len(), 1);
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(threads_flag(&invocations[0]), "4");
    assert_eq!(invocations[0].scratch_dir, scratch.path());
}

#[test]
fn failures_surface_as_external_tool_errors() {
    for behavior in [Behavior::Fail, Behavior::Garbage, Behavior::Incomplete] {
        let scratch = tempfile::tempdir().unwrap();
        let mcl = MarkovClusteringExternal::with_runner(
            params(scratch.path()),
            FakeMcl::new(behavior),
        )
        .unwrap();

        match mcl.cluster(&graph()) {
            Err(Error::ExternalToolFailure { message, output }) => {
                if let Behavior::Fail = behavior {
                    assert!(message.contains("status 1"), "{}", message);
                    assert_eq!(output, "boom");
                }
            }
            other => panic!("{:?}: expected a tool failure, got {:?}", behavior, other),
        }

        assert!(is_empty(scratch.path()), "{:?} left scratch files", behavior);
    }
}

#[cfg(unix)]
mod scripts {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Instant;

    /// Writing and executing scripts concurrently can hit ETXTBSY
    static SERIAL: Mutex<()> = Mutex::new(());

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("mcl");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn triangle() -> Graph<u32> {
        let mut graph = Graph::new();
        graph.add_edge(1, 2, 1.0);
        graph.add_edge(2, 3, 2.0);
        graph.add_edge(1, 3, 1.0);
        graph
    }

    #[test]
    fn reads_clusters_written_by_the_process() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let mcl = MarkovClusteringExternal::new(MarkovClusteringExternalParams {
            path: script(bin.path(), r#"printf '0\t1\t2\n' > "$8""#),
            scratch_dir: scratch.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let clustering = mcl.cluster(&triangle()).unwrap();
        assert_eq!(clustering.clusters(), [BTreeSet::from([1, 2, 3])]);
        assert!(is_empty(scratch.path()));
    }

    #[test]
    fn non_zero_exit_is_reported_with_output() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let mcl = MarkovClusteringExternal::new(MarkovClusteringExternalParams {
            path: script(bin.path(), "echo oops >&2\nexit 3"),
            scratch_dir: scratch.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        match mcl.cluster(&triangle()) {
            Err(Error::ExternalToolFailure { message, output }) => {
                assert!(message.contains("status 3"), "{}", message);
                assert!(output.contains("oops"), "{}", output);
            }
            other => panic!("expected a tool failure, got {:?}", other),
        }
        assert!(is_empty(scratch.path()));
    }

    #[test]
    fn output_that_is_not_utf8_is_kept() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let mcl = MarkovClusteringExternal::new(MarkovClusteringExternalParams {
            path: script(bin.path(), r"printf 'bad \377 byte\n' >&2
exit 1"),
            scratch_dir: scratch.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        match mcl.cluster(&triangle()) {
            Err(Error::ExternalToolFailure { output, .. }) => {
                assert!(output.contains("bad"), "{:?}", output);
                assert!(output.contains("byte"), "{:?}", output);
            }
            other => panic!("expected a tool failure, got {:?}", other),
        }
    }

    #[test]
    fn slow_process_is_killed() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let limit = Duration::from_millis(200);
        let mcl = MarkovClusteringExternal::new(MarkovClusteringExternalParams {
            // the shell's sleep outlives the kill and keeps its output handles
            path: script(bin.path(), "sleep 10"),
            scratch_dir: scratch.path().to_path_buf(),
            timeout: Some(limit),
            ..Default::default()
        })
        .unwrap();

        let started = Instant::now();
        match mcl.cluster(&triangle()) {
            Err(Error::Timeout { limit: reported }) => assert_eq!(reported, limit),
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
        assert!(is_empty(scratch.path()));
    }
}
