use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watset::cluster::{
    Algorithm, ChineseWhispers, ChineseWhispersParams, MarkovClustering,
    MarkovClusteringExternal, MarkovClusteringExternalParams, MarkovClusteringParams, MaxMax,
    NodeWeighting, SpectralClustering, SpectralClusteringParams, Trivial,
};
use watset::config::Config;
use watset::sense::{ContextSimilarity, SenseInduction, SimplifiedWatset, Watset, WatsetParams};
use watset::{data, storage, Clustering, ClusteringBuilder, LabeledGraph};

#[derive(Parser, Debug)]
#[clap(
    name = "watset",
    about = "Word sense induction and fuzzy graph clustering"
)]
struct Cli {
    /// Path to input ABC file (source, target, weight); stdin when omitted
    #[clap(long, short, global = true)]
    input: Option<PathBuf>,

    /// Output file for clusters; stdout when omitted
    #[clap(long, short, global = true)]
    output: Option<PathBuf>,

    /// Write a JSON summary of the clustering to this file
    #[clap(long, global = true)]
    summary: Option<PathBuf>,

    /// Seed for randomized algorithms
    #[clap(long, default_value = "1337", global = true)]
    seed: u64,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0", global = true)]
    threads: usize,

    /// Iteration limit for iterative algorithms
    #[clap(long, default_value = "20", global = true)]
    iterations: usize,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// No clusters
    Empty,

    /// Every vertex in its own cluster
    Singleton,

    /// All vertices in one cluster
    Together,

    /// Connected components
    Components,

    /// Chinese Whispers
    Cw {
        /// Node weighting: top, linear, log or label
        #[clap(long, default_value = "top")]
        weighting: NodeWeighting,
    },

    /// Markov Clustering
    Mcl {
        /// Expansion power
        #[clap(long, short = 'e', default_value = "2")]
        expansion: usize,

        /// Inflation exponent
        #[clap(long, short = 'r', default_value = "2.0")]
        inflation: f64,
    },

    /// Markov Clustering through the mcl executable
    MclBin {
        /// The mcl executable, as a path or a name on PATH
        #[clap(long, default_value = "mcl")]
        bin: PathBuf,

        /// Inflation exponent
        #[clap(long, short = 'r', default_value = "2.0")]
        inflation: f64,

        /// Seconds before an mcl process is killed
        #[clap(long)]
        timeout: Option<u64>,

        /// Directory for scratch files
        #[clap(long)]
        scratch: Option<PathBuf>,
    },

    /// MaxMax soft clustering
    Maxmax,

    /// Spectral clustering
    Spectral {
        /// Number of clusters
        #[clap(long, short = 'k', default_value = "2")]
        k: usize,
    },

    /// Induce the sense inventory only
    Senses {
        /// Local algorithm for ego networks
        #[clap(long, short = 'l', default_value = "components")]
        local: String,

        /// Local algorithm option as key=value (repeatable)
        #[clap(long = "local-option", short = 'L')]
        local_options: Vec<String>,

        /// Write JSON instead of one line per sense
        #[clap(long)]
        json: bool,
    },

    /// Watset with context similarity disambiguation
    Watset {
        /// Local algorithm for ego networks
        #[clap(long, short = 'l', default_value = "components")]
        local: String,

        /// Local algorithm option as key=value (repeatable)
        #[clap(long = "local-option", short = 'L')]
        local_options: Vec<String>,

        /// Global algorithm for the sense graph
        #[clap(long, short = 'g', default_value = "cw")]
        global: String,

        /// Global algorithm option as key=value (repeatable)
        #[clap(long = "global-option", short = 'G')]
        global_options: Vec<String>,

        /// Context similarity: cosine or dummy
        #[clap(long, default_value = "cosine")]
        similarity: ContextSimilarity,

        /// Also save the sense inventory as JSON to this file
        #[clap(long)]
        senses: Option<PathBuf>,
    },

    /// Watset with membership disambiguation
    SimplifiedWatset {
        /// Local algorithm for ego networks
        #[clap(long, short = 'l', default_value = "components")]
        local: String,

        /// Local algorithm option as key=value (repeatable)
        #[clap(long = "local-option", short = 'L')]
        local_options: Vec<String>,

        /// Global algorithm for the sense graph
        #[clap(long, short = 'g', default_value = "cw")]
        global: String,

        /// Global algorithm option as key=value (repeatable)
        #[clap(long = "global-option", short = 'G')]
        global_options: Vec<String>,

        /// Also save the sense inventory as JSON to this file
        #[clap(long)]
        senses: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let config = Config::new(args.seed, args.threads, args.iterations);

    let num_threads = config.thread_count();
    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    let labeled = load_graph(args.input.as_deref())?;
    let graph = &labeled.graph;
    let label = |id: u32| labeled.label(id).to_string();

    let clustering: Clustering<u32> = match &args.command {
        Command::Senses {
            local,
            local_options,
            json,
        } => {
            let induction = SenseInduction::new(config.algorithm(local, local_options)?);
            let inventory = induction.inventory(graph)?;

            let mut writer = open_output(args.output.as_deref())?;
            if *json {
                let value = storage::inventory_json(&inventory, label);
                serde_json::to_writer_pretty(&mut writer, &value)?;
                writeln!(writer)?;
            } else {
                storage::write_senses(&mut writer, &inventory, label)?;
            }
            writer.flush()?;
            return Ok(());
        }
        Command::Watset {
            local,
            local_options,
            global,
            global_options,
            similarity,
            senses,
        } => {
            let watset = Watset::new(WatsetParams {
                local: config.algorithm(local, local_options)?,
                global: config.algorithm(global, global_options)?,
                similarity: *similarity,
            });
            let mut run = watset.apply(graph);
            let result = run.result()?;
            if let Some(path) = senses {
                storage::save_inventory(path, &result.inventory, label)?;
            }
            result.clustering.clone()
        }
        Command::SimplifiedWatset {
            local,
            local_options,
            global,
            global_options,
            senses,
        } => {
            let watset = SimplifiedWatset::new(
                config.algorithm(local, local_options)?,
                config.algorithm(global, global_options)?,
            );
            let mut run = watset.apply(graph);
            let result = run.result()?;
            if let Some(path) = senses {
                storage::save_inventory(path, &result.inventory, label)?;
            }
            result.clustering.clone()
        }
        command => build_algorithm(command, &config)?.cluster(graph)?,
    };

    log::info!("Found {} clusters", clustering.len());

    let writer = open_output(args.output.as_deref())?;
    storage::write_clusters(writer, &clustering, label)?;

    if let Some(path) = &args.summary {
        storage::save_summary(path, graph, &clustering, label)?;
    }

    Ok(())
}

/// Builder for the subcommands that run a single algorithm
fn build_algorithm(command: &Command, config: &Config) -> Result<Algorithm> {
    let algorithm: Algorithm = match command {
        Command::Empty => Trivial::Empty.into(),
        Command::Singleton => Trivial::Singleton.into(),
        Command::Together => Trivial::Together.into(),
        Command::Components => Trivial::Components.into(),
        Command::Cw { weighting } => ChineseWhispers::new(ChineseWhispersParams {
            weighting: *weighting,
            max_iterations: config.max_iterations,
            seed: config.seed,
        })?
        .into(),
        Command::Mcl {
            expansion,
            inflation,
        } => MarkovClustering::new(MarkovClusteringParams {
            expansion: *expansion,
            inflation: *inflation,
            max_iterations: config.max_iterations,
            ..Default::default()
        })?
        .into(),
        Command::MclBin {
            bin,
            inflation,
            timeout,
            scratch,
        } => MarkovClusteringExternal::new(MarkovClusteringExternalParams {
            path: bin.clone(),
            scratch_dir: scratch.clone().unwrap_or_else(std::env::temp_dir),
            inflation: *inflation,
            threads: config.thread_count(),
            timeout: timeout.map(Duration::from_secs),
        })?
        .into(),
        Command::Maxmax => MaxMax.into(),
        Command::Spectral { k } => SpectralClustering::new(SpectralClusteringParams {
            k: *k,
            max_iterations: config.max_iterations,
            seed: config.seed,
        })?
        .into(),
        Command::Senses { .. } | Command::Watset { .. } | Command::SimplifiedWatset { .. } => {
            anyhow::bail!("{:?} is not a single algorithm", command)
        }
    };

    log::info!("Running {}", algorithm);
    Ok(algorithm)
}

fn load_graph(path: Option<&Path>) -> Result<LabeledGraph> {
    match path {
        Some(path) => data::read_abc_file(path)
            .with_context(|| format!("cannot read graph from {}", path.display())),
        None => {
            log::info!("Reading graph from standard input");
            Ok(data::read_abc(io::stdin().lock())?)
        }
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}
