//! kmknn CLI - run neighbour searches over matrix files

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kmknn::storage::{read_matrix, write_matrix};
use kmknn::{
    validate_k, Dataset, DistanceMetric, IndexBase, KmknnIndex, KmknnParams, NeighborLists,
    SearchOptions, Seeding,
};

#[derive(Parser)]
#[command(name = "kmknn")]
#[command(about = "Exact nearest-neighbour search with k-means clustering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    Euclidean,
    Manhattan,
}

impl From<Metric> for DistanceMetric {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Euclidean => DistanceMetric::Euclidean,
            Metric::Manhattan => DistanceMetric::Manhattan,
        }
    }
}

/// Index build and output flags shared by every search
#[derive(Args)]
struct BuildArgs {
    /// Reference matrix file
    reference: PathBuf,

    /// Number of clusters (default: ceil(sqrt(n)))
    #[arg(long)]
    clusters: Option<usize>,

    /// Maximum k-means relocation rounds
    #[arg(long, default_value_t = kmknn::index::clustered::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Use k-means++ seeding with this seed instead of strided seeding
    #[arg(long)]
    seed: Option<u64>,

    /// Distance metric
    #[arg(long, value_enum, default_value_t = Metric::Euclidean)]
    metric: Metric,

    /// Report 1-based indices
    #[arg(long)]
    one_based: bool,

    /// Omit distances from the output
    #[arg(long)]
    no_distance: bool,
}

impl BuildArgs {
    fn params(&self) -> KmknnParams {
        let seeding = match self.seed {
            Some(seed) => Seeding::PlusPlus { seed },
            None => Seeding::Strided,
        };

        KmknnParams {
            num_clusters: self.clusters,
            max_iterations: self.max_iterations,
            seeding,
            metric: self.metric.into(),
        }
    }

    fn base(&self) -> IndexBase {
        if self.one_based {
            IndexBase::One
        } else {
            IndexBase::Zero
        }
    }

    fn options(&self) -> SearchOptions {
        SearchOptions::default().with_report_distance(!self.no_distance)
    }

    /// Options for a find-mode search, with `subset` read in this base
    fn find_options(&self, index: &KmknnIndex, subset: Option<&[usize]>) -> kmknn::Result<SearchOptions> {
        let mut options = self.options();
        if let Some(subset) = subset {
            options.subset = Some(self.base().subset_to_zero_based(subset, index.len())?);
        }
        Ok(options)
    }

    fn build(&self) -> kmknn::Result<KmknnIndex> {
        let reference = read_matrix(&self.reference)?;
        let start = Instant::now();
        let index = KmknnIndex::build(reference, &self.params())?;
        info!(elapsed = ?start.elapsed(), "index ready");
        Ok(index)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// k nearest neighbours of every reference point
    FindKnn {
        #[command(flatten)]
        build: BuildArgs,

        /// Number of neighbours
        #[arg(short, long, allow_negative_numbers = true)]
        k: i64,

        /// Only report the last N neighbours of each list
        #[arg(long)]
        last: Option<usize>,

        /// Only search these reference points (comma-separated, in the output base)
        #[arg(long, value_delimiter = ',')]
        subset: Option<Vec<usize>>,
    },
    /// k nearest reference points of every query point
    QueryKnn {
        #[command(flatten)]
        build: BuildArgs,

        /// Query matrix file
        query: PathBuf,

        /// Number of neighbours
        #[arg(short, long, allow_negative_numbers = true)]
        k: i64,

        /// Only report the last N neighbours of each list
        #[arg(long)]
        last: Option<usize>,
    },
    /// Reference points within a radius of every reference point
    FindNeighbors {
        #[command(flatten)]
        build: BuildArgs,

        /// Search radius
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: f64,

        /// Only search these reference points (comma-separated, in the output base)
        #[arg(long, value_delimiter = ',')]
        subset: Option<Vec<usize>>,
    },
    /// Reference points within a radius of every query point
    QueryNeighbors {
        #[command(flatten)]
        build: BuildArgs,

        /// Query matrix file
        query: PathBuf,

        /// Search radius
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: f64,
    },
    /// Write a random matrix file
    Generate {
        /// Output file
        output: PathBuf,

        /// Dimension of points
        #[arg(short, long, default_value_t = 16)]
        dim: usize,

        /// Number of points
        #[arg(short, long, default_value_t = 1000)]
        num: usize,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> kmknn::Result<()> {
    match command {
        Commands::FindKnn { build, k, last, subset } => {
            let k = validate_k(k)?;
            let index = build.build()?;
            let mut options = build.find_options(&index, subset.as_deref())?;
            options.last = last;
            let lists = kmknn::find_knn(&index, k, &options)?;
            print_lists(lists.with_base(build.base()));
        }
        Commands::QueryKnn { build, query, k, last } => {
            let k = validate_k(k)?;
            let index = build.build()?;
            let queries = read_matrix(&query)?;
            let mut options = build.options();
            options.last = last;
            let lists = kmknn::query_knn(&index, &queries, k, &options)?;
            print_lists(lists.with_base(build.base()));
        }
        Commands::FindNeighbors { build, threshold, subset } => {
            let index = build.build()?;
            let options = build.find_options(&index, subset.as_deref())?;
            let lists = kmknn::find_neighbors(&index, threshold, &options)?;
            print_lists(lists.with_base(build.base()));
        }
        Commands::QueryNeighbors { build, query, threshold } => {
            let index = build.build()?;
            let queries = read_matrix(&query)?;
            let lists = kmknn::query_neighbors(&index, &queries, threshold, &build.options())?;
            print_lists(lists.with_base(build.base()));
        }
        Commands::Generate { output, dim, num, seed } => {
            generate(&output, dim, num, seed)?;
        }
    }
    Ok(())
}

fn generate(output: &Path, dim: usize, num: usize, seed: u64) -> kmknn::Result<()> {
    info!(num, dim, "generating random points");

    let mut rng = StdRng::seed_from_u64(seed);
    let values: Vec<f64> = (0..num * dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let points = Dataset::from_row_major(values, dim)?;

    write_matrix(output, &points)?;
    info!(path = %output.display(), "wrote matrix");
    Ok(())
}

/// One line per searched point: `i: idx[:dist] idx[:dist] ...`
fn print_lists(lists: NeighborLists) {
    for i in 0..lists.len() {
        let indices = lists.indices.as_ref().map(|all| &all[i]);
        let distances = lists.distances.as_ref().map(|all| &all[i]);

        let entries: Vec<String> = match (indices, distances) {
            (Some(idx), Some(dist)) => idx
                .iter()
                .zip(dist.iter())
                .map(|(i, d)| format!("{}:{:.6}", i, d))
                .collect(),
            (Some(idx), None) => idx.iter().map(|i| i.to_string()).collect(),
            (None, Some(dist)) => dist.iter().map(|d| format!("{:.6}", d)).collect(),
            (None, None) => Vec::new(),
        };

        println!("{}: {}", i, entries.join(" "));
    }
}
