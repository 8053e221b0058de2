//! geotree-bench - nearest-neighbor query benchmark.

mod dataset;

use clap::Parser;
use dataset::Entry;
use geotree::{GeoTree, NearbyOptions, TreeConfig};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const NEARBY_COUNTS: [usize; 7] = [1, 10, 50, 100, 200, 500, 1000];

#[derive(Debug, Parser)]
#[command(name = "geotree-bench", version, about = "Benchmark geotree nearest-neighbor queries")]
struct Args {
    /// Point file with `uid lon lat` rows in micro-degrees.
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Random points to generate when no file is given.
    #[arg(long, default_value_t = 100_000)]
    points: usize,

    /// Leaf split threshold (overrides the config file).
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    split: Option<u32>,

    /// Skip sorting query results.
    #[arg(long)]
    no_sort: bool,

    /// Queries per k.
    #[arg(short, long, default_value_t = 10_000)]
    queries: usize,

    /// Tree configuration TOML.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for generated points.
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

/// Logs how long a section took when dropped.
struct DurationLogger {
    start: Instant,
    msg: String,
    reqs: u64,
}

impl DurationLogger {
    fn new(msg: String) -> Self {
        info!("[begin] {}", msg);
        Self {
            start: Instant::now(),
            msg,
            reqs: 0,
        }
    }

    fn set_reqs(&mut self, reqs: u64) {
        self.reqs = reqs;
    }
}

impl Drop for DurationLogger {
    fn drop(&mut self) {
        let secs = self.start.elapsed().as_secs_f64();
        if self.reqs != 0 && secs > 0.0 {
            let rps = (self.reqs as f64 / secs) as u64;
            info!("[duration:{:.3}s][rps:{}] {}", secs, rps, self.msg);
        } else {
            info!("[duration:{:.3}s] {}", secs, self.msg);
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("geotree-bench v{}", env!("CARGO_PKG_VERSION"));
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TreeConfig::load(path)?,
        None => TreeConfig {
            split_threshold: 1000,
            ..TreeConfig::default()
        },
    };
    if let Some(split) = args.split {
        config.split_threshold = split;
    }
    info!("  Split threshold: {}", config.split_threshold);
    info!("  Max depth: {}", config.max_depth);

    let entries = match &args.file {
        Some(path) => {
            info!("start loading file {:?}", path);
            dataset::load_file(path)?
        }
        None => {
            info!("generating {} random points (seed {})", args.points, args.seed);
            dataset::random_entries(args.points, args.seed)
        }
    };
    info!("loaded {} entries", entries.len());

    let mut tree = GeoTree::with_config(&config)?;
    {
        let mut dl = DurationLogger::new(format!("inserting {} entries", entries.len()));
        dl.set_reqs(entries.len() as u64);
        for e in &entries {
            if !tree.is_valid(e.lon, e.lat) {
                error!("bad entry: ({}, {})", e.lon, e.lat);
                continue;
            }
            tree.insert(e.uid, e.lon, e.lat)?;
        }
    }
    info!(
        "inserted {} unique entries ({} leaves, depth {})",
        tree.size(),
        tree.leaf_count(),
        tree.depth()
    );

    let queries: Vec<&Entry> = entries
        .iter()
        .filter(|e| tree.is_valid(e.lon, e.lat))
        .cycle()
        .take(if tree.is_empty() { 0 } else { args.queries })
        .collect();
    let options = NearbyOptions {
        no_sort: args.no_sort,
    };

    for k in NEARBY_COUNTS {
        let mut dl = DurationLogger::new(format!(
            "running {} queries for nearby {}. [split:{}][no_sort:{}]",
            queries.len(),
            k,
            config.split_threshold,
            args.no_sort
        ));
        dl.set_reqs(queries.len() as u64);

        let expected = k.min(tree.size());
        for e in &queries {
            let nearby = tree.get_nearby(e.lon, e.lat, k, options)?;
            if nearby.len() != expected {
                warn!("query at ({}, {}) returned {} of {}", e.lon, e.lat, nearby.len(), expected);
            }
        }
    }

    Ok(())
}
