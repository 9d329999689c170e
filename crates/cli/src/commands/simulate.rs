use histq_core::collector::{LatencyCollector, DEFAULT_LATENCY_BUCKETS};
use histq_report::command::summarize;
use histq_report::series::SeriesSet;
use histq_report::summary::LatencySummary;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::common::QuantileCliArgs;
use crate::error::HistqError;

/// A simulated HTTP handler recording its latency into the `ping_process` histogram.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    path: &'static str,
    handler: &'static str,
    /// Added on top of the random 0-99 ms work.
    extra_delay_ms: u64,
}

const ENDPOINTS: [Endpoint; 2] = [
    Endpoint {
        path: "/ping",
        handler: "normalPing",
        extra_delay_ms: 0,
    },
    Endpoint {
        path: "/pingPing",
        handler: "heavyPing",
        extra_delay_ms: 100,
    },
];

#[derive(Clone, Debug, clap::Args)]
pub struct SimulateCliArgs {
    /// Number of requests to simulate per endpoint.
    #[arg(short, long, default_value_t = 1000)]
    pub requests: u64,

    /// Seed for the simulated latencies.
    #[arg(env = "HISTQ_SEED", short, long, default_value_t = 1)]
    pub seed: u64,

    /// Bucket upper bounds in seconds; +Inf is always added.
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_LATENCY_BUCKETS
    )]
    pub buckets: Vec<f64>,

    /// Also write the collected histogram in Prometheus text format, as a scrape would return it.
    #[arg(long)]
    pub exposition_file: Option<PathBuf>,

    #[command(flatten)]
    pub quantiles: QuantileCliArgs,
}

/// Records simulated request latencies concurrently, one task per endpoint, then summarizes them.
pub async fn simulate(args: &SimulateCliArgs) -> Result<LatencySummary, HistqError> {
    let collector = LatencyCollector::new(
        "ping_process",
        "Histogram of the ping process",
        args.buckets.clone(),
        &["endpoint", "handler"],
    )?;

    let mut tasks = JoinSet::new();
    for (i, endpoint) in ENDPOINTS.into_iter().enumerate() {
        let collector = collector.clone();
        let seed = args.seed.wrapping_add(i as u64);
        let requests = args.requests;
        tasks.spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..requests {
                let ms = rng.gen_range(0..100) + endpoint.extra_delay_ms;
                collector.observe(&[endpoint.path, endpoint.handler], ms as f64 / 1000.0)?;
                tokio::task::yield_now().await;
            }
            debug!("{} served {requests} requests", endpoint.path);
            Ok::<_, histq_core::Error>(())
        });
    }
    while let Some(res) = tasks.join_next().await {
        res??;
    }

    if let Some(path) = &args.exposition_file {
        std::fs::write(path, collector.exposition()?)?;
        info!("wrote exposition to {}", path.display());
    }

    let series = SeriesSet::from(collector.snapshot());
    info!(
        "simulated {} requests across {} endpoints",
        args.requests * ENDPOINTS.len() as u64,
        series.len()
    );
    let summary = summarize(&series, &args.quantiles.quantiles, args.quantiles.scale);
    println!("{}", crate::util::summary_table(&summary));
    Ok(summary)
}
