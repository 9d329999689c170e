use clap::Subcommand;

use super::estimate::EstimateCliArgs;
use super::report::ReportCliArgs;
use super::simulate::SimulateCliArgs;

#[derive(Debug, Subcommand)]
pub enum HistqSubcommand {
    #[command(
        name = "estimate",
        long_about = "Estimate quantiles of every bucket series in a file."
    )]
    Estimate {
        #[command(flatten)]
        args: Box<EstimateCliArgs>,
    },

    #[command(
        name = "report",
        long_about = "Export a latency quantile summary for every bucket series in a file."
    )]
    Report {
        #[command(flatten)]
        args: Box<ReportCliArgs>,
    },

    #[command(
        name = "simulate",
        long_about = "Record simulated request latencies into a Prometheus histogram and summarize them."
    )]
    Simulate {
        #[command(flatten)]
        args: Box<SimulateCliArgs>,
    },
}
