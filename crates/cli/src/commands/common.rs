//! This file contains argument definitions shared by several subcommands.

use histq_report::command::DEFAULT_QUANTILES;
use histq_report::series::{InputFormat, SeriesSet};
use std::path::PathBuf;

use crate::error::HistqError;

#[derive(Clone, Debug, clap::Args)]
pub struct InputCliArgs {
    /// File holding the bucket series.
    #[arg(
        short,
        long,
        long_help = "File holding the bucket series: JSON (`{\"series\": [...]}` or a bare bucket array), CSV (`series,upper_bound,count`) or Prometheus text exposition."
    )]
    pub file: PathBuf,

    /// Input format; inferred from the file extension when omitted.
    #[arg(long, value_name = "json|csv|prom")]
    pub input_format: Option<InputFormat>,

    /// Histogram to read from Prometheus input.
    #[arg(
        short,
        long,
        long_help = "Histogram metric to read from Prometheus input. Every histogram in the file is read when omitted."
    )]
    pub metric: Option<String>,
}

impl InputCliArgs {
    pub fn load(&self) -> Result<SeriesSet, HistqError> {
        Ok(SeriesSet::load(
            &self.file,
            self.input_format,
            self.metric.as_deref(),
        )?)
    }
}

#[derive(Clone, Debug, clap::Args)]
pub struct QuantileCliArgs {
    /// Quantiles to estimate.
    #[arg(
        env = "HISTQ_QUANTILES",
        short,
        long = "quantile",
        long_help = "Quantiles to estimate, comma-separated or repeated. Values below 0 or above 1 saturate to -Inf/+Inf.",
        value_delimiter = ',',
        allow_negative_numbers = true,
        default_values_t = DEFAULT_QUANTILES
    )]
    pub quantiles: Vec<f64>,

    /// Multiplier applied to bucket bounds before printing.
    #[arg(
        long,
        long_help = "Multiplier applied to bucket bounds before printing. The default converts seconds to milliseconds.",
        default_value_t = 1000.0
    )]
    pub scale: f64,
}
