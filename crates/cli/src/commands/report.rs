use histq_report::command::{self, OutputFormat, ReportOptions};
use histq_report::summary::LatencySummary;
use std::path::PathBuf;

use super::common::{InputCliArgs, QuantileCliArgs};
use crate::error::HistqError;

#[derive(Clone, Debug, clap::Args)]
pub struct ReportCliArgs {
    #[command(flatten)]
    pub input: InputCliArgs,

    #[command(flatten)]
    pub quantiles: QuantileCliArgs,

    /// Output format: json (default) or csv.
    #[arg(long, default_value = "json", value_name = "json|csv")]
    pub format: OutputFormat,

    /// Write the report to this file instead of stdout.
    #[arg(short, long)]
    pub out_file: Option<PathBuf>,
}

pub fn report(args: &ReportCliArgs) -> Result<LatencySummary, HistqError> {
    let options = ReportOptions {
        quantiles: args.quantiles.quantiles.clone(),
        scale: args.quantiles.scale,
        format: args.format,
        out_file: args.out_file.clone(),
    };
    Ok(command::report(
        &args.input.file,
        args.input.input_format,
        args.input.metric.as_deref(),
        &options,
    )?)
}
