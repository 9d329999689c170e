use histq_core::BucketsExt;
use tracing::warn;

use super::common::{InputCliArgs, QuantileCliArgs};
use crate::error::HistqError;
use crate::util::{format_estimate, highlight};

#[derive(Clone, Debug, clap::Args)]
pub struct EstimateCliArgs {
    #[command(flatten)]
    pub input: InputCliArgs,

    #[command(flatten)]
    pub quantiles: QuantileCliArgs,

    /// Only estimate this series.
    #[arg(long)]
    pub series: Option<String>,
}

/// Prints one line per series and quantile. Undefined estimates are reported, never fatal.
pub fn estimate(args: &EstimateCliArgs) -> Result<(), HistqError> {
    let set = args.input.load()?;
    let qs = &args.quantiles.quantiles;

    for (name, buckets) in set.iter() {
        if args.series.as_deref().is_some_and(|s| s != name) {
            continue;
        }
        println!("{}", highlight(name));
        for (q, res) in qs.iter().zip(buckets.estimate_quantiles(qs)) {
            if let Err(e) = &res {
                warn!("{name}: quantile {q} is undefined: {e}");
            }
            println!("  q={q}: {}", format_estimate(res, args.quantiles.scale));
        }
    }
    Ok(())
}
