use crate::series::{InputFormat, SeriesSet};
use crate::summary::{LatencySummary, SeriesSummary};
use crate::Result;
use chrono::Utc;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tracing::{debug, info};

pub const DEFAULT_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub quantiles: Vec<f64>,
    /// Multiplier applied to bucket bounds, e.g. `1000.0` to report seconds as milliseconds.
    pub scale: f64,
    pub format: OutputFormat,
    /// Writes to stdout when unset.
    pub out_file: Option<PathBuf>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            quantiles: DEFAULT_QUANTILES.to_vec(),
            scale: 1000.0,
            format: OutputFormat::default(),
            out_file: None,
        }
    }
}

/// Estimates the configured quantiles for every series.
pub fn summarize(series: &SeriesSet, quantiles: &[f64], scale: f64) -> LatencySummary {
    LatencySummary {
        generated_at: Utc::now(),
        quantiles: quantiles.to_vec(),
        scale,
        series: series
            .iter()
            .map(|(name, buckets)| SeriesSummary::from_buckets(name, buckets, quantiles, scale))
            .collect(),
    }
}

/// Loads bucket series from `input`, summarizes them and writes the summary.
pub fn report(
    input: &Path,
    input_format: Option<InputFormat>,
    metric: Option<&str>,
    options: &ReportOptions,
) -> Result<LatencySummary> {
    let series = SeriesSet::load(input, input_format, metric)?;
    debug!("loaded {} series from {}", series.len(), input.display());

    let summary = summarize(&series, &options.quantiles, options.scale);
    match &options.out_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            info!("exporting {} report to {}", options.format, path.display());
            write_summary(&summary, options.format, fs::File::create(path)?)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_summary(&summary, options.format, &mut lock)?;
            writeln!(lock)?;
        }
    }
    Ok(summary)
}

fn write_summary(summary: &LatencySummary, format: OutputFormat, writer: impl Write) -> Result<()> {
    match format {
        OutputFormat::Json => summary.write_json(writer),
        OutputFormat::Csv => summary.write_csv(writer),
    }
}
