mod common;
mod estimate;
mod histq_subcommand;
mod report;
mod simulate;

use clap::Parser;

pub use estimate::estimate;
pub use histq_subcommand::HistqSubcommand;
pub use report::report;
pub use simulate::simulate;

#[derive(Parser, Debug)]
#[command(name = "histq", version, about = "Quantile estimates from cumulative histogram buckets")]
pub struct HistqCli {
    #[command(subcommand)]
    pub command: HistqSubcommand,
}

impl HistqCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histq_report::command::OutputFormat;
    use histq_report::series::InputFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_comma_separated_and_repeated_quantiles() {
        let cli = HistqCli::parse_from(["histq", "estimate", "-f", "b.json", "-q", "0.5,0.9", "-q", "-1"]);
        let HistqSubcommand::Estimate { args } = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.quantiles.quantiles, vec![0.5, 0.9, -1.0]);
        assert_eq!(args.quantiles.scale, 1000.0);
        assert!(args.input.input_format.is_none());
    }

    #[test]
    fn parses_report_formats() {
        let cli = HistqCli::parse_from([
            "histq",
            "report",
            "-f",
            "metrics.txt",
            "--input-format",
            "prom",
            "--format",
            "csv",
            "-m",
            "ping_process",
        ]);
        let HistqSubcommand::Report { args } = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.input.input_format, Some(InputFormat::Prom));
        assert_eq!(args.input.metric.as_deref(), Some("ping_process"));
        assert_eq!(args.quantiles.quantiles, vec![0.5, 0.9, 0.99]);
    }

    #[test]
    fn estimate_tolerates_undefined_series() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::with_suffix(".csv")?;
        file.write_all(b"series,upper_bound,count\nok,0.1,3\nok,+Inf,4\nidle,+Inf,0\nidle,1,0\nbroken,1,2\n")?;
        file.flush()?;
        let path = file.path().to_string_lossy().into_owned();

        let cli = HistqCli::parse_from(["histq", "estimate", "-f", path.as_str()]);
        let HistqSubcommand::Estimate { args } = cli.command else {
            panic!("expected estimate");
        };
        estimate(&args)?;
        Ok(())
    }
}
