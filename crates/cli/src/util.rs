use histq_report::{summary::LatencySummary, util::abbreviate_num, util::quantile_label};
use nu_ansi_term::Color;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so that report output on stdout stays machine-readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn highlight(msg: impl AsRef<str>) -> String {
    Color::Rgb(252, 186, 3).bold().paint(msg.as_ref()).to_string()
}

/// Formats an estimate for display; undefined results print as `NaN` with the reason.
pub fn format_estimate(value: Result<f64, histq_core::QuantileError>, scale: f64) -> String {
    match value {
        Ok(v) if v.is_infinite() => {
            if v > 0.0 {
                "+Inf".to_owned()
            } else {
                "-Inf".to_owned()
            }
        }
        Ok(v) => format!("{:.3}", v * scale),
        Err(e) => format!("NaN ({e})"),
    }
}

/// Renders a summary as an aligned text table.
pub fn summary_table(summary: &LatencySummary) -> String {
    let mut header = vec!["series".to_owned(), "obs".to_owned()];
    header.extend(summary.quantiles.iter().map(|q| quantile_label(*q)));

    let rows: Vec<Vec<String>> = summary
        .series
        .iter()
        .map(|s| {
            let mut row = vec![
                s.series.clone(),
                s.observations
                    .map(abbreviate_num)
                    .unwrap_or_else(|| s.status.to_string()),
            ];
            row.extend(s.estimates.iter().map(|e| match e.value {
                Some(v) => format!("{v:.3}"),
                None => "-".to_owned(),
            }));
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            rows.iter()
                .map(|r| r[col].len())
                .chain([header[col].len()])
                .max()
                .unwrap_or_default()
        })
        .collect();
    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    let mut out = vec![render(&header)];
    out.extend(rows.iter().map(|r| render(r)));
    out.join("\n")
}
