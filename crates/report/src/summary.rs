use crate::chart::{LatencyChart, LatencyData};
use crate::{util::quantile_label, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use histq_core::{buckets::serde_bound, Bucket, BucketsExt};
use serde::{Deserialize, Serialize};
use std::io::Write;
use strum::Display;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SeriesStatus {
    Ok,
    /// Well formed, but nothing was observed.
    Idle,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileEstimate {
    pub quantile: f64,
    /// Scaled estimate; `None` when undefined. Saturated estimates are written as `"+Inf"`/`"-Inf"`.
    #[serde(with = "serde_bound::option")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub series: String,
    pub status: SeriesStatus,
    pub observations: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub estimates: Vec<QuantileEstimate>,
    /// Per-bucket chart data; absent for malformed series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<LatencyData>,
}

impl SeriesSummary {
    pub fn from_buckets(
        series: &str,
        buckets: &[Bucket],
        quantiles: &[f64],
        scale: f64,
    ) -> Self {
        let (status, observations, error) = match buckets.normalized() {
            Ok(n) if n.total_observations() == 0.0 => (SeriesStatus::Idle, Some(0.0), None),
            Ok(n) => (SeriesStatus::Ok, Some(n.total_observations()), None),
            Err(e) => (SeriesStatus::Malformed, None, Some(e.to_string())),
        };
        if let Some(e) = &error {
            warn!("series {series} is malformed: {e}");
        }

        let estimates = quantiles
            .iter()
            .zip(buckets.estimate_quantiles(quantiles))
            .map(|(&quantile, res)| QuantileEstimate {
                quantile,
                value: res.ok().map(|v| v * scale),
            })
            .collect();

        let chart = LatencyChart::new(buckets, scale)
            .ok()
            .map(|chart| chart.echart_data());

        Self {
            series: series.to_owned(),
            status,
            observations,
            error,
            estimates,
            chart,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub generated_at: DateTime<Utc>,
    pub quantiles: Vec<f64>,
    pub scale: f64,
    pub series: Vec<SeriesSummary>,
}

impl LatencySummary {
    pub fn write_json(&self, writer: impl Write) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// One row per series; undefined estimates are left empty.
    pub fn write_csv(&self, writer: impl Write) -> Result<()> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

        let mut header = vec![
            "series".to_owned(),
            "status".to_owned(),
            "observations".to_owned(),
        ];
        header.extend(self.quantiles.iter().map(|q| quantile_label(*q)));
        writer.write_record(&header)?;

        let opt = |v: Option<f64>| v.map(csv_value).unwrap_or_default();
        for row in &self.series {
            let mut record = vec![
                row.series.clone(),
                row.status.to_string(),
                opt(row.observations),
            ];
            record.extend(row.estimates.iter().map(|e| opt(e.value)));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn csv_value(v: f64) -> String {
    if v == f64::INFINITY {
        "+Inf".to_owned()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> LatencySummary {
        let ok = [Bucket::new(0.1, 5.0), Bucket::new(0.2, 10.0), Bucket::inf(10.0)];
        let idle = [Bucket::new(0.1, 0.0), Bucket::inf(0.0)];
        let broken = [Bucket::new(0.1, 3.0)];
        let quantiles = [0.5, 0.99];
        LatencySummary {
            generated_at: DateTime::from_timestamp(0, 0).unwrap(),
            quantiles: quantiles.to_vec(),
            scale: 1000.0,
            series: vec![
                SeriesSummary::from_buckets("broken", &broken, &quantiles, 1000.0),
                SeriesSummary::from_buckets("idle", &idle, &quantiles, 1000.0),
                SeriesSummary::from_buckets("ok", &ok, &quantiles, 1000.0),
            ],
        }
    }

    #[test]
    fn statuses_follow_normalization() {
        let s = summary();
        assert_eq!(s.series[0].status, SeriesStatus::Malformed);
        assert_eq!(
            s.series[0].error.as_deref(),
            Some("last bucket has upper bound 0.1, expected +Inf")
        );
        assert_eq!(s.series[1].status, SeriesStatus::Idle);
        assert_eq!(s.series[1].observations, Some(0.0));
        assert_eq!(s.series[2].status, SeriesStatus::Ok);
        assert_eq!(s.series[2].estimates[0].value, Some(100.0));
        assert!(s.series[1].estimates.iter().all(|e| e.value.is_none()));
        assert!(s.series[0].chart.is_none());
        assert_eq!(
            s.series[2].chart.as_ref().map(|c| c.counts.clone()),
            Some(vec![5.0, 5.0, 0.0])
        );
    }

    #[test]
    fn csv_output_leaves_undefined_cells_empty() {
        let mut out = vec![];
        summary().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "series,status,observations,p50,p99");
        assert_eq!(lines[1], "broken,malformed,,,");
        assert_eq!(lines[2], "idle,idle,0,,");
        assert!(lines[3].starts_with("ok,ok,10,100,"));
    }

    #[test]
    fn saturated_estimates_stay_distinct_from_undefined_in_json() {
        let ok = [Bucket::new(0.1, 5.0), Bucket::inf(10.0)];
        let idle = [Bucket::new(0.1, 0.0), Bucket::inf(0.0)];
        let saturated = SeriesSummary::from_buckets("ok", &ok, &[1.5, -0.5], 1000.0);
        let undefined = SeriesSummary::from_buckets("idle", &idle, &[0.5], 1000.0);

        let saturated = serde_json::to_value(&saturated.estimates).unwrap();
        let undefined = serde_json::to_value(&undefined.estimates).unwrap();
        assert_eq!(saturated[0]["value"], "+Inf");
        assert_eq!(saturated[1]["value"], "-Inf");
        assert!(undefined[0]["value"].is_null());
        assert_eq!(csv_value(f64::INFINITY), "+Inf");
    }

    #[test]
    fn json_output_round_trips() {
        let mut s = summary();
        let ok = [Bucket::new(0.1, 5.0), Bucket::inf(10.0)];
        s.series
            .push(SeriesSummary::from_buckets("saturated", &ok, &[0.5, 1.5], 1000.0));
        assert_eq!(s.series[3].estimates[1].value, Some(f64::INFINITY));

        let mut out = vec![];
        s.write_json(&mut out).unwrap();
        let parsed: LatencySummary = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, s);
    }
}
