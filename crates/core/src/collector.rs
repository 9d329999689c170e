use crate::{buckets::Bucket, exposition::series_key, Result};
use prometheus::{Encoder, HistogramOpts, HistogramVec, Registry, TextEncoder};
use std::collections::BTreeMap;
use tracing::debug;

/// Upper bounds (in seconds) used by the latency demo service.
/// Only a default; every collector takes its bounds as a parameter.
pub const DEFAULT_LATENCY_BUCKETS: [f64; 11] = [
    0.001, 0.005, 0.01, 0.02, 0.03, 0.05, 0.1, 0.2, 0.5, 1.0, 5.0,
];

/// Records latencies into a labelled Prometheus histogram on its own registry,
/// and hands them back as cumulative buckets.
#[derive(Clone)]
pub struct LatencyCollector {
    registry: Registry,
    histogram: HistogramVec,
    name: String,
}

impl LatencyCollector {
    pub fn new(name: &str, help: &str, bounds: Vec<f64>, label_names: &[&str]) -> Result<Self> {
        let registry = Registry::new();
        let histogram = HistogramVec::new(HistogramOpts::new(name, help).buckets(bounds), label_names)?;
        registry.register(Box::new(histogram.clone()))?;
        Ok(Self {
            registry,
            histogram,
            name: name.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observe(&self, label_values: &[&str], seconds: f64) -> Result<()> {
        self.histogram
            .get_metric_with_label_values(label_values)?
            .observe(seconds);
        Ok(())
    }

    /// Renders the registry in the text exposition format, as a scrape would see it.
    pub fn exposition(&self) -> Result<String> {
        let mut buf = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Cumulative buckets for every label set observed so far, including the +Inf bucket.
    /// Series are keyed the same way [`crate::exposition::parse_buckets`] keys a scrape.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<Bucket>> {
        let mut series = BTreeMap::new();
        for family in self.registry.gather() {
            if family.name() != self.name {
                continue;
            }
            for metric in family.get_metric() {
                let histogram = metric.get_histogram();
                // the +Inf bucket is implicit in the collected histogram
                let mut buckets: Vec<Bucket> = histogram
                    .get_bucket()
                    .iter()
                    .map(|b| (b.upper_bound(), b.cumulative_count()).into())
                    .collect();
                buckets.push(Bucket::inf(histogram.get_sample_count() as f64));

                let key = series_key(
                    &self.name,
                    metric.get_label().iter().map(|l| (l.name(), l.value())),
                );
                series.insert(key, buckets);
            }
        }
        debug!("collected {} series from {}", series.len(), self.name);
        series
    }
}

impl std::fmt::Debug for LatencyCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyCollector")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::BucketsExt;

    fn ping_collector() -> LatencyCollector {
        LatencyCollector::new(
            "ping_process",
            "Histogram of the ping process",
            DEFAULT_LATENCY_BUCKETS.to_vec(),
            &["endpoint", "handler"],
        )
        .unwrap()
    }

    #[test]
    fn snapshot_includes_inf_bucket_per_series() {
        let collector = ping_collector();
        for ms in [2.0, 8.0, 40.0, 90.0] {
            collector
                .observe(&["/ping", "normalPing"], ms / 1000.0)
                .unwrap();
        }
        collector.observe(&["/pingPing", "heavyPing"], 7.5).unwrap();

        let series = collector.snapshot();
        assert_eq!(series.len(), 2);

        let ping = &series[r#"{endpoint="/ping",handler="normalPing"}"#];
        assert_eq!(ping.len(), DEFAULT_LATENCY_BUCKETS.len() + 1);
        assert_eq!(ping.last(), Some(&Bucket::inf(4.0)));
        assert_eq!(ping[0], Bucket::new(0.001, 0.0));
        assert_eq!(ping[1], Bucket::new(0.005, 1.0));

        // the heavy request lands past the last finite bound
        let heavy = &series[r#"{endpoint="/pingPing",handler="heavyPing"}"#];
        assert_eq!(heavy.estimate_quantile(0.5).unwrap(), 5.0);
    }

    #[test]
    fn wrong_label_count_is_an_error() {
        let collector = ping_collector();
        assert!(collector.observe(&["/ping"], 0.1).is_err());
    }

    #[test]
    fn unobserved_collector_is_empty() {
        assert!(ping_collector().snapshot().is_empty());
    }

    #[test]
    fn snapshot_matches_scraped_exposition() {
        let collector = ping_collector();
        collector.observe(&["/ping", "normalPing"], 0.004).unwrap();
        collector.observe(&["/ping", "normalPing"], 0.25).unwrap();
        collector.observe(&["/pingPing", "heavyPing"], 0.15).unwrap();

        let scraped =
            crate::exposition::parse_buckets(&collector.exposition().unwrap(), "ping_process")
                .unwrap();
        assert_eq!(collector.snapshot(), scraped);
    }
}
