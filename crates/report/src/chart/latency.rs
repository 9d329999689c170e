use histq_core::{buckets::serde_bound, Bucket, MalformedHistogram, NormalizedBuckets};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct LatencyChart {
    buckets: NormalizedBuckets,
    scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyQuantiles {
    #[serde(with = "serde_bound::option")]
    pub p50: Option<f64>,
    #[serde(with = "serde_bound::option")]
    pub p90: Option<f64>,
    #[serde(with = "serde_bound::option")]
    pub p99: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyData {
    pub buckets: Vec<String>,
    pub counts: Vec<f64>,
    pub quantiles: LatencyQuantiles,
}

impl LatencyChart {
    /// `scale` converts bucket bounds to display units, e.g. `1000.0` for seconds to milliseconds.
    pub fn new(buckets: &[Bucket], scale: f64) -> Result<Self, MalformedHistogram> {
        Ok(Self {
            buckets: NormalizedBuckets::try_from(buckets.to_vec())?,
            scale,
        })
    }

    pub fn echart_data(&self) -> LatencyData {
        let buckets = self.buckets.as_slice();
        let labels: Vec<String> = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let lower = match i {
                    // a non-positive first bound has no zero floor below it
                    0 if b.upper_bound <= 0.0 => b.upper_bound * self.scale,
                    0 => 0.0,
                    _ => buckets[i - 1].upper_bound * self.scale,
                };
                if b.is_inf() {
                    format!("{lower} - +Inf")
                } else {
                    format!("{lower} - {}", b.upper_bound * self.scale)
                }
            })
            .collect();
        let counts: Vec<f64> = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| {
                if i == 0 {
                    b.count
                } else {
                    // normalized counts never decrease, so this is never negative
                    b.count - buckets[i - 1].count
                }
            })
            .collect();
        let quantiles = LatencyQuantiles {
            p50: self.scaled_quantile(0.5),
            p90: self.scaled_quantile(0.9),
            p99: self.scaled_quantile(0.99),
        };

        LatencyData {
            buckets: labels,
            counts,
            quantiles,
        }
    }

    fn scaled_quantile(&self, q: f64) -> Option<f64> {
        match self.buckets.quantile(q) {
            Ok(v) => Some(v * self.scale),
            Err(e) => {
                debug!("p{} undefined: {e}", q * 100.0);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_bucket_counts_come_from_the_envelope() {
        // the 0.2 bucket dips below 0.1 and is clamped up
        let buckets = [
            Bucket::new(0.1, 6.0),
            Bucket::new(0.2, 4.0),
            Bucket::new(0.5, 9.0),
            Bucket::inf(10.0),
        ];
        let data = LatencyChart::new(&buckets, 1000.0).unwrap().echart_data();
        assert_eq!(
            data.buckets,
            vec!["0 - 100", "100 - 200", "200 - 500", "500 - +Inf"]
        );
        assert_eq!(data.counts, vec![6.0, 0.0, 3.0, 1.0]);
        let p50 = data.quantiles.p50.unwrap();
        assert!((p50 - 1000.0 * 0.1 * 5.0 / 6.0).abs() < 1e-9);
        // rank 9.9 lies in the +Inf bucket
        assert_eq!(data.quantiles.p99, Some(500.0));
    }

    #[test]
    fn idle_histogram_has_no_quantiles() {
        let buckets = [Bucket::new(1.0, 0.0), Bucket::inf(0.0)];
        let data = LatencyChart::new(&buckets, 1.0).unwrap().echart_data();
        assert_eq!(data.counts, vec![0.0, 0.0]);
        assert_eq!(
            data.quantiles,
            LatencyQuantiles {
                p50: None,
                p90: None,
                p99: None
            }
        );
    }

    #[test]
    fn non_positive_first_bound_labels_itself() {
        let buckets = [
            Bucket::new(-1.0, 2.0),
            Bucket::new(1.0, 4.0),
            Bucket::inf(4.0),
        ];
        let data = LatencyChart::new(&buckets, 1000.0).unwrap().echart_data();
        assert_eq!(
            data.buckets,
            vec!["-1000 - -1000", "-1000 - 1000", "1000 - +Inf"]
        );
        // rank 1 is inside the first bucket, which reports its own bound
        assert_eq!(data.quantiles.p50, Some(-1000.0));
    }

    #[test]
    fn malformed_histogram_is_rejected() {
        assert!(LatencyChart::new(&[Bucket::new(1.0, 1.0)], 1.0).is_err());
    }
}
