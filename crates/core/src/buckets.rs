//! This module provides functionality for estimating quantiles from a set of cumulative histogram buckets.
//!
//! Estimation happens in two steps:
//!
//! - [`normalize`] sorts the buckets by upper bound, merges buckets that share a bound and repairs
//!   non-monotonic counts by clamping each count up to the running maximum (the "envelope").
//! - [`NormalizedBuckets::quantile`] binary-searches the normalized counts for the bucket holding the
//!   target rank and interpolates linearly inside it.
//!
//! Results that cannot be computed (malformed input, zero observations) are reported through
//! [`QuantileError`] rather than as a NaN, so callers can tell "no answer" apart from a literal infinity.

use crate::error::{MalformedHistogram, QuantileError};
use serde::{Deserialize, Serialize};
use std::num::ParseFloatError;
use tracing::debug;

/// A single cumulative bucket: the number of observations less than or equal to `upper_bound`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(with = "serde_bound")]
    pub upper_bound: f64,
    pub count: f64,
}

impl Bucket {
    pub fn new(upper_bound: f64, count: f64) -> Self {
        Self { upper_bound, count }
    }

    /// The terminal bucket holding the total observation count.
    pub fn inf(count: f64) -> Self {
        Self::new(f64::INFINITY, count)
    }

    pub fn is_inf(&self) -> bool {
        self.upper_bound == f64::INFINITY
    }
}

impl From<(f64, f64)> for Bucket {
    fn from((upper_bound, count): (f64, f64)) -> Self {
        Self::new(upper_bound, count)
    }
}

impl From<(f64, u64)> for Bucket {
    fn from((upper_bound, count): (f64, u64)) -> Self {
        Self::new(upper_bound, count as f64)
    }
}

/// Parses a bucket bound, accepting the Prometheus spelling of infinity.
pub fn parse_bound(value: &str) -> Result<f64, ParseFloatError> {
    match value.trim() {
        "+Inf" | "Inf" | "+inf" | "inf" => Ok(f64::INFINITY),
        "-Inf" | "-inf" => Ok(f64::NEG_INFINITY),
        other => other.parse(),
    }
}

/// Serde helpers for values that may be infinite. JSON has no infinity, so `±inf` is written as
/// `"+Inf"`/`"-Inf"`; every other value is a plain number.
pub mod serde_bound {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *value == f64::INFINITY {
            serializer.serialize_str("+Inf")
        } else if *value == f64::NEG_INFINITY {
            serializer.serialize_str("-Inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBound {
        Number(f64),
        Text(String),
    }

    impl RawBound {
        fn into_f64<E: de::Error>(self) -> Result<f64, E> {
            match self {
                RawBound::Number(value) => Ok(value),
                RawBound::Text(text) => super::parse_bound(&text)
                    .map_err(|e| E::custom(format!("invalid bound '{text}': {e}"))),
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        RawBound::deserialize(deserializer)?.into_f64()
    }

    /// Same encoding for optional values; `None` is `null`.
    pub mod option {
        use super::RawBound;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<f64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<f64>, D::Error> {
            Option::<RawBound>::deserialize(deserializer)?
                .map(RawBound::into_f64)
                .transpose()
        }
    }
}

/// A bucket list that satisfies every precondition of the quantile search:
/// sorted by bound, no duplicate bounds, non-decreasing counts, at least two buckets and a terminal +Inf bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBuckets(Vec<Bucket>);

impl NormalizedBuckets {
    pub fn as_slice(&self) -> &[Bucket] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Bucket> {
        self.0
    }

    /// The count of the +Inf bucket.
    pub fn total_observations(&self) -> f64 {
        // non-empty by construction
        self.0.last().map(|b| b.count).unwrap_or_default()
    }

    /// Estimates the `q`-quantile.
    ///
    /// `q` below 0 yields negative infinity and `q` above 1 yields positive infinity.
    pub fn quantile(&self, q: f64) -> Result<f64, QuantileError> {
        if let Some(saturated) = saturate(q)? {
            return Ok(saturated);
        }
        self.locate(q)
    }

    fn locate(&self, q: f64) -> Result<f64, QuantileError> {
        let buckets = &self.0;
        let last = buckets.len() - 1;
        let observations = buckets[last].count;
        if observations == 0.0 {
            return Err(QuantileError::NoObservations);
        }

        let mut rank = q * observations;
        // lower bound over the finite buckets only
        let b = buckets[..last].partition_point(|bucket| bucket.count < rank);

        if b == last {
            // rank falls inside the +Inf bucket; the highest finite bound is the best we know
            return Ok(buckets[last - 1].upper_bound);
        }
        if b == 0 && buckets[0].upper_bound <= 0.0 {
            return Ok(buckets[0].upper_bound);
        }

        let bucket_end = buckets[b].upper_bound;
        let mut bucket_start = 0.0;
        let mut count = buckets[b].count;
        if b > 0 {
            bucket_start = buckets[b - 1].upper_bound;
            count -= buckets[b - 1].count;
            rank -= buckets[b - 1].count;
        }
        if count == 0.0 {
            // only reachable for rank 0 in an empty first bucket
            return Ok(bucket_start);
        }

        Ok(bucket_start + (bucket_end - bucket_start) * (rank / count))
    }
}

impl TryFrom<Vec<Bucket>> for NormalizedBuckets {
    type Error = MalformedHistogram;

    fn try_from(buckets: Vec<Bucket>) -> Result<Self, Self::Error> {
        normalize(buckets).map(Self)
    }
}

fn saturate(q: f64) -> Result<Option<f64>, QuantileError> {
    if q.is_nan() {
        return Err(QuantileError::InvalidQuantile);
    }
    if q < 0.0 {
        return Ok(Some(f64::NEG_INFINITY));
    }
    if q > 1.0 {
        return Ok(Some(f64::INFINITY));
    }
    Ok(None)
}

/// Sorts, coalesces and monotonically repairs a bucket list.
///
/// Fails if the list is empty, contains NaN or an infinite count, does not end in a +Inf bucket,
/// or collapses to fewer than two distinct buckets.
pub fn normalize(mut buckets: Vec<Bucket>) -> Result<Vec<Bucket>, MalformedHistogram> {
    if buckets.is_empty() {
        return Err(MalformedHistogram::Empty);
    }
    if buckets
        .iter()
        .any(|b| b.upper_bound.is_nan() || b.count.is_nan())
    {
        return Err(MalformedHistogram::NanValue);
    }
    if buckets.iter().any(|b| b.count.is_infinite()) {
        return Err(MalformedHistogram::InfiniteCount);
    }

    buckets.sort_by(|a, b| a.upper_bound.total_cmp(&b.upper_bound));
    match buckets.last() {
        Some(last) if last.is_inf() => {}
        Some(last) => return Err(MalformedHistogram::MissingInfBucket(last.upper_bound)),
        None => return Err(MalformedHistogram::Empty),
    }

    coalesce(&mut buckets);
    ensure_monotonic(&mut buckets);

    if buckets.len() < 2 {
        return Err(MalformedHistogram::TooFewBuckets(buckets.len()));
    }
    Ok(buckets)
}

/// Merges adjacent buckets with the same upper bound, summing their counts.
/// Input must be sorted.
fn coalesce(buckets: &mut Vec<Bucket>) {
    let before = buckets.len();
    buckets.dedup_by(|next, kept| {
        if next.upper_bound == kept.upper_bound {
            kept.count += next.count;
            true
        } else {
            false
        }
    });
    if buckets.len() != before {
        debug!(
            "coalesced {} duplicate bucket bound(s)",
            before - buckets.len()
        );
    }
}

/// Cumulative counts can appear to decrease when buckets are scraped non-atomically
/// (rate() over federated or partially scraped series). The only repair available
/// without raw samples is to clamp every dip up to the running maximum.
fn ensure_monotonic(buckets: &mut [Bucket]) {
    let Some(first) = buckets.first() else {
        return;
    };
    let mut max = first.count;
    let mut clamped = 0usize;
    for bucket in buckets.iter_mut().skip(1) {
        if bucket.count > max {
            max = bucket.count;
        } else if bucket.count < max {
            bucket.count = max;
            clamped += 1;
        }
    }
    if clamped > 0 {
        debug!("clamped {clamped} non-monotonic bucket count(s) to the envelope");
    }
}

/// Estimates the `q`-quantile of an owned bucket list.
pub fn estimate_quantile(q: f64, buckets: Vec<Bucket>) -> Result<f64, QuantileError> {
    if let Some(saturated) = saturate(q)? {
        return Ok(saturated);
    }
    NormalizedBuckets::try_from(buckets)?.locate(q)
}

/// Same as [`estimate_quantile`], but reports every undefined result as NaN,
/// matching Prometheus' `histogram_quantile`.
pub fn estimate_quantile_or_nan(q: f64, buckets: Vec<Bucket>) -> f64 {
    estimate_quantile(q, buckets).unwrap_or(f64::NAN)
}

pub trait BucketsExt {
    /// Normalizes a copy of the buckets; the receiver is left untouched.
    fn normalized(&self) -> Result<NormalizedBuckets, MalformedHistogram>;

    fn estimate_quantile(&self, quantile: f64) -> Result<f64, QuantileError>;

    /// Estimates several quantiles while normalizing only once.
    fn estimate_quantiles(&self, quantiles: &[f64]) -> Vec<Result<f64, QuantileError>>;
}

impl BucketsExt for [Bucket] {
    fn normalized(&self) -> Result<NormalizedBuckets, MalformedHistogram> {
        NormalizedBuckets::try_from(self.to_vec())
    }

    fn estimate_quantile(&self, quantile: f64) -> Result<f64, QuantileError> {
        estimate_quantile(quantile, self.to_vec())
    }

    fn estimate_quantiles(&self, quantiles: &[f64]) -> Vec<Result<f64, QuantileError>> {
        let normalized = self.normalized();
        quantiles
            .iter()
            .map(|&q| match saturate(q)? {
                Some(saturated) => Ok(saturated),
                None => normalized
                    .as_ref()
                    .map_err(|e| QuantileError::Malformed(*e))?
                    .locate(q),
            })
            .collect()
    }
}
