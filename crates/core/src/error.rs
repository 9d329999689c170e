use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("exposition parse error")]
    Exposition(#[from] ExpositionError),

    #[error("prometheus error")]
    Prometheus(#[from] prometheus::Error),

    #[error("quantile could not be estimated")]
    Quantile(#[from] QuantileError),

    #[error("exposition output is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Reasons a bucket set cannot be normalized into a usable cumulative histogram.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum MalformedHistogram {
    #[error("histogram has no buckets")]
    Empty,

    #[error("histogram contains a NaN upper bound or count")]
    NanValue,

    #[error("histogram contains an infinite count")]
    InfiniteCount,

    #[error("last bucket has upper bound {0}, expected +Inf")]
    MissingInfBucket(f64),

    #[error("histogram needs at least 2 distinct buckets, found {0}")]
    TooFewBuckets(usize),
}

/// The "undefined result" channel of a quantile estimate.
///
/// Out-of-range quantiles are not errors; they saturate to infinity.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum QuantileError {
    #[error("quantile is NaN")]
    InvalidQuantile,

    #[error("malformed histogram: {0}")]
    Malformed(#[from] MalformedHistogram),

    #[error("histogram has no observations")]
    NoObservations,
}

impl QuantileError {
    /// True when the histogram was well formed but simply empty (e.g. an idle endpoint).
    pub fn is_idle(&self) -> bool {
        matches!(self, QuantileError::NoObservations)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpositionError {
    #[error("line {line}: bucket sample is missing the `le` label")]
    MissingLe { line: usize },

    #[error("line {line}: invalid bucket bound '{value}'")]
    InvalidBound { line: usize, value: String },

    #[error("line {line}: invalid sample value '{value}'")]
    InvalidValue { line: usize, value: String },

    #[error("line {line}: malformed label set")]
    MalformedLabels { line: usize },
}
