pub mod buckets;
pub mod collector;
pub mod error;
pub mod exposition;

pub type Result<T> = std::result::Result<T, error::Error>;
pub use buckets::{estimate_quantile, normalize, Bucket, BucketsExt, NormalizedBuckets};
pub use error::{Error, MalformedHistogram, QuantileError};
