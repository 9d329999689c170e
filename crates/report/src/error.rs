use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("core error")]
    Core(#[from] histq_core::Error),

    #[error("csv error")]
    Csv(#[from] csv::Error),

    #[error("exposition parse error")]
    Exposition(#[from] histq_core::error::ExpositionError),

    #[error("invalid upper bound '{0}'")]
    InvalidBound(String),

    #[error("io error")]
    Io(#[from] io::Error),

    #[error("no bucket series found in {0}")]
    NoSeries(PathBuf),

    #[error("serde_json error")]
    SerdeJson(#[from] serde_json::Error),

    #[error("cannot infer input format of {0}; pass it explicitly")]
    UnknownInputFormat(PathBuf),
}
