use miette::Diagnostic;
use thiserror::Error;
use tokio::task;

#[derive(Debug, Error, Diagnostic)]
pub enum HistqError {
    #[error("core error")]
    #[diagnostic(help("check the metric name and label values"))]
    Core(#[from] histq_core::Error),

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("report error")]
    #[diagnostic(help("input files may be JSON, CSV or Prometheus text; pass --input-format if the extension is ambiguous"))]
    Report(#[from] histq_report::Error),

    #[error("tokio task join error")]
    TaskJoin(#[from] task::JoinError),
}
