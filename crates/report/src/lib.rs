pub mod chart;
pub mod command;
pub mod error;
pub mod series;
pub mod summary;
pub mod util;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
