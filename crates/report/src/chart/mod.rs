pub mod latency;

pub use latency::{LatencyChart, LatencyData, LatencyQuantiles};
