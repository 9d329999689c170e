/// Abbreviates an observation count to a human-readable format.
pub fn abbreviate_num(num: f64) -> String {
    if num >= 1_000_000.0 {
        format!("{:.1}M", num / 1_000_000.0)
    } else if num >= 1_000.0 {
        format!("{}k", (num / 1_000.0).trunc())
    } else if num.fract() == 0.0 {
        format!("{num}")
    } else {
        format!("{num:.2}")
    }
}

/// Column label for a quantile, e.g. `0.99` -> `p99`, `0.999` -> `p99.9`.
pub fn quantile_label(q: f64) -> String {
    let pct = (q * 100.0 * 1e6).round() / 1e6;
    format!("p{pct}")
}
