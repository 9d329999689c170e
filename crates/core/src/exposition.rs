//! Extracts cumulative bucket series from the Prometheus text exposition format.
//!
//! Only `<metric>_bucket` samples are read. Every distinct label set (minus `le`) becomes one series;
//! a series that appears more than once (e.g. concatenated scrapes from several sources) keeps all of
//! its buckets, and the duplicates are summed later when the buckets are normalized.

use crate::{
    buckets::{parse_bound, Bucket},
    error::ExpositionError,
};
use std::collections::BTreeMap;

/// Parses every bucket sample of `metric` found in `text`, keyed by series label set.
///
/// A series without labels is keyed by the metric name itself.
pub fn parse_buckets(
    text: &str,
    metric: &str,
) -> Result<BTreeMap<String, Vec<Bucket>>, ExpositionError> {
    let sample_name = format!("{metric}_bucket");
    let mut series = BTreeMap::<String, Vec<Bucket>>::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let Some(rest) = raw.strip_prefix(&sample_name) else {
            continue;
        };
        // guard against metrics that merely share a prefix, e.g. `foo_bucket_total`
        if !(rest.starts_with('{') || rest.starts_with(char::is_whitespace)) {
            continue;
        }

        let (labels, value_part) = if let Some(body) = rest.strip_prefix('{') {
            let (labels, consumed) = parse_labels(body, line)?;
            (labels, &body[consumed..])
        } else {
            (vec![], rest)
        };

        // sample value, optionally followed by a timestamp
        let value_str = value_part
            .split_whitespace()
            .next()
            .ok_or_else(|| ExpositionError::InvalidValue {
                line,
                value: value_part.to_owned(),
            })?;
        let count: f64 = value_str
            .parse()
            .map_err(|_| ExpositionError::InvalidValue {
                line,
                value: value_str.to_owned(),
            })?;

        let mut le = None;
        let mut series_labels = vec![];
        for (name, value) in labels {
            if name == "le" {
                le = Some(value);
            } else {
                series_labels.push((name, value));
            }
        }
        let le = le.ok_or(ExpositionError::MissingLe { line })?;
        let upper_bound =
            parse_bound(&le).map_err(|_| ExpositionError::InvalidBound { line, value: le })?;

        let key = series_key(
            metric,
            series_labels
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        );
        series
            .entry(key)
            .or_default()
            .push(Bucket::new(upper_bound, count));
    }

    Ok(series)
}

/// Key of one series: its sorted `{name="value",...}` label set, or `metric` when unlabelled.
pub(crate) fn series_key<'a>(
    metric: &str,
    labels: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut parts: Vec<String> = labels
        .into_iter()
        .map(|(name, value)| format!("{name}=\"{value}\""))
        .collect();
    if parts.is_empty() {
        return metric.to_owned();
    }
    parts.sort();
    format!("{{{}}}", parts.join(","))
}

/// Parses `name="value",...}` and returns the pairs plus the number of bytes consumed,
/// including the closing brace.
fn parse_labels(body: &str, line: usize) -> Result<(Vec<(String, String)>, usize), ExpositionError> {
    let malformed = || ExpositionError::MalformedLabels { line };
    let mut labels = vec![];
    let mut chars = body.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace() || *c == ',').is_some() {}
        match chars.peek() {
            Some((i, '}')) => return Ok((labels, i + 1)),
            None => return Err(malformed()),
            _ => {}
        }

        let mut name = String::new();
        while let Some((_, c)) = chars.next_if(|(_, c)| *c != '=') {
            name.push(c);
        }
        chars.next().ok_or_else(malformed)?; // '='
        if chars.next().map(|(_, c)| c) != Some('"') {
            return Err(malformed());
        }

        let mut value = String::new();
        loop {
            match chars.next().ok_or_else(malformed)? {
                (_, '"') => break,
                (_, '\\') => match chars.next().ok_or_else(malformed)?.1 {
                    'n' => value.push('\n'),
                    other => value.push(other),
                },
                (_, c) => value.push(c),
            }
        }
        labels.push((name.trim().to_owned(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRAPE: &str = r#"
# HELP ping_process Histogram of the ping process
# TYPE ping_process histogram
ping_process_bucket{endpoint="/ping",handler="normalPing",le="0.05"} 3
ping_process_bucket{endpoint="/ping",handler="normalPing",le="0.1"} 7
ping_process_bucket{endpoint="/ping",handler="normalPing",le="+Inf"} 7
ping_process_sum{endpoint="/ping",handler="normalPing"} 0.31
ping_process_count{endpoint="/ping",handler="normalPing"} 7
ping_process_bucket{endpoint="/pingPing",handler="heavyPing",le="0.2"} 2
ping_process_bucket{endpoint="/pingPing",handler="heavyPing",le="+Inf"} 2 1700000000000
ping_request_count 9
"#;

    #[test]
    fn groups_buckets_by_label_set() {
        let series = parse_buckets(SCRAPE, "ping_process").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series[r#"{endpoint="/ping",handler="normalPing"}"#],
            vec![
                Bucket::new(0.05, 3.0),
                Bucket::new(0.1, 7.0),
                Bucket::inf(7.0)
            ]
        );
        assert_eq!(
            series[r#"{endpoint="/pingPing",handler="heavyPing"}"#],
            vec![Bucket::new(0.2, 2.0), Bucket::inf(2.0)]
        );
    }

    #[test]
    fn unlabelled_series_uses_metric_name() {
        let text = "rpc_bucket{le=\"1\"} 1\nrpc_bucket{le=\"+Inf\"} 2\nrpc_bucket_total 5\n";
        let series = parse_buckets(text, "rpc").unwrap();
        assert_eq!(series["rpc"], vec![Bucket::new(1.0, 1.0), Bucket::inf(2.0)]);
    }

    #[test]
    fn escaped_label_values_are_unescaped() {
        let text = r#"m_bucket{path="a\"b,c",le="+Inf"} 1"#;
        let series = parse_buckets(text, "m").unwrap();
        assert!(series.contains_key(r#"{path="a"b,c"}"#));
    }

    #[test]
    fn missing_le_is_an_error() {
        let text = "m_bucket{path=\"/\"} 1";
        assert_eq!(
            parse_buckets(text, "m"),
            Err(ExpositionError::MissingLe { line: 1 })
        );
    }

    #[test]
    fn bad_values_are_reported_with_line_numbers() {
        let text = "\nm_bucket{le=\"fast\"} 1";
        assert_eq!(
            parse_buckets(text, "m"),
            Err(ExpositionError::InvalidBound {
                line: 2,
                value: "fast".to_owned()
            })
        );
        let text = "m_bucket{le=\"1\"} lots";
        assert!(matches!(
            parse_buckets(text, "m"),
            Err(ExpositionError::InvalidValue { line: 1, .. })
        ));
        let text = "m_bucket{le=\"1\" 1";
        assert!(matches!(
            parse_buckets(text, "m"),
            Err(ExpositionError::MalformedLabels { line: 1 })
        ));
    }
}
