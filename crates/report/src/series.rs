use crate::{Error, Result};
use histq_core::{
    buckets::{parse_bound, Bucket},
    exposition,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::Read,
    path::{Path, PathBuf},
};
use strum::{Display, EnumString};
use tracing::debug;

/// Series name used when the input carries a single, unnamed histogram.
pub const DEFAULT_SERIES: &str = "histogram";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum InputFormat {
    Json,
    Csv,
    #[strum(to_string = "prom", serialize = "prometheus", serialize = "txt")]
    Prom,
}

impl InputFormat {
    /// Guesses the format from the file extension.
    pub fn infer(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.to_ascii_lowercase().parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    pub buckets: Vec<Bucket>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Series { series: Vec<NamedSeries> },
    Bare(Vec<Bucket>),
}

#[derive(Deserialize)]
struct CsvRow {
    #[serde(default)]
    series: Option<String>,
    upper_bound: String,
    count: f64,
}

/// Named bucket series. Inserting under an existing name appends, so series gathered
/// from several sources are summed once their buckets are normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSet {
    series: BTreeMap<String, Vec<Bucket>>,
}

impl SeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, buckets: impl IntoIterator<Item = Bucket>) {
        self.series.entry(name.into()).or_default().extend(buckets);
    }

    pub fn merge(&mut self, other: SeriesSet) {
        for (name, buckets) in other.series {
            self.insert(name, buckets);
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Bucket]> {
        self.series.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Bucket])> {
        self.series
            .iter()
            .map(|(name, buckets)| (name.as_str(), buckets.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Loads series from a file. The format is inferred from the extension when not given.
    /// `metric` restricts Prometheus input to one histogram; otherwise every histogram is read.
    pub fn load(path: &Path, format: Option<InputFormat>, metric: Option<&str>) -> Result<Self> {
        let format = format
            .or_else(|| InputFormat::infer(path))
            .ok_or_else(|| Error::UnknownInputFormat(path.to_path_buf()))?;
        debug!("loading {} as {format}", path.display());

        let set = match format {
            InputFormat::Json => Self::from_json_str(&fs::read_to_string(path)?)?,
            InputFormat::Csv => Self::from_csv_reader(fs::File::open(path)?)?,
            InputFormat::Prom => Self::from_exposition(&fs::read_to_string(path)?, metric)?,
        };
        if set.is_empty() {
            return Err(Error::NoSeries(PathBuf::from(path)));
        }
        Ok(set)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut set = Self::new();
        match serde_json::from_str(json)? {
            JsonInput::Series { series } => {
                for s in series {
                    set.insert(s.name, s.buckets);
                }
            }
            JsonInput::Bare(buckets) => set.insert(DEFAULT_SERIES, buckets),
        }
        Ok(set)
    }

    /// Reads `series,upper_bound,count` rows; the `series` column is optional.
    pub fn from_csv_reader(reader: impl Read) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut set = Self::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row?;
            let upper_bound = parse_bound(&row.upper_bound)
                .map_err(|_| Error::InvalidBound(row.upper_bound.clone()))?;
            let name = row.series.unwrap_or_else(|| DEFAULT_SERIES.to_owned());
            set.insert(name, [Bucket::new(upper_bound, row.count)]);
        }
        Ok(set)
    }

    pub fn from_exposition(text: &str, metric: Option<&str>) -> Result<Self> {
        let metrics = match metric {
            Some(metric) => BTreeSet::from([metric.to_owned()]),
            None => histogram_names(text),
        };
        let mut set = Self::new();
        for metric in metrics {
            for (key, buckets) in exposition::parse_buckets(text, &metric)? {
                let name = if key == metric {
                    key
                } else {
                    format!("{metric}{key}")
                };
                set.insert(name, buckets);
            }
        }
        Ok(set)
    }
}

impl From<BTreeMap<String, Vec<Bucket>>> for SeriesSet {
    fn from(series: BTreeMap<String, Vec<Bucket>>) -> Self {
        Self { series }
    }
}

/// Distinct names declared as `# TYPE <name> histogram`. Concatenated scrapes
/// repeat declarations, and each name must be read once.
fn histogram_names(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.trim().strip_prefix("# TYPE")?.split_whitespace();
            let name = parts.next()?;
            (parts.next()? == "histogram").then(|| name.to_owned())
        })
        .collect()
}
