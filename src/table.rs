use crate::error::{Error, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One benchmark measurement, as written by the benchmark harness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(rename = "key_path", alias = "dataset")]
    pub dataset: String,
    pub index_type: String,
    #[serde(default)]
    pub read_ratio: f64,
    #[serde(default)]
    pub insert_ratio: f64,
    #[serde(default)]
    pub update_ratio: f64,
    #[serde(default)]
    pub scan_ratio: f64,
    #[serde(default)]
    pub delete_ratio: f64,
    pub throughput: f64,
    #[serde(default)]
    pub init_table_size: f64,
    #[serde(default)]
    pub memory_consumption: f64,
    #[serde(default = "default_thread_num")]
    pub thread_num: u32,
    #[serde(rename = "min", default)]
    pub latency_min: f64,
    #[serde(rename = "50 percentile", default)]
    pub latency_p50: f64,
    #[serde(rename = "90 percentile", default)]
    pub latency_p90: f64,
    #[serde(rename = "99 percentile", default)]
    pub latency_p99: f64,
    #[serde(rename = "99.9 percentile", default)]
    pub latency_p999: f64,
    #[serde(rename = "99.99 percentile", default)]
    pub latency_p9999: f64,
    #[serde(rename = "max", default)]
    pub latency_max: f64,
    #[serde(rename = "avg", default)]
    pub latency_avg: f64,
    #[serde(default)]
    pub scan_num: u32,
    #[serde(default)]
    pub latency_variance: f64,
    #[serde(default)]
    pub error_bound: f64,
    #[serde(default)]
    pub table_size: f64,
    /// Local hardness (PLA segment count at the local error bound)
    #[serde(rename = "pgm", default)]
    pub hardness: Option<f64>,
    /// Global hardness (PLA segment count at the global error bound)
    #[serde(rename = "pgm_global", default)]
    pub global_hardness: Option<f64>,
}

fn default_thread_num() -> u32 {
    1
}

// Same defaults as a CSV row with only the required columns
impl Default for Measurement {
    fn default() -> Self {
        Self {
            dataset: String::new(),
            index_type: String::new(),
            read_ratio: 0.0,
            insert_ratio: 0.0,
            update_ratio: 0.0,
            scan_ratio: 0.0,
            delete_ratio: 0.0,
            throughput: 0.0,
            init_table_size: 0.0,
            memory_consumption: 0.0,
            thread_num: default_thread_num(),
            latency_min: 0.0,
            latency_p50: 0.0,
            latency_p90: 0.0,
            latency_p99: 0.0,
            latency_p999: 0.0,
            latency_p9999: 0.0,
            latency_max: 0.0,
            latency_avg: 0.0,
            scan_num: 0,
            latency_variance: 0.0,
            error_bound: 0.0,
            table_size: 0.0,
            hardness: None,
            global_hardness: None,
        }
    }
}

/// Strip the directory and harness artifacts from a dataset path
pub fn clean_dataset_name(raw: &str) -> String {
    let name = raw.rsplit('/').next().unwrap_or(raw);
    let name = name.strip_suffix('|').unwrap_or(name);
    if name == "fbpgm_200M_uint64" {
        "fb_200M_uint64".to_string()
    } else {
        name.to_string()
    }
}

/// Numeric columns that can be used as heatmap axes or values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    ReadRatio,
    InsertRatio,
    UpdateRatio,
    ScanRatio,
    DeleteRatio,
    /// Derived: `1 - read_ratio`
    WriteRatio,
    Throughput,
    MemoryConsumption,
    ThreadNum,
    ScanNum,
    LatencyP50,
    LatencyP99,
    LatencyP999,
    LatencyVariance,
    ErrorBound,
    Hardness,
    GlobalHardness,
}

impl Attribute {
    pub fn all() -> &'static [Attribute] {
        &[
            Attribute::ReadRatio,
            Attribute::InsertRatio,
            Attribute::UpdateRatio,
            Attribute::ScanRatio,
            Attribute::DeleteRatio,
            Attribute::WriteRatio,
            Attribute::Throughput,
            Attribute::MemoryConsumption,
            Attribute::ThreadNum,
            Attribute::ScanNum,
            Attribute::LatencyP50,
            Attribute::LatencyP99,
            Attribute::LatencyP999,
            Attribute::LatencyVariance,
            Attribute::ErrorBound,
            Attribute::Hardness,
            Attribute::GlobalHardness,
        ]
    }

    /// Column name in the benchmark CSV
    pub fn column(&self) -> &'static str {
        match self {
            Attribute::ReadRatio => "read_ratio",
            Attribute::InsertRatio => "insert_ratio",
            Attribute::UpdateRatio => "update_ratio",
            Attribute::ScanRatio => "scan_ratio",
            Attribute::DeleteRatio => "delete_ratio",
            Attribute::WriteRatio => "write_ratio",
            Attribute::Throughput => "throughput",
            Attribute::MemoryConsumption => "memory_consumption",
            Attribute::ThreadNum => "thread_num",
            Attribute::ScanNum => "scan_num",
            Attribute::LatencyP50 => "50 percentile",
            Attribute::LatencyP99 => "99 percentile",
            Attribute::LatencyP999 => "99.9 percentile",
            Attribute::LatencyVariance => "latency_variance",
            Attribute::ErrorBound => "error_bound",
            Attribute::Hardness => "pgm",
            Attribute::GlobalHardness => "pgm_global",
        }
    }

    /// Read this attribute from a measurement. `None` when the value is unknown.
    pub fn value(&self, m: &Measurement) -> Option<f64> {
        match self {
            Attribute::ReadRatio => Some(m.read_ratio),
            Attribute::InsertRatio => Some(m.insert_ratio),
            Attribute::UpdateRatio => Some(m.update_ratio),
            Attribute::ScanRatio => Some(m.scan_ratio),
            Attribute::DeleteRatio => Some(m.delete_ratio),
            Attribute::WriteRatio => Some(1.0 - m.read_ratio),
            Attribute::Throughput => Some(m.throughput),
            Attribute::MemoryConsumption => Some(m.memory_consumption),
            Attribute::ThreadNum => Some(m.thread_num as f64),
            Attribute::ScanNum => Some(m.scan_num as f64),
            Attribute::LatencyP50 => Some(m.latency_p50),
            Attribute::LatencyP99 => Some(m.latency_p99),
            Attribute::LatencyP999 => Some(m.latency_p999),
            Attribute::LatencyVariance => Some(m.latency_variance),
            Attribute::ErrorBound => Some(m.error_bound),
            Attribute::Hardness => m.hardness,
            Attribute::GlobalHardness => m.global_hardness,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(attr) = Attribute::all().iter().find(|a| a.column() == s) {
            return Ok(*attr);
        }
        match s {
            "hardness" => Ok(Attribute::Hardness),
            "global_hardness" => Ok(Attribute::GlobalHardness),
            "p50" => Ok(Attribute::LatencyP50),
            "p99" => Ok(Attribute::LatencyP99),
            "p999" => Ok(Attribute::LatencyP999),
            "memory" => Ok(Attribute::MemoryConsumption),
            _ => Err(Error::unsupported("attribute", s)),
        }
    }
}

/// Total order on optional attribute values; missing values sort last
fn cmp_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// An ordered, long-form table of measurements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementTable {
    pub rows: Vec<Measurement>,
}

impl MeasurementTable {
    pub fn new(rows: Vec<Measurement>) -> Self {
        Self { rows }
    }

    /// Load a benchmark CSV, cleaning dataset names on the way in
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut rows = Vec::new();
        for (line, record) in reader.deserialize::<Measurement>().enumerate() {
            let mut m = record
                .with_context(|| format!("Malformed row {} in {}", line + 1, path.display()))?;
            m.dataset = clean_dataset_name(&m.dataset);
            rows.push(m);
        }

        tracing::debug!(rows = rows.len(), path = %path.display(), "loaded measurements");
        Ok(Self { rows })
    }

    /// Load and concatenate several benchmark CSVs
    pub fn load_all(paths: &[impl AsRef<Path>]) -> anyhow::Result<Self> {
        let mut table = Self::default();
        for path in paths {
            table.rows.extend(Self::load(path.as_ref())?.rows);
        }
        Ok(table)
    }

    /// Write the table in the benchmark harness' CSV layout
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.rows.iter()
    }

    /// Rows matching the predicate, in table order
    pub fn filter(&self, pred: impl Fn(&Measurement) -> bool) -> MeasurementTable {
        Self {
            rows: self.rows.iter().filter(|m| pred(m)).cloned().collect(),
        }
    }

    /// Drop every row whose dataset name contains one of the patterns
    pub fn exclude_datasets(&mut self, patterns: &[String]) {
        self.rows
            .retain(|m| !patterns.iter().any(|p| m.dataset.contains(p.as_str())));
    }

    /// Stable sort by the given attributes, ascending, missing values last
    pub fn sort_by(&mut self, keys: &[Attribute]) {
        self.rows.sort_by(|a, b| {
            keys.iter()
                .map(|k| cmp_optional(k.value(a), k.value(b)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Distinct values of an attribute in first-seen order
    pub fn distinct(&self, attr: Attribute) -> Vec<f64> {
        let mut values: Vec<f64> = Vec::new();
        for v in self.rows.iter().filter_map(|m| attr.value(m)) {
            if !values.contains(&v) {
                values.push(v);
            }
        }
        values
    }

    /// Distinct dataset names in first-seen order
    pub fn datasets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for m in &self.rows {
            if !names.contains(&m.dataset.as_str()) {
                names.push(&m.dataset);
            }
        }
        names
    }

    /// Distinct index identifiers in first-seen order
    pub fn index_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for m in &self.rows {
            if !names.contains(&m.index_type.as_str()) {
                names.push(&m.index_type);
            }
        }
        names
    }

    /// Values of `attr` over the rows matching the predicate
    pub fn values(&self, attr: Attribute, pred: impl Fn(&Measurement) -> bool) -> Vec<f64> {
        self.rows
            .iter()
            .filter(|m| pred(m))
            .filter_map(|m| attr.value(m))
            .collect()
    }
}

impl FromIterator<Measurement> for MeasurementTable {
    fn from_iter<I: IntoIterator<Item = Measurement>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
pub(crate) fn row(dataset: &str, index: &str, read_ratio: f64, throughput: f64) -> Measurement {
    Measurement {
        dataset: dataset.to_string(),
        index_type: index.to_string(),
        read_ratio,
        insert_ratio: 1.0 - read_ratio,
        throughput,
        ..Default::default()
    }
}
